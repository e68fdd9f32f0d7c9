//! REST client for the HubSpot CRM v3 API.

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

use crate::config::DEFAULT_HUBSPOT_API_URL;
use crate::error::{Error, Result};
use crate::models::{
    AssociationBatch, ContactProperties, CrmObject, PropertiesPayload, StageUpdate,
    TicketProperties,
};

/// HubSpot CRM client.
///
/// Authenticates with a static API token passed as the `hapikey` query
/// parameter on every request.
#[derive(Debug, Clone)]
pub struct HubSpotClient {
    client: reqwest::Client,
    api_url: String,
    token: String,
}

impl HubSpotClient {
    /// Create a client against the public HubSpot API.
    pub fn new(token: &str) -> Result<Self> {
        Self::with_url(token, DEFAULT_HUBSPOT_API_URL)
    }

    /// Create a client against a custom base URL (must end with `/`).
    pub fn with_url(token: &str, api_url: &str) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let client = reqwest::Client::builder()
            .default_headers(headers)
            .build()?;

        Ok(Self {
            client,
            api_url: api_url.to_string(),
            token: token.to_string(),
        })
    }

    /// Call a CRM endpoint.
    ///
    /// `params` are sent as URL query parameters for `GET` and as the JSON
    /// body for every other method. A status of 400 or above is logged and
    /// returned as [`Error::Api`]. An empty success body parses as `null`.
    pub async fn query_api<P, R>(&self, method: Method, endpoint: &str, params: &P) -> Result<R>
    where
        P: Serialize + ?Sized,
        R: DeserializeOwned,
    {
        let url = format!("{}{endpoint}", self.api_url);

        let request = self
            .client
            .request(method.clone(), &url)
            .query(&[("hapikey", self.token.as_str())]);

        let request = if method == Method::GET {
            request.query(params)
        } else {
            debug!(
                method = %method,
                endpoint = %endpoint,
                body = %serde_json::to_string(params)?,
                "Sending HubSpot request"
            );
            request.json(params)
        };

        let response = request.send().await?;

        let status = response.status();
        if status.is_client_error() || status.is_server_error() {
            let body = response.text().await.unwrap_or_default();
            error!(
                method = %method,
                endpoint = %endpoint,
                status = status.as_u16(),
                body = %body,
                "Error when calling HubSpot API"
            );
            return Err(Error::Api {
                service: "HubSpot",
                status,
                body,
            });
        }

        let body = response.bytes().await?;
        if body.iter().all(u8::is_ascii_whitespace) {
            return Ok(serde_json::from_value(Value::Null)?);
        }
        Ok(serde_json::from_slice(&body)?)
    }

    // =========================================================================
    // Tickets
    // =========================================================================

    /// Create a ticket.
    #[instrument(skip(self, properties), fields(subject = %properties.subject))]
    pub async fn create_ticket(&self, properties: TicketProperties) -> Result<CrmObject> {
        let ticket: CrmObject = self
            .query_api(
                Method::POST,
                "objects/tickets",
                &PropertiesPayload { properties },
            )
            .await?;
        debug!(ticket_id = %ticket.id, "Created HubSpot ticket");
        Ok(ticket)
    }

    /// Move a ticket to another pipeline stage.
    #[instrument(skip(self))]
    pub async fn update_ticket_stage(&self, ticket_id: &str, stage: u32) -> Result<CrmObject> {
        self.query_api(
            Method::PATCH,
            &format!("objects/tickets/{ticket_id}"),
            &PropertiesPayload {
                properties: StageUpdate {
                    hs_pipeline_stage: stage,
                },
            },
        )
        .await
    }

    // =========================================================================
    // Contacts
    // =========================================================================

    /// Create a contact.
    #[instrument(skip(self, properties))]
    pub async fn create_contact(&self, properties: &ContactProperties) -> Result<CrmObject> {
        let contact: CrmObject = self
            .query_api(
                Method::POST,
                "objects/contacts",
                &PropertiesPayload { properties },
            )
            .await?;
        debug!(contact_id = %contact.id, "Created HubSpot contact");
        Ok(contact)
    }

    // =========================================================================
    // Associations
    // =========================================================================

    /// Associate a ticket with a contact.
    #[instrument(skip(self))]
    pub async fn associate_ticket_to_contact(&self, ticket_id: &str, contact_id: &str) -> Result<()> {
        let _: Value = self
            .query_api(
                Method::POST,
                "associations/ticket/contact/batch/create",
                &AssociationBatch::ticket_to_contact(ticket_id, contact_id),
            )
            .await?;
        debug!("Associated contact '{contact_id}' to ticket '{ticket_id}'");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client(server: &MockServer) -> HubSpotClient {
        HubSpotClient::with_url("test-token", &format!("{}/crm/v3/", server.uri())).unwrap()
    }

    #[tokio::test]
    async fn test_get_sends_params_as_query() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/crm/v3/objects/tickets"))
            .and(query_param("hapikey", "test-token"))
            .and(query_param("limit", "5"))
            .and(header("accept", "application/json"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"results": []})))
            .expect(1)
            .mount(&server)
            .await;

        let value: Value = client(&server)
            .await
            .query_api(Method::GET, "objects/tickets", &json!({"limit": 5}))
            .await
            .unwrap();
        assert_eq!(value, json!({"results": []}));
    }

    #[tokio::test]
    async fn test_error_status_is_typed_error() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/objects/contacts"))
            .respond_with(ResponseTemplate::new(409).set_body_string("Contact already exists"))
            .mount(&server)
            .await;

        let err = client(&server)
            .await
            .create_contact(&ContactProperties::default())
            .await
            .unwrap_err();

        match err {
            Error::Api {
                service,
                status,
                body,
            } => {
                assert_eq!(service, "HubSpot");
                assert_eq!(status.as_u16(), 409);
                assert_eq!(body, "Contact already exists");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[tokio::test]
    async fn test_update_ticket_stage_patches_properties() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .and(path("/crm/v3/objects/tickets/101"))
            .and(query_param("hapikey", "test-token"))
            .and(body_json(json!({"properties": {"hs_pipeline_stage": 4}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "101"})))
            .expect(1)
            .mount(&server)
            .await;

        let ticket = client(&server)
            .await
            .update_ticket_stage("101", 4)
            .await
            .unwrap();
        assert_eq!(ticket.id, "101");
    }

    #[tokio::test]
    async fn test_associate_accepts_empty_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/crm/v3/associations/ticket/contact/batch/create"))
            .and(body_json(json!({"inputs": [{
                "from": {"id": "101"},
                "to": {"id": "501"},
                "type": "ticket_to_contact"
            }]})))
            .respond_with(ResponseTemplate::new(204))
            .expect(1)
            .mount(&server)
            .await;

        client(&server)
            .await
            .associate_ticket_to_contact("101", "501")
            .await
            .unwrap();
    }
}
