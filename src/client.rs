//! HTTP transport for the Iron.io REST API.
//!
//! Resources never talk to `reqwest` directly. They build an [`Endpoint`]
//! and hand it to a [`Transport`], which issues exactly one request and
//! returns the decoded JSON body. [`HttpTransport`] is the real
//! implementation; tests use [`crate::testing::MockTransport`].

use std::fmt;

use reqwest::header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, Method};
use serde_json::Value;
use tracing::{debug, instrument, warn};

use crate::config::Settings;
use crate::error::ProviderError;

/// A fully-qualified request target.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Endpoint {
    url: String,
}

impl Endpoint {
    /// Build an endpoint for `collection` under the settings' base URL,
    /// scoped to `id` when it is non-empty. The id is percent-encoded as a
    /// single path segment.
    ///
    /// ```
    /// use hemmer_provider_ironio::client::Endpoint;
    /// use hemmer_provider_ironio::Settings;
    ///
    /// let settings = Settings { host: "iron.test".to_string(), ..Settings::default() };
    /// let endpoint = Endpoint::new(&settings, "projects", "p1");
    /// assert_eq!(endpoint.as_str(), "https://iron.test:443/2/projects/p1");
    /// ```
    pub fn new(settings: &Settings, collection: &str, id: &str) -> Self {
        let mut url = format!("{}/{}", settings.base_url(), collection);
        if !id.is_empty() {
            url.push('/');
            url.push_str(&urlencoding::encode(id));
        }
        Self { url }
    }

    /// The endpoint URL as a string.
    pub fn as_str(&self) -> &str {
        &self.url
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.url)
    }
}

/// The outbound request primitive used by every resource.
#[async_trait::async_trait]
pub trait Transport: Send + Sync {
    /// Issue a single request and return the decoded response body.
    ///
    /// An empty response body decodes to [`Value::Null`]. A non-success
    /// status must be reported as [`ProviderError::Api`] so callers can
    /// detect a missing entity with [`ProviderError::is_not_found`].
    async fn issue(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError>;
}

/// [`Transport`] backed by a `reqwest` client.
///
/// Every request carries `Authorization: OAuth <token>` plus the
/// configured `User-Agent`.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: Client,
}

impl HttpTransport {
    /// Create a transport for the given settings.
    pub fn new(settings: &Settings) -> Result<Self, ProviderError> {
        let mut headers = HeaderMap::new();
        let auth = HeaderValue::from_str(&format!("OAuth {}", settings.token)).map_err(|_| {
            ProviderError::Configuration("token contains invalid header characters".to_string())
        })?;
        headers.insert(AUTHORIZATION, mark_sensitive(auth));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));
        let agent = HeaderValue::from_str(&settings.user_agent).map_err(|_| {
            ProviderError::Configuration(
                "user_agent contains invalid header characters".to_string(),
            )
        })?;
        headers.insert(USER_AGENT, agent);

        let mut builder = Client::builder().default_headers(headers);
        if let Some(timeout) = settings.timeout {
            builder = builder.timeout(timeout);
        }

        Ok(Self {
            client: builder.build()?,
        })
    }
}

fn mark_sensitive(mut value: HeaderValue) -> HeaderValue {
    value.set_sensitive(true);
    value
}

#[async_trait::async_trait]
impl Transport for HttpTransport {
    #[instrument(skip_all, name = "ironio.issue", fields(method = %method, url = %endpoint))]
    async fn issue(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        let mut request = self.client.request(method, endpoint.as_str());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            warn!(status = status.as_u16(), "Iron.io API returned an error");
            return Err(ProviderError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        debug!(status = status.as_u16(), bytes = text.len(), "Request completed");
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        Ok(serde_json::from_str(&text)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{body_json, header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn settings_for(server: &MockServer) -> Settings {
        let addr = server.address();
        Settings {
            scheme: "http".to_string(),
            host: addr.ip().to_string(),
            port: addr.port(),
            api_version: "2".to_string(),
            token: "test-token".to_string(),
            ..Settings::default()
        }
    }

    #[test]
    fn test_endpoint_collection_and_entity() {
        let settings = Settings {
            scheme: "http".to_string(),
            host: "localhost".to_string(),
            port: 8080,
            api_version: "1".to_string(),
            ..Settings::default()
        };

        let collection = Endpoint::new(&settings, "projects", "");
        assert_eq!(collection.as_str(), "http://localhost:8080/1/projects");

        let entity = Endpoint::new(&settings, "projects", "abc");
        assert_eq!(entity.to_string(), "http://localhost:8080/1/projects/abc");
    }

    #[test]
    fn test_endpoint_escapes_id() {
        let settings = Settings::default();
        let endpoint = Endpoint::new(&settings, "projects", "a b?c#d/e");
        assert_eq!(
            endpoint.as_str(),
            "https://worker-aws-us-east-1.iron.io:443/2/projects/a%20b%3Fc%23d%2Fe"
        );
    }

    #[tokio::test]
    async fn test_issue_sends_auth_and_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/2/projects"))
            .and(header("authorization", "OAuth test-token"))
            .and(header("content-type", "application/json"))
            .and(body_json(json!({"project": {"name": "demo"}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"id": "p1"})))
            .expect(1)
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let transport = HttpTransport::new(&settings).unwrap();
        let endpoint = Endpoint::new(&settings, "projects", "");
        let out = transport
            .issue(
                Method::POST,
                &endpoint,
                Some(&json!({"project": {"name": "demo"}})),
            )
            .await
            .unwrap();

        assert_eq!(out, json!({"id": "p1"}));
    }

    #[tokio::test]
    async fn test_issue_maps_404_to_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/2/projects/gone"))
            .respond_with(ResponseTemplate::new(404).set_body_string("Project not found"))
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let transport = HttpTransport::new(&settings).unwrap();
        let err = transport
            .issue(
                Method::GET,
                &Endpoint::new(&settings, "projects", "gone"),
                None,
            )
            .await
            .unwrap_err();

        assert!(err.is_not_found());
        assert_eq!(err.message(), "Project not found");
    }

    #[tokio::test]
    async fn test_issue_server_error_is_not_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("DELETE"))
            .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let transport = HttpTransport::new(&settings).unwrap();
        let err = transport
            .issue(
                Method::DELETE,
                &Endpoint::new(&settings, "projects", "p1"),
                None,
            )
            .await
            .unwrap_err();

        assert!(!err.is_not_found());
        assert_eq!(err.status(), Some(500));
    }

    #[tokio::test]
    async fn test_issue_empty_body_is_null() {
        let server = MockServer::start().await;
        Mock::given(method("PATCH"))
            .respond_with(ResponseTemplate::new(204))
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let transport = HttpTransport::new(&settings).unwrap();
        let out = transport
            .issue(
                Method::PATCH,
                &Endpoint::new(&settings, "projects", "p1"),
                Some(&json!({})),
            )
            .await
            .unwrap();

        assert_eq!(out, Value::Null);
    }

    #[tokio::test]
    async fn test_issue_invalid_json_is_serialization_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>"))
            .mount(&server)
            .await;

        let settings = settings_for(&server);
        let transport = HttpTransport::new(&settings).unwrap();
        let err = transport
            .issue(Method::GET, &Endpoint::new(&settings, "projects", ""), None)
            .await
            .unwrap_err();

        assert!(matches!(err, ProviderError::Serialization(_)));
    }

    #[test]
    fn test_invalid_token_is_configuration_error() {
        let settings = Settings {
            token: "bad\ntoken".to_string(),
            ..Settings::default()
        };
        let err = HttpTransport::new(&settings).unwrap_err();
        assert!(matches!(err, ProviderError::Configuration(_)));
    }
}
