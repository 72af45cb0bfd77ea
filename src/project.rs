//! The `ironio_project` resource.
//!
//! Maps the declared `name` attribute onto the Iron.io projects API:
//!
//! | Operation | Request                               |
//! |-----------|---------------------------------------|
//! | create    | `POST   /<version>/projects`          |
//! | read      | `GET    /<version>/projects/<id>`     |
//! | update    | `PATCH  /<version>/projects/<id>`     |
//! | delete    | `DELETE /<version>/projects/<id>`     |
//!
//! Writes send `{"project": {"name": ...}}`; deletes are confirmed by a
//! `{"msg": "success"}` response.

use chrono::{DateTime, Utc};
use reqwest::Method;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::client::{Endpoint, Transport};
use crate::config::Settings;
use crate::error::ProviderError;
use crate::resource::{Resource, ResourceData, ID_KEY};
use crate::schema::{Attribute, Schema};

/// Resource type name the project resource is registered under.
pub const PROJECT_RESOURCE: &str = "ironio_project";

/// Message the API returns when a project was deleted.
pub const DELETE_SUCCESS: &str = "success";

/// A project as represented by the Iron.io API.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectInfo {
    /// Server-assigned identifier, empty until created.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub id: String,
    /// Creation timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
    /// Last update timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated_at: Option<DateTime<Utc>>,
    /// Tenant the project belongs to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tenant_id: Option<i64>,
    /// Project name.
    #[serde(default)]
    pub name: String,
    /// Project status.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub status: String,
    /// Owning user.
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub user_id: String,
}

impl ProjectInfo {
    /// A project carrying only the user-supplied name.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Default::default()
        }
    }
}

/// Envelope for create and update payloads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProjectRequest {
    /// The wrapped project.
    pub project: ProjectInfo,
}

/// Body returned by a delete request.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct DeleteResponse {
    /// Status message, `"success"` when the project was removed.
    #[serde(default, rename = "msg")]
    pub message: String,
}

/// Endpoint for the project collection, or for one project when `id` is non-empty.
pub fn project_endpoint(settings: &Settings, id: &str) -> Endpoint {
    Endpoint::new(settings, "projects", id)
}

/// Decode a response body, treating an empty body as the type's default.
fn decode<T: DeserializeOwned + Default>(body: serde_json::Value) -> Result<T, ProviderError> {
    if body.is_null() {
        return Ok(T::default());
    }
    Ok(serde_json::from_value(body)?)
}

fn write_request(data: &ResourceData) -> Result<serde_json::Value, ProviderError> {
    let request = ProjectRequest {
        project: ProjectInfo::named(data.get_string("name")),
    };
    Ok(serde_json::to_value(request)?)
}

/// Manages Iron.io projects.
#[derive(Debug, Clone, Copy, Default)]
pub struct ProjectResource;

#[async_trait::async_trait]
impl Resource for ProjectResource {
    fn schema(&self) -> Schema {
        Schema::v0()
            .with_attribute(
                "name",
                Attribute::required_string().with_description("The name of the project"),
            )
            .with_attribute(
                ID_KEY,
                Attribute::computed_string().with_description("Server-assigned project ID"),
            )
    }

    #[instrument(skip_all, name = "project.create")]
    async fn create(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError> {
        let body = write_request(data)?;
        let endpoint = project_endpoint(settings, "");
        debug!(url = %endpoint, "Creating project");

        let out: ProjectInfo =
            decode(transport.issue(Method::POST, &endpoint, Some(&body)).await?)?;

        info!(id = %out.id, name = %out.name, "Project created");
        data.set_id(out.id);
        Ok(())
    }

    #[instrument(skip_all, name = "project.read", fields(id = %data.id()))]
    async fn read(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError> {
        if data.id().is_empty() {
            debug!("No project ID in state, nothing to read");
            return Ok(());
        }

        let endpoint = project_endpoint(settings, data.id());
        let out: ProjectInfo = match transport.issue(Method::GET, &endpoint, None).await {
            Ok(body) => decode(body)?,
            Err(err) if err.is_not_found() => {
                warn!("Project no longer exists, removing from state");
                data.set_id("");
                return Ok(());
            },
            Err(err) => return Err(err),
        };

        data.set("name", out.name);
        Ok(())
    }

    #[instrument(skip_all, name = "project.update", fields(id = %data.id()))]
    async fn update(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError> {
        let body = write_request(data)?;
        let endpoint = project_endpoint(settings, data.id());

        // The response is checked for shape only; state keeps the declared values.
        let _out: ProjectInfo =
            decode(transport.issue(Method::PATCH, &endpoint, Some(&body)).await?)?;

        debug!("Project updated");
        Ok(())
    }

    #[instrument(skip_all, name = "project.delete", fields(id = %data.id()))]
    async fn delete(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError> {
        if data.id().is_empty() {
            debug!("No project ID in state, nothing to delete");
            return Ok(());
        }

        let endpoint = project_endpoint(settings, data.id());

        let out: DeleteResponse = match transport.issue(Method::DELETE, &endpoint, None).await {
            Ok(body) => decode(body)?,
            Err(err) if err.is_not_found() => {
                warn!("Project already deleted");
                DeleteResponse::default()
            },
            Err(err) => return Err(err),
        };

        // A tolerated 404 carries no message and fails here as well.
        if out.message != DELETE_SUCCESS {
            return Err(ProviderError::DeleteFailed(
                "Failed to delete the project due to an unknown error".to_string(),
            ));
        }

        info!("Project deleted");
        data.set_id("");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::MockTransport;
    use serde_json::json;
    use tokio_test::assert_ok;

    fn settings() -> Settings {
        Settings {
            scheme: "https".to_string(),
            host: "projects.iron.test".to_string(),
            port: 8443,
            api_version: "2".to_string(),
            token: "t".to_string(),
            ..Settings::default()
        }
    }

    fn declared(name: &str) -> ResourceData {
        let mut data = ResourceData::default();
        data.set("name", name);
        data
    }

    fn existing(id: &str, name: &str) -> ResourceData {
        let mut data = declared(name);
        data.set_id(id);
        data
    }

    #[test]
    fn test_project_endpoint() {
        let settings = settings();
        assert_eq!(
            project_endpoint(&settings, "").as_str(),
            "https://projects.iron.test:8443/2/projects"
        );
        assert_eq!(
            project_endpoint(&settings, "p1").as_str(),
            "https://projects.iron.test:8443/2/projects/p1"
        );
    }

    #[test]
    fn test_request_wire_format() {
        let body = write_request(&declared("demo")).unwrap();
        assert_eq!(body, json!({"project": {"name": "demo"}}));
    }

    #[test]
    fn test_project_info_decodes_full_response() {
        let info: ProjectInfo = serde_json::from_value(json!({
            "id": "p1",
            "created_at": "2024-05-01T10:00:00Z",
            "updated_at": "2024-05-02T11:30:00Z",
            "tenant_id": 42,
            "name": "demo",
            "status": "active",
            "user_id": "u7"
        }))
        .unwrap();

        assert_eq!(info.id, "p1");
        assert_eq!(info.tenant_id, Some(42));
        assert_eq!(info.status, "active");
        assert_eq!(
            info.created_at.unwrap().to_rfc3339(),
            "2024-05-01T10:00:00+00:00"
        );
    }

    #[tokio::test]
    async fn test_create() {
        let transport = MockTransport::new();
        transport.respond(json!({"id": "p1", "name": "demo"}));

        let mut data = declared("demo");
        assert_ok!(ProjectResource.create(&mut data, &settings(), &transport).await);
        assert_eq!(data.id(), "p1");

        let requests = transport.requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].method, Method::POST);
        assert_eq!(requests[0].url, "https://projects.iron.test:8443/2/projects");
        assert_eq!(
            requests[0].body,
            Some(json!({"project": {"name": "demo"}}))
        );
    }

    #[tokio::test]
    async fn test_create_failure_keeps_state_absent() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 500,
            body: "internal".to_string(),
        });

        let mut data = declared("demo");
        let err = ProjectResource
            .create(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(500));
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_read_copies_name() {
        let transport = MockTransport::new();
        transport.respond(json!({"id": "p1", "name": "renamed", "status": "active"}));

        let mut data = existing("p1", "demo");
        assert_ok!(ProjectResource.read(&mut data, &settings(), &transport).await);
        assert_eq!(data.id(), "p1");
        assert_eq!(data.get_string("name"), "renamed");
        assert!(data.get("status").is_none());
        assert_eq!(transport.requests()[0].method, Method::GET);
        assert_eq!(
            transport.requests()[0].url,
            "https://projects.iron.test:8443/2/projects/p1"
        );
    }

    #[tokio::test]
    async fn test_read_not_found_clears_id() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 404,
            body: "Project not found".to_string(),
        });

        let mut data = existing("p1", "demo");
        assert_ok!(ProjectResource.read(&mut data, &settings(), &transport).await);
        assert_eq!(data.id(), "");
    }

    #[tokio::test]
    async fn test_read_other_error_propagates() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 401,
            body: "Invalid token".to_string(),
        });

        let mut data = existing("p1", "demo");
        let err = ProjectResource
            .read(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(401));
        assert_eq!(err.message(), "Invalid token");
        assert_eq!(data.id(), "p1");
    }

    #[tokio::test]
    async fn test_read_without_id_is_noop() {
        let transport = MockTransport::new();

        let mut data = declared("demo");
        assert_ok!(ProjectResource.read(&mut data, &settings(), &transport).await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_update_does_not_apply_response() {
        let transport = MockTransport::new();
        transport.respond(json!({"id": "p1", "name": "server-side", "status": "active"}));

        let mut data = existing("p1", "desired");
        assert_ok!(ProjectResource.update(&mut data, &settings(), &transport).await);
        assert_eq!(data.get_string("name"), "desired");
        assert_eq!(data.id(), "p1");

        let requests = transport.requests();
        assert_eq!(requests[0].method, Method::PATCH);
        assert_eq!(
            requests[0].url,
            "https://projects.iron.test:8443/2/projects/p1"
        );
        assert_eq!(
            requests[0].body,
            Some(json!({"project": {"name": "desired"}}))
        );
    }

    #[tokio::test]
    async fn test_update_error_propagates() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 404,
            body: String::new(),
        });

        let mut data = existing("p1", "desired");
        let err = ProjectResource
            .update(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert!(err.is_not_found());
    }

    #[tokio::test]
    async fn test_delete_success() {
        let transport = MockTransport::new();
        transport.respond(json!({"msg": "success"}));

        let mut data = existing("p1", "demo");
        assert_ok!(ProjectResource.delete(&mut data, &settings(), &transport).await);
        assert_eq!(data.id(), "");
        assert_eq!(transport.requests()[0].method, Method::DELETE);
        assert_eq!(transport.requests()[0].body, None);
    }

    #[tokio::test]
    async fn test_delete_without_id_is_noop() {
        let transport = MockTransport::new();

        let mut data = declared("demo");
        assert_ok!(ProjectResource.delete(&mut data, &settings(), &transport).await);
        assert!(transport.requests().is_empty());
    }

    #[tokio::test]
    async fn test_delete_unexpected_message_fails() {
        let transport = MockTransport::new();
        transport.respond(json!({"msg": "pending"}));

        let mut data = existing("p1", "demo");
        let err = ProjectResource
            .delete(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DeleteFailed(_)));
        assert_eq!(data.id(), "p1");
    }

    #[tokio::test]
    async fn test_delete_not_found_fails_message_check() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 404,
            body: String::new(),
        });

        let mut data = existing("p1", "demo");
        let err = ProjectResource
            .delete(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert!(matches!(err, ProviderError::DeleteFailed(_)));
        assert_eq!(data.id(), "p1");
    }

    #[tokio::test]
    async fn test_delete_other_error_propagates() {
        let transport = MockTransport::new();
        transport.fail(ProviderError::Api {
            status: 503,
            body: "maintenance".to_string(),
        });

        let mut data = existing("p1", "demo");
        let err = ProjectResource
            .delete(&mut data, &settings(), &transport)
            .await
            .unwrap_err();
        assert_eq!(err.status(), Some(503));
        assert_eq!(data.id(), "p1");
    }
}
