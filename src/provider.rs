//! The host-facing provider.
//!
//! [`ProviderService`] is the surface a host orchestrator drives: it works
//! on JSON state and names resources by type. [`IronProvider`] implements it
//! by looking the type up in a registry of [`Resource`] implementations and
//! threading the configured [`Settings`] and [`Transport`] into each call.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::RwLock;
use tracing::{debug, error, info, instrument, warn};

use crate::client::{HttpTransport, Transport};
use crate::config::Settings;
use crate::error::ProviderError;
use crate::project::{ProjectResource, PROJECT_RESOURCE};
use crate::resource::{Resource, ResourceData};
use crate::schema::{has_errors, Diagnostic, ProviderSchema, Schema};
use crate::validation::{validate, validate_result};

/// Provider metadata: the resource types it can manage.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ProviderMetadata {
    /// List of resource type names.
    pub resources: Vec<String>,
}

/// Trait a host orchestrator drives.
///
/// Resource state travels as JSON objects. The `id` key carries the
/// identifier; a `null` state means the resource does not exist.
#[async_trait::async_trait]
pub trait ProviderService: Send + Sync + 'static {
    /// Return the provider's schema including all resources.
    fn schema(&self) -> ProviderSchema;

    /// Return provider metadata. By default, this is derived from the schema.
    fn metadata(&self) -> ProviderMetadata {
        ProviderMetadata {
            resources: self.schema().resources.keys().cloned().collect(),
        }
    }

    /// Validate the provider configuration before configuring.
    async fn validate_provider_config(
        &self,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        Ok(validate(&self.schema().provider, &config))
    }

    /// Configure the provider with credentials and settings.
    /// Returns diagnostics (errors and warnings).
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError>;

    /// Validate a resource's declared configuration.
    async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Vec<Diagnostic>, ProviderError> {
        let schema = self.schema();
        let resource_schema = schema
            .resources
            .get(resource_type)
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))?;
        Ok(validate(resource_schema, &config))
    }

    /// Create a new resource, returning its state.
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Read the current state of a resource. Returns `null` if it is gone.
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Update an existing resource, returning its state.
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError>;

    /// Delete a resource.
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError>;
}

/// Looks up an environment variable by name.
pub type EnvSource = Arc<dyn Fn(&str) -> Option<String> + Send + Sync>;

struct Configured {
    settings: Settings,
    transport: Arc<dyn Transport>,
}

/// The Iron.io provider.
///
/// Registers `ironio_project` by default. Until [`ProviderService::configure`]
/// succeeds, every resource operation fails with a configuration error.
pub struct IronProvider {
    resources: BTreeMap<String, Box<dyn Resource>>,
    transport: Option<Arc<dyn Transport>>,
    env: EnvSource,
    configured: RwLock<Option<Configured>>,
}

impl IronProvider {
    /// Create a provider with the built-in resource types registered.
    pub fn new() -> Self {
        Self {
            resources: BTreeMap::new(),
            transport: None,
            env: Arc::new(|key: &str| std::env::var(key).ok()),
            configured: RwLock::new(None),
        }
        .with_resource(PROJECT_RESOURCE, ProjectResource)
    }

    /// Register a resource type, replacing any previous registration.
    pub fn with_resource(
        mut self,
        name: impl Into<String>,
        resource: impl Resource + 'static,
    ) -> Self {
        self.resources.insert(name.into(), Box::new(resource));
        self
    }

    /// Use `transport` instead of building an [`HttpTransport`] on configure.
    pub fn with_transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    /// Resolve `IRON_*` fallbacks through `env` instead of the process environment.
    pub fn with_env<F>(mut self, env: F) -> Self
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.env = Arc::new(env);
        self
    }

    /// The settings in effect, if the provider has been configured.
    pub async fn settings(&self) -> Option<Settings> {
        self.configured
            .read()
            .await
            .as_ref()
            .map(|c| c.settings.clone())
    }

    fn resource(&self, resource_type: &str) -> Result<&dyn Resource, ProviderError> {
        self.resources
            .get(resource_type)
            .map(|r| r.as_ref())
            .ok_or_else(|| ProviderError::UnknownResource(resource_type.to_string()))
    }

    async fn context(&self) -> Result<(Settings, Arc<dyn Transport>), ProviderError> {
        let guard = self.configured.read().await;
        let configured = guard.as_ref().ok_or_else(|| {
            ProviderError::Configuration("provider has not been configured".to_string())
        })?;
        Ok((configured.settings.clone(), Arc::clone(&configured.transport)))
    }
}

impl Default for IronProvider {
    fn default() -> Self {
        Self::new()
    }
}

fn check_config(schema: &Schema, state: &Value) -> Result<(), ProviderError> {
    validate_result(schema, state).map_err(|diagnostics| {
        let summaries: Vec<_> = diagnostics.iter().map(|d| d.summary.as_str()).collect();
        ProviderError::Validation(summaries.join("; "))
    })
}

#[async_trait::async_trait]
impl ProviderService for IronProvider {
    fn schema(&self) -> ProviderSchema {
        self.resources
            .iter()
            .fold(
                ProviderSchema::new().with_provider_config(Settings::schema()),
                |schema, (name, resource)| schema.with_resource(name.clone(), resource.schema()),
            )
    }

    #[instrument(skip_all, name = "provider.configure")]
    async fn configure(&self, config: Value) -> Result<Vec<Diagnostic>, ProviderError> {
        let diagnostics = validate(&Settings::schema(), &config);
        if has_errors(&diagnostics) {
            warn!(diagnostics = diagnostics.len(), "Provider configuration is invalid");
            return Ok(diagnostics);
        }

        let settings = match Settings::from_config_with_env(&config, |key| (self.env)(key)) {
            Ok(settings) => settings,
            Err(diagnostics) => {
                warn!(diagnostics = diagnostics.len(), "Provider configuration is incomplete");
                return Ok(diagnostics);
            },
        };

        let transport: Arc<dyn Transport> = match &self.transport {
            Some(transport) => Arc::clone(transport),
            None => Arc::new(HttpTransport::new(&settings)?),
        };

        info!(
            host = %settings.host,
            port = settings.port,
            api_version = %settings.api_version,
            "Provider configured"
        );
        *self.configured.write().await = Some(Configured {
            settings,
            transport,
        });
        Ok(diagnostics)
    }

    #[instrument(skip(self, planned_state))]
    async fn create(
        &self,
        resource_type: &str,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        check_config(&resource.schema(), &planned_state)?;
        let (settings, transport) = self.context().await?;

        let mut data = ResourceData::from_state(planned_state)?;
        data.set_id("");
        if let Err(e) = resource.create(&mut data, &settings, transport.as_ref()).await {
            error!(error = %e, "Create failed");
            return Err(e);
        }
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        let (settings, transport) = self.context().await?;

        let mut data = ResourceData::from_state(current_state)?;
        resource.read(&mut data, &settings, transport.as_ref()).await?;
        if data.id().is_empty() {
            debug!("Resource is gone");
        }
        Ok(data.into_state())
    }

    #[instrument(skip(self, prior_state, planned_state))]
    async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        planned_state: Value,
    ) -> Result<Value, ProviderError> {
        let resource = self.resource(resource_type)?;
        check_config(&resource.schema(), &planned_state)?;
        let (settings, transport) = self.context().await?;

        let prior = ResourceData::from_state(prior_state)?;
        if prior.id().is_empty() {
            return Err(ProviderError::NotFound(format!(
                "{} has no ID in prior state",
                resource_type
            )));
        }
        let mut data = ResourceData::from_state(planned_state)?;
        data.set_id(prior.id());

        if let Err(e) = resource.update(&mut data, &settings, transport.as_ref()).await {
            error!(error = %e, "Update failed");
            return Err(e);
        }
        Ok(data.into_state())
    }

    #[instrument(skip(self, current_state))]
    async fn delete(&self, resource_type: &str, current_state: Value) -> Result<(), ProviderError> {
        let resource = self.resource(resource_type)?;
        let (settings, transport) = self.context().await?;

        let mut data = ResourceData::from_state(current_state)?;
        if let Err(e) = resource.delete(&mut data, &settings, transport.as_ref()).await {
            error!(error = %e, "Delete failed");
            return Err(e);
        }
        Ok(())
    }
}
