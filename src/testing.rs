//! Testing utilities for the provider and its resources.
//!
//! [`MockTransport`] stands in for the Iron.io API: queue the responses a
//! test expects, run the operation, then inspect the recorded requests.
//! [`ProviderTester`] drives a [`ProviderService`] through whole lifecycles.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//! use hemmer_provider_ironio::testing::{MockTransport, ProviderTester};
//! use hemmer_provider_ironio::{IronProvider, PROJECT_RESOURCE};
//! use serde_json::json;
//!
//! # tokio_test::block_on(async {
//! let transport = Arc::new(MockTransport::new());
//! let tester = ProviderTester::new(IronProvider::new().with_transport(transport.clone()));
//! tester.configure(json!({"token": "test"})).await.unwrap();
//!
//! transport.respond(json!({"id": "p1", "name": "demo"}));
//! let state = tester.create(PROJECT_RESOURCE, json!({"name": "demo"})).await.unwrap();
//! assert_eq!(state["id"], "p1");
//! # });
//! ```

use std::collections::VecDeque;
use std::sync::{Mutex, MutexGuard, PoisonError};

use reqwest::Method;
use serde_json::Value;

use crate::client::{Endpoint, Transport};
use crate::error::ProviderError;
use crate::provider::ProviderService;
use crate::schema::{has_errors, Diagnostic};

/// A request captured by [`MockTransport`].
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    /// HTTP method.
    pub method: Method,
    /// Full request URL.
    pub url: String,
    /// JSON body, if one was sent.
    pub body: Option<Value>,
}

/// In-memory [`Transport`] with scripted responses.
///
/// Responses are returned in the order they were queued. Issuing a request
/// with nothing queued fails with a configuration error naming the request.
#[derive(Debug, Default)]
pub struct MockTransport {
    responses: Mutex<VecDeque<Result<Value, ProviderError>>>,
    requests: Mutex<Vec<RecordedRequest>>,
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

impl MockTransport {
    /// Create a transport with nothing queued.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a successful response body.
    pub fn respond(&self, body: Value) {
        lock(&self.responses).push_back(Ok(body));
    }

    /// Queue a failure.
    pub fn fail(&self, err: ProviderError) {
        lock(&self.responses).push_back(Err(err));
    }

    /// All requests issued so far.
    pub fn requests(&self) -> Vec<RecordedRequest> {
        lock(&self.requests).clone()
    }
}

#[async_trait::async_trait]
impl Transport for MockTransport {
    async fn issue(
        &self,
        method: Method,
        endpoint: &Endpoint,
        body: Option<&Value>,
    ) -> Result<Value, ProviderError> {
        lock(&self.requests).push(RecordedRequest {
            method: method.clone(),
            url: endpoint.to_string(),
            body: body.cloned(),
        });

        lock(&self.responses).pop_front().unwrap_or_else(|| {
            Err(ProviderError::Configuration(format!(
                "MockTransport has no response queued for {} {}",
                method, endpoint
            )))
        })
    }
}

/// A test harness for provider implementations.
pub struct ProviderTester<P: ProviderService> {
    provider: P,
}

impl<P: ProviderService> ProviderTester<P> {
    /// Create a new tester for the given provider.
    pub fn new(provider: P) -> Self {
        Self { provider }
    }

    /// Get a reference to the underlying provider.
    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Get the list of resource type names.
    pub fn resource_types(&self) -> Vec<String> {
        self.provider.metadata().resources
    }

    /// Configure the provider.
    ///
    /// Returns `Err` with the diagnostics if there are errors.
    pub async fn configure(&self, config: Value) -> Result<(), TestError> {
        let diagnostics = self.provider.configure(config).await?;
        check_diagnostics(diagnostics)
    }

    /// Validate a resource configuration.
    pub async fn validate_resource_config(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<(), TestError> {
        let diagnostics = self
            .provider
            .validate_resource_config(resource_type, config)
            .await?;
        check_diagnostics(diagnostics)
    }

    /// Create a new resource.
    pub async fn create(&self, resource_type: &str, config: Value) -> Result<Value, ProviderError> {
        self.provider.create(resource_type, config).await
    }

    /// Read the current state of a resource.
    pub async fn read(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<Value, ProviderError> {
        self.provider.read(resource_type, current_state).await
    }

    /// Update an existing resource.
    pub async fn update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        self.provider
            .update(resource_type, prior_state, config)
            .await
    }

    /// Delete a resource.
    pub async fn delete(
        &self,
        resource_type: &str,
        current_state: Value,
    ) -> Result<(), ProviderError> {
        self.provider.delete(resource_type, current_state).await
    }

    /// Create then read back. Returns the state after read.
    pub async fn lifecycle_create(
        &self,
        resource_type: &str,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.create(resource_type, config).await?;
        self.read(resource_type, created).await
    }

    /// Update then read back. Returns the state after read.
    pub async fn lifecycle_update(
        &self,
        resource_type: &str,
        prior_state: Value,
        config: Value,
    ) -> Result<Value, ProviderError> {
        let updated = self.update(resource_type, prior_state, config).await?;
        self.read(resource_type, updated).await
    }

    /// Run create → read → update → read → delete.
    ///
    /// Returns the state after the update (before delete).
    pub async fn lifecycle_crud(
        &self,
        resource_type: &str,
        initial_config: Value,
        updated_config: Value,
    ) -> Result<Value, ProviderError> {
        let created = self.lifecycle_create(resource_type, initial_config).await?;
        let updated = self
            .lifecycle_update(resource_type, created, updated_config)
            .await?;
        self.delete(resource_type, updated.clone()).await?;
        Ok(updated)
    }
}

/// Failure of a tester call that reports diagnostics instead of erroring.
#[derive(Debug, thiserror::Error)]
pub enum TestError {
    /// One or more error diagnostics came back.
    #[error("{} error diagnostic(s): {}", .0.len(), describe(.0))]
    Diagnostics(Vec<Diagnostic>),
    /// The provider itself failed.
    #[error(transparent)]
    Provider(#[from] ProviderError),
}

fn describe(diagnostics: &[Diagnostic]) -> String {
    diagnostics
        .iter()
        .map(|d| {
            let mut line = d.summary.clone();
            if let Some(attribute) = &d.attribute {
                line = format!("{} [{}]", line, attribute);
            }
            if let Some(detail) = &d.detail {
                line = format!("{} ({})", line, detail);
            }
            line
        })
        .collect::<Vec<_>>()
        .join("; ")
}

fn check_diagnostics(diagnostics: Vec<Diagnostic>) -> Result<(), TestError> {
    let errors: Vec<_> = diagnostics.into_iter().filter(Diagnostic::is_error).collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(TestError::Diagnostics(errors))
    }
}

/// Assert that diagnostics contain no errors.
///
/// # Panics
///
/// Panics if there are any error diagnostics.
pub fn assert_no_errors(diagnostics: &[Diagnostic]) {
    assert!(
        !has_errors(diagnostics),
        "Expected no errors, got: {}",
        describe(diagnostics)
    );
}

/// Assert that diagnostics contain an error whose summary contains `substring`.
///
/// # Panics
///
/// Panics if no error diagnostic matches.
pub fn assert_error_contains(diagnostics: &[Diagnostic], substring: &str) {
    assert!(
        diagnostics
            .iter()
            .any(|d| d.is_error() && d.summary.contains(substring)),
        "No error mentions '{}'; got: {}",
        substring,
        describe(diagnostics)
    );
}
