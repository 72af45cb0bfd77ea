//! Hemmer provider for Iron.io
//!
//! This crate manages Iron.io projects as declarative infrastructure. A host
//! orchestrator diffs desired against last-known state and calls into the
//! provider to create, read, update, or delete each project; the provider
//! turns those calls into requests against the Iron.io REST API.
//!
//! # Overview
//!
//! - **[`ProviderService`]**: the host-facing surface, working on JSON state
//! - **[`IronProvider`]**: the implementation, with a registry of resource types
//! - **[`Resource`]**: the four-operation capability every resource type implements
//! - **[`ProjectResource`]**: the `ironio_project` resource
//! - **[`Transport`]**: the one-request-per-call outbound seam, with
//!   [`HttpTransport`] as the `reqwest` implementation
//! - **[`Settings`]**: typed connection settings resolved from configuration
//!   and `IRON_*` environment variables
//! - **Logging**: `tracing` integration, writing to stderr
//!
//! # Quick Start
//!
//! ```no_run
//! use hemmer_provider_ironio::{init_logging, IronProvider, ProviderService, PROJECT_RESOURCE};
//! use serde_json::json;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     init_logging();
//!
//!     let provider = IronProvider::new();
//!     // The token falls back to IRON_TOKEN.
//!     let diagnostics = provider.configure(json!({"project_id": "abc"})).await?;
//!     if !diagnostics.is_empty() {
//!         return Err(format!("{:?}", diagnostics).into());
//!     }
//!
//!     let state = provider
//!         .create(PROJECT_RESOURCE, json!({"name": "demo"}))
//!         .await?;
//!     println!("created project {}", state["id"]);
//!     Ok(())
//! }
//! ```
//!
//! # Lifecycle
//!
//! ```text
//! absent --create--> present(id) --update*--> present(id) --delete--> absent
//!                         |
//!                         +--read (remote 404)--> absent
//! ```
//!
//! Every operation issues at most one request and never retries.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod client;
pub mod config;
pub mod error;
pub mod logging;
pub mod project;
pub mod provider;
pub mod resource;
pub mod schema;
pub mod testing;
pub mod validation;

// Re-export main types at crate root
pub use client::{Endpoint, HttpTransport, Transport};
pub use config::Settings;
pub use error::ProviderError;
pub use logging::{init_logging, init_logging_with_default, try_init_logging};
pub use project::{
    project_endpoint, DeleteResponse, ProjectInfo, ProjectRequest, ProjectResource,
    PROJECT_RESOURCE,
};
pub use provider::{EnvSource, IronProvider, ProviderMetadata, ProviderService};
pub use resource::{Resource, ResourceData};
pub use schema::ProviderSchema;
pub use validation::{is_valid, validate, validate_result};

// Re-export async_trait for resource implementations
pub use async_trait::async_trait;

// Re-export commonly used external types
pub use reqwest;
pub use serde_json;
pub use tracing;
