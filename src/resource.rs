//! The resource capability interface and the local state it operates on.
//!
//! A host orchestrator owns the persisted state of each managed entity and
//! decides when to create, read, update, or delete it. Each call hands the
//! resource a [`ResourceData`] (the identifier plus tracked attributes), the
//! connection [`Settings`], and a [`Transport`].

use serde_json::{Map, Value};

use crate::client::Transport;
use crate::config::Settings;
use crate::error::ProviderError;
use crate::schema::Schema;

/// Attribute key that carries the identifier in host JSON state.
pub const ID_KEY: &str = "id";

/// Local state of one managed entity.
///
/// An empty identifier means the entity does not exist (yet, or anymore).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ResourceData {
    id: String,
    attributes: Map<String, Value>,
}

impl ResourceData {
    /// Create state for a new entity from its declared attributes.
    pub fn new(attributes: Map<String, Value>) -> Self {
        Self {
            id: String::new(),
            attributes,
        }
    }

    /// Build state from a host JSON object.
    ///
    /// The `id` key, when it holds a string, becomes the identifier; all
    /// other keys are tracked attributes. `null` yields empty state.
    pub fn from_state(state: Value) -> Result<Self, ProviderError> {
        let mut attributes = match state {
            Value::Object(map) => map,
            Value::Null => Map::new(),
            other => {
                return Err(ProviderError::Validation(format!(
                    "resource state must be an object, got {}",
                    other
                )))
            },
        };
        let id = match attributes.remove(ID_KEY) {
            Some(Value::String(id)) => id,
            _ => String::new(),
        };
        Ok(Self { id, attributes })
    }

    /// Convert back to host JSON state.
    ///
    /// Returns [`Value::Null`] when the identifier is empty, which tells the
    /// host the entity is gone.
    pub fn into_state(self) -> Value {
        if self.id.is_empty() {
            return Value::Null;
        }
        let mut map = self.attributes;
        map.insert(ID_KEY.to_string(), Value::String(self.id));
        Value::Object(map)
    }

    /// The entity identifier, empty when absent.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Set (or clear, with `""`) the identifier.
    pub fn set_id(&mut self, id: impl Into<String>) {
        self.id = id.into();
    }

    /// Get an attribute value.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.attributes.get(key)
    }

    /// Get a string attribute, or `""` if it is absent or not a string.
    pub fn get_string(&self, key: &str) -> &str {
        self.attributes
            .get(key)
            .and_then(Value::as_str)
            .unwrap_or_default()
    }

    /// Set an attribute value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<Value>) {
        self.attributes.insert(key.into(), value.into());
    }
}

/// A managed resource type.
///
/// Implementations are stateless: everything an operation needs arrives in
/// its arguments, and each operation issues at most one request.
#[async_trait::async_trait]
pub trait Resource: Send + Sync {
    /// Schema of the resource's declared configuration.
    fn schema(&self) -> Schema;

    /// Create the remote entity and record its identifier.
    async fn create(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError>;

    /// Refresh local state from the remote entity, clearing the identifier
    /// if it no longer exists.
    async fn read(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError>;

    /// Apply the declared attributes to the remote entity.
    async fn update(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError>;

    /// Delete the remote entity and clear the identifier.
    async fn delete(
        &self,
        data: &mut ResourceData,
        settings: &Settings,
        transport: &dyn Transport,
    ) -> Result<(), ProviderError>;
}
