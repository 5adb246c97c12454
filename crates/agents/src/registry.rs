//! Agent registry: maps `type_id` strings to agent factories.
//!
//! The registry is an ordinary value: build one at startup, register every
//! agent type, then share it behind an `Arc`. Registration needs `&mut self`,
//! so once the registry is shared it can no longer change.

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};
use tracing::debug;

use crate::{
    AgentCategory, AgentTypeDescriptor, AgentUnit, ConfigError, RegistryError,
};

/// Builds an agent instance from an already-validated configuration.
pub type AgentFactory =
    Arc<dyn Fn(&Map<String, Value>) -> Result<Box<dyn AgentUnit>, ConfigError> + Send + Sync>;

/// An agent type that can describe and construct itself.
///
/// Implementing this lets a type be registered with
/// [`AgentRegistry::register_kind`] instead of a hand-written closure.
pub trait AgentKind: AgentUnit + Sized + 'static {
    fn descriptor() -> AgentTypeDescriptor;

    /// Build an instance from the validated configuration.
    fn from_config(config: &Map<String, Value>) -> Result<Self, ConfigError>;
}

struct RegisteredType {
    descriptor: AgentTypeDescriptor,
    factory: AgentFactory,
}

/// Catalog of every agent type known to the process.
#[derive(Default)]
pub struct AgentRegistry {
    types: BTreeMap<String, RegisteredType>,
}

impl AgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an agent type.
    ///
    /// # Errors
    /// [`RegistryError::DuplicateType`] if the `type_id` is already taken; the
    /// existing registration is left untouched.
    pub fn register<F>(&mut self, descriptor: AgentTypeDescriptor, factory: F) -> Result<(), RegistryError>
    where
        F: Fn(&Map<String, Value>) -> Result<Box<dyn AgentUnit>, ConfigError> + Send + Sync + 'static,
    {
        if self.types.contains_key(&descriptor.type_id) {
            return Err(RegistryError::DuplicateType(descriptor.type_id));
        }

        debug!("registered agent type '{}' ({})", descriptor.type_id, descriptor.category);
        self.types.insert(
            descriptor.type_id.clone(),
            RegisteredType { descriptor, factory: Arc::new(factory) },
        );
        Ok(())
    }

    /// Register an [`AgentKind`] using its own descriptor and constructor.
    pub fn register_kind<K: AgentKind>(&mut self) -> Result<(), RegistryError> {
        self.register(K::descriptor(), |config| {
            K::from_config(config).map(|agent| Box::new(agent) as Box<dyn AgentUnit>)
        })
    }

    /// Validate `raw` against the type's shape without instantiating anything.
    ///
    /// # Errors
    /// [`RegistryError::UnknownType`] or [`RegistryError::Configuration`].
    pub fn validate_config(&self, type_id: &str, raw: &Value) -> Result<Map<String, Value>, RegistryError> {
        let entry = self.entry(type_id)?;
        entry
            .descriptor
            .configuration_shape
            .validate(raw)
            .map_err(|source| RegistryError::Configuration { type_id: type_id.to_owned(), source })
    }

    /// Instantiate an agent, validating its configuration eagerly.
    ///
    /// # Errors
    /// [`RegistryError::UnknownType`] or [`RegistryError::Configuration`]; a
    /// factory rejecting the config is reported as a configuration error too.
    pub fn create(&self, type_id: &str, raw: &Value) -> Result<Box<dyn AgentUnit>, RegistryError> {
        let config = self.validate_config(type_id, raw)?;
        let entry = self.entry(type_id)?;
        (entry.factory)(&config)
            .map_err(|source| RegistryError::Configuration { type_id: type_id.to_owned(), source })
    }

    /// Introspection only; never instantiates an agent.
    pub fn describe(&self, type_id: &str) -> Result<&AgentTypeDescriptor, RegistryError> {
        self.entry(type_id).map(|entry| &entry.descriptor)
    }

    /// Every registered descriptor, ordered by `type_id`.
    pub fn list_types(&self) -> Vec<&AgentTypeDescriptor> {
        self.types.values().map(|entry| &entry.descriptor).collect()
    }

    /// Descriptors grouped by category (for palette-style UIs).
    pub fn list_by_category(&self) -> BTreeMap<AgentCategory, Vec<&AgentTypeDescriptor>> {
        let mut groups: BTreeMap<AgentCategory, Vec<&AgentTypeDescriptor>> = BTreeMap::new();
        for entry in self.types.values() {
            groups.entry(entry.descriptor.category).or_default().push(&entry.descriptor);
        }
        groups
    }

    pub fn contains(&self, type_id: &str) -> bool {
        self.types.contains_key(type_id)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    fn entry(&self, type_id: &str) -> Result<&RegisteredType, RegistryError> {
        self.types
            .get(type_id)
            .ok_or_else(|| RegistryError::UnknownType(type_id.to_owned()))
    }
}
