//! Agent type metadata exposed for introspection.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::ConfigShape;

/// Coarse grouping used by UIs to lay out the agent palette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AgentCategory {
    DataRetrieval,
    Action,
    Analysis,
    Communication,
}

impl fmt::Display for AgentCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DataRetrieval => write!(f, "data_retrieval"),
            Self::Action => write!(f, "action"),
            Self::Analysis => write!(f, "analysis"),
            Self::Communication => write!(f, "communication"),
        }
    }
}

/// Immutable description of one registered agent type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentTypeDescriptor {
    /// Unique key graphs use to reference this type.
    pub type_id: String,
    pub display_name: String,
    pub category: AgentCategory,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub icon: String,
    #[serde(default)]
    pub supported_connectors: Vec<String>,
    pub configuration_shape: ConfigShape,
}

impl AgentTypeDescriptor {
    pub fn new(
        type_id: impl Into<String>,
        display_name: impl Into<String>,
        category: AgentCategory,
    ) -> Self {
        Self {
            type_id: type_id.into(),
            display_name: display_name.into(),
            category,
            description: String::new(),
            icon: "cog".to_string(),
            supported_connectors: Vec::new(),
            configuration_shape: ConfigShape::empty(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    pub fn with_icon(mut self, icon: impl Into<String>) -> Self {
        self.icon = icon.into();
        self
    }

    pub fn with_connectors<I, S>(mut self, connectors: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.supported_connectors = connectors.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_shape(mut self, shape: ConfigShape) -> Self {
        self.configuration_shape = shape;
        self
    }

    /// API/UI view: metadata plus the configuration shape as JSON Schema.
    pub fn to_metadata(&self) -> Value {
        json!({
            "id": self.type_id,
            "name": self.display_name,
            "description": self.description,
            "icon": self.icon,
            "category": self.category,
            "supported_connectors": self.supported_connectors,
            "config_schema": self.configuration_shape.to_json_schema(),
        })
    }
}
