//! Draft store holding the in-progress configuration of one creation session.
//!
//! Sections are stored as JSON values and decoded on demand into the typed
//! section structs of the active variant. Writes always replace a section as a
//! whole so that fields belonging to an earlier, structurally different choice
//! never survive into the payload.

use std::collections::BTreeMap;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use crate::error::{CoreError, CoreResult};

/// Named slice of the draft, written by exactly one step.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Section {
    General,
    Dockerfile,
    Resources,
    Ports,
    Healthchecks,
    Configure,
    Variables,
    ValuesOverrideFile,
    ValuesOverrideArguments,
    Configuration,
    InputVariables,
}

impl Section {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::General => "general",
            Self::Dockerfile => "dockerfile",
            Self::Resources => "resources",
            Self::Ports => "ports",
            Self::Healthchecks => "healthchecks",
            Self::Configure => "configure",
            Self::Variables => "variables",
            Self::ValuesOverrideFile => "values_override_file",
            Self::ValuesOverrideArguments => "values_override_arguments",
            Self::Configuration => "configuration",
            Self::InputVariables => "input_variables",
        }
    }
}

impl std::fmt::Display for Section {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Accumulated, partially-filled configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Draft {
    sections: BTreeMap<Section, serde_json::Value>,
}

impl Draft {
    /// Create an empty draft.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a section while building a draft.
    pub fn with_section<T: Serialize>(mut self, section: Section, data: &T) -> CoreResult<Self> {
        self.set(section, data)?;
        Ok(self)
    }

    /// Raw value of a section, if it has been stored.
    pub fn get(&self, section: Section) -> Option<&serde_json::Value> {
        self.sections.get(&section)
    }

    /// Decode a section into its typed form.
    ///
    /// Returns `Ok(None)` when the section has not been stored yet and an
    /// error when it is present but does not match `T`.
    pub fn get_as<T: DeserializeOwned>(&self, section: Section) -> CoreResult<Option<T>> {
        match self.sections.get(&section) {
            None => Ok(None),
            Some(value) => serde_json::from_value(value.clone())
                .map(Some)
                .map_err(|e| CoreError::MalformedSection {
                    section: section.to_string(),
                    message: e.to_string(),
                }),
        }
    }

    /// Decode a section that must be present.
    pub fn require<T: DeserializeOwned>(&self, section: Section) -> CoreResult<T> {
        self.get_as(section)?
            .ok_or_else(|| CoreError::MissingSection(section.to_string()))
    }

    /// Replace a section with new data.
    pub fn set<T: Serialize>(&mut self, section: Section, data: &T) -> CoreResult<()> {
        let value =
            serde_json::to_value(data).map_err(|e| CoreError::Serialization(e.to_string()))?;
        self.set_value(section, value);
        Ok(())
    }

    /// Replace a section with an already-encoded value.
    pub fn set_value(&mut self, section: Section, value: serde_json::Value) {
        self.sections.insert(section, value);
    }

    pub fn remove(&mut self, section: Section) -> Option<serde_json::Value> {
        self.sections.remove(&section)
    }

    pub fn contains(&self, section: Section) -> bool {
        self.sections.contains_key(&section)
    }

    /// Sections currently stored, in a stable order.
    pub fn sections(&self) -> impl Iterator<Item = Section> + '_ {
        self.sections.keys().copied()
    }

    pub fn is_empty(&self) -> bool {
        self.sections.is_empty()
    }

    /// Read a draft from a YAML document keyed by section name.
    pub fn from_yaml_str(content: &str) -> CoreResult<Self> {
        serde_yaml::from_str(content).map_err(|e| CoreError::Serialization(e.to_string()))
    }

    /// Read a draft from a JSON document keyed by section name.
    pub fn from_json_str(content: &str) -> CoreResult<Self> {
        serde_json::from_str(content).map_err(|e| CoreError::Serialization(e.to_string()))
    }
}
