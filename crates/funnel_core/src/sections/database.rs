//! Database sections.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseType {
    Postgresql,
    Mysql,
    Mongodb,
    Redis,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DatabaseMode {
    /// Provisioned by the cloud provider (RDS, ElastiCache, ...).
    Managed,
    /// Runs as a container inside the cluster.
    Container,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Accessibility {
    Public,
    #[default]
    Private,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DatabaseGeneral {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub icon_uri: Option<String>,
    #[serde(rename = "type")]
    pub database_type: DatabaseType,
    pub version: String,
    pub mode: DatabaseMode,
    #[serde(default)]
    pub accessibility: Accessibility,
    #[serde(default)]
    pub labels_groups: Vec<String>,
    #[serde(default)]
    pub annotations_groups: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_database_general_parses() {
        let general: DatabaseGeneral = serde_json::from_value(json!({
            "name": "orders-db",
            "type": "POSTGRESQL",
            "version": "16",
            "mode": "MANAGED"
        }))
        .unwrap();

        assert_eq!(general.database_type, DatabaseType::Postgresql);
        assert_eq!(general.mode, DatabaseMode::Managed);
        assert_eq!(general.accessibility, Accessibility::Private);
    }
}
