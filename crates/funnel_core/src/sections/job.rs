//! Job-specific sections: dockerfile and configure (cron or lifecycle).

use serde::{Deserialize, Serialize};

/// Dockerfile step data for git-sourced jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DockerfileData {
    #[serde(default)]
    pub dockerfile_path: Option<String>,
    /// Inline Dockerfile content, used instead of a path in the repository.
    #[serde(default)]
    pub dockerfile_raw: Option<String>,
}

/// Execution limits shared by cron and lifecycle jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct JobRunSettings {
    #[serde(default)]
    pub nb_restarts: Option<u32>,
    #[serde(default)]
    pub max_duration_seconds: Option<u32>,
    #[serde(default)]
    pub port: Option<u16>,
}

/// Configure step data for cron jobs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CronConfigure {
    #[serde(default)]
    pub schedule: String,
    #[serde(default)]
    pub timezone: Option<String>,
    #[serde(flatten)]
    pub run: JobRunSettings,
}

/// One lifecycle hook (start, stop or delete).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleEvent {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub entrypoint: Option<String>,
    /// Free-text arguments, tokenized when the request is built.
    #[serde(default)]
    pub arguments: Option<String>,
}

/// Configure step data for lifecycle jobs.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LifecycleConfigure {
    #[serde(default)]
    pub on_start: Option<LifecycleEvent>,
    #[serde(default)]
    pub on_stop: Option<LifecycleEvent>,
    #[serde(default)]
    pub on_delete: Option<LifecycleEvent>,
    /// Template family the job was created from (e.g. TERRAFORM).
    #[serde(default)]
    pub lifecycle_type: Option<String>,
    #[serde(flatten)]
    pub run: JobRunSettings,
}

impl LifecycleConfigure {
    /// Hooks in declaration order, paired with their field name.
    pub fn events(&self) -> [(&'static str, Option<&LifecycleEvent>); 3] {
        [
            ("on_start", self.on_start.as_ref()),
            ("on_stop", self.on_stop.as_ref()),
            ("on_delete", self.on_delete.as_ref()),
        ]
    }

    pub fn any_enabled(&self) -> bool {
        self.events()
            .iter()
            .any(|(_, event)| event.is_some_and(|e| e.enabled))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_cron_configure_flattens_run_settings() {
        let configure: CronConfigure = serde_json::from_value(json!({
            "schedule": "*/5 * * * *",
            "nb_restarts": 2,
            "max_duration_seconds": 300
        }))
        .unwrap();

        assert_eq!(configure.run.nb_restarts, Some(2));
        assert_eq!(configure.run.max_duration_seconds, Some(300));
        assert!(configure.timezone.is_none());
    }

    #[test]
    fn test_lifecycle_any_enabled() {
        let mut configure = LifecycleConfigure::default();
        assert!(!configure.any_enabled());

        configure.on_stop = Some(LifecycleEvent {
            enabled: false,
            entrypoint: None,
            arguments: None,
        });
        assert!(!configure.any_enabled());

        configure.on_delete = Some(LifecycleEvent {
            enabled: true,
            ..LifecycleEvent::default()
        });
        assert!(configure.any_enabled());
    }
}
