//! Configuration loading and management

use crate::core::error::ConfigError;
use serde::{Deserialize, Serialize};

/// What deleting a lead does to its follow-ups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeletePolicy {
    /// Delete the lead's follow-ups before the lead itself
    #[default]
    Cascade,
    /// Leave follow-ups in the backend and hide them while their lead is absent
    Orphan,
}

/// Follow-up reminder settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReminderConfig {
    /// Days ahead of today that count as "upcoming" (1 = tomorrow)
    pub horizon_days: i64,
}

impl Default for ReminderConfig {
    fn default() -> Self {
        Self { horizon_days: 1 }
    }
}

/// Notification settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NotificationConfig {
    /// Forward notices to the notifier (failures are logged either way)
    pub enabled: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

/// Complete configuration of a lead mirror
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MirrorConfig {
    /// Buffer size for the change-feed channels of a backend built from
    /// this config, e.g. `InMemoryBackend::with_capacity`
    pub event_capacity: usize,

    pub delete_policy: DeletePolicy,

    pub reminders: ReminderConfig,

    pub notifications: NotificationConfig,
}

impl Default for MirrorConfig {
    fn default() -> Self {
        Self {
            event_capacity: 1024,
            delete_policy: DeletePolicy::default(),
            reminders: ReminderConfig::default(),
            notifications: NotificationConfig::default(),
        }
    }
}

impl MirrorConfig {
    /// Load configuration from a YAML file
    pub fn from_yaml_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|_| ConfigError::FileNotFound {
            path: path.to_string(),
        })?;
        Self::from_yaml_str(&content)
    }

    /// Load configuration from a YAML string
    pub fn from_yaml_str(yaml: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(yaml)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values no mirror can run with
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.event_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                field: "event_capacity".to_string(),
                message: "must be greater than zero".to_string(),
            });
        }
        if self.reminders.horizon_days < 0 {
            return Err(ConfigError::InvalidValue {
                field: "reminders.horizon_days".to_string(),
                message: "must not be negative".to_string(),
            });
        }
        Ok(())
    }
}
