use serde::{Deserialize, Serialize};

/// Configuration for the owncloud plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct OwncloudConfig {
    /// ownCloud root, e.g. `https://cloud.example.org/owncloud`.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_admin_user")]
    pub admin_user: String,
    #[serde(default)]
    pub admin_password: String,
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Reported in every result and used as the result routing key source.
    #[serde(default = "default_plugin_id")]
    pub plugin_id: String,
    /// Audience of commands this follower consumes (`*.<command_audience>`).
    #[serde(default = "default_command_audience")]
    pub command_audience: String,
    /// Audience results are addressed to (`<plugin_id>.<result_audience>`).
    #[serde(default = "default_result_audience")]
    pub result_audience: String,
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default = "default_true")]
    pub durable_queue: bool,
    /// Ack commands after they are applied instead of on receipt.
    #[serde(default)]
    pub ack_after_handle: bool,
}

impl Default for OwncloudConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            admin_user: default_admin_user(),
            admin_password: String::new(),
            timeout_secs: default_timeout_secs(),
            plugin_id: default_plugin_id(),
            command_audience: default_command_audience(),
            result_audience: default_result_audience(),
            queue: default_queue(),
            durable_queue: true,
            ack_after_handle: false,
        }
    }
}

fn default_base_url() -> String {
    "http://localhost/owncloud".to_string()
}

fn default_admin_user() -> String {
    "admin".to_string()
}

fn default_timeout_secs() -> u64 {
    10
}

fn default_plugin_id() -> String {
    "owncloud".to_string()
}

fn default_command_audience() -> String {
    "req".to_string()
}

fn default_result_audience() -> String {
    "users".to_string()
}

fn default_queue() -> String {
    "owncloud".to_string()
}

fn default_true() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn partial_section_keeps_defaults() {
        let cfg: OwncloudConfig = serde_json::from_value(serde_json::json!({
            "base_url": "https://cloud.example.org",
            "admin_password": "s3cret"
        }))
        .unwrap();
        assert_eq!(cfg.base_url, "https://cloud.example.org");
        assert_eq!(cfg.plugin_id, "owncloud");
        assert_eq!(cfg.queue, "owncloud");
        assert!(cfg.durable_queue);
    }

    #[test]
    fn unknown_keys_are_rejected() {
        let r = serde_json::from_value::<OwncloudConfig>(serde_json::json!({"bogus": 1}));
        assert!(r.is_err());
    }
}
