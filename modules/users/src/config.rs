use serde::{Deserialize, Serialize};

/// Configuration for the users plugin.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct UsersConfig {
    /// Source segment of outgoing routing keys and audience of incoming results.
    #[serde(default = "default_audience")]
    pub audience: String,
    /// Audience segment followers bind to (`<audience>.<follower_audience>`).
    #[serde(default = "default_follower_audience")]
    pub follower_audience: String,
    /// Name of the result queue.
    #[serde(default = "default_queue")]
    pub queue: String,
    #[serde(default)]
    pub durable_queue: bool,
    /// Ack results after they are handled instead of on receipt.
    #[serde(default)]
    pub ack_after_handle: bool,
    /// Also publish a Delete when a failed create is rolled back.
    #[serde(default)]
    pub notify_followers_on_rollback: bool,
    /// Seconds an unanswered command stays tracked before it is dropped.
    #[serde(default = "default_in_flight_max_age_secs")]
    pub in_flight_max_age_secs: u64,
}

impl Default for UsersConfig {
    fn default() -> Self {
        Self {
            audience: default_audience(),
            follower_audience: default_follower_audience(),
            queue: default_queue(),
            durable_queue: false,
            ack_after_handle: false,
            notify_followers_on_rollback: false,
            in_flight_max_age_secs: default_in_flight_max_age_secs(),
        }
    }
}

fn default_audience() -> String {
    "users".to_string()
}

fn default_follower_audience() -> String {
    "req".to_string()
}

fn default_queue() -> String {
    "users".to_string()
}

fn default_in_flight_max_age_secs() -> u64 {
    300
}
