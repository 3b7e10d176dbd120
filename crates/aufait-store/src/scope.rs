//! Request scope threaded through store and service calls.

use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Per-request context: who is acting, under which request id, and the
/// clock reading stores stamp onto records they write.
#[derive(Debug, Clone)]
pub struct RequestScope {
    request_id: String,
    actor: String,
    now: DateTime<Utc>,
}

impl RequestScope {
    pub fn new(actor: impl Into<String>) -> Self {
        Self {
            request_id: Uuid::new_v4().to_string(),
            actor: actor.into(),
            now: Utc::now(),
        }
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = request_id.into();
        self
    }

    /// Pin the clock (deterministic tests, replays).
    pub fn with_now(mut self, now: DateTime<Utc>) -> Self {
        self.now = now;
        self
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    pub fn actor(&self) -> &str {
        &self.actor
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }
}

impl Default for RequestScope {
    fn default() -> Self {
        Self::new("system")
    }
}
