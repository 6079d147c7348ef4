//! Identity and provenance.
//!
//! An [`Agent`] supplies the timestamp and signature stamped onto a
//! [`Source`](crate::source::Source). It is consulted exactly once per
//! commit, never during staging or replay.

use std::future::Future;

use chrono::{DateTime, Utc};

/// Provenance for one source: when it was committed and by whom.
#[derive(Clone, Debug)]
pub struct AgentStamp {
    pub timestamp: DateTime<Utc>,
    /// Opaque signature payload; adapters persist it verbatim.
    pub signature: serde_json::Value,
}

/// Supplies commit-time provenance.
///
/// The `signature_profile` names which of the agent's signature variants to
/// emit (e.g. a terse profile for high-volume writers, a verbose one for
/// auditing).
pub trait Agent: Send + Sync {
    fn stamp<'a>(
        &'a self,
        signature_profile: &'a str,
    ) -> impl Future<Output = AgentStamp> + Send + 'a;
}

/// Wall-clock agent signing with a static role description.
///
/// Suitable for tests and embedded single-process use; services usually
/// implement [`Agent`] against their request context instead.
#[derive(Clone, Debug)]
pub struct SystemAgent {
    role: String,
}

impl SystemAgent {
    #[must_use]
    pub fn new(role: impl Into<String>) -> Self {
        Self { role: role.into() }
    }
}

impl Default for SystemAgent {
    fn default() -> Self {
        Self::new("system")
    }
}

impl Agent for SystemAgent {
    async fn stamp(&self, signature_profile: &str) -> AgentStamp {
        AgentStamp {
            timestamp: Utc::now(),
            signature: serde_json::json!({
                "role": self.role,
                "profile": signature_profile,
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn system_agent_signs_with_role_and_profile() {
        let agent = SystemAgent::new("tester");
        let stamp = agent.stamp("audit").await;
        assert_eq!(stamp.signature["role"], "tester");
        assert_eq!(stamp.signature["profile"], "audit");
    }

    #[tokio::test]
    async fn system_agent_timestamps_monotonically_enough() {
        let agent = SystemAgent::default();
        let earlier = Utc::now();
        let stamp = agent.stamp("default").await;
        assert!(stamp.timestamp >= earlier);
    }
}
