//! Reconnect Supervisor: keeps a ready session alive.
//!
//! ```text
//! loop {
//!     if session not ready {
//!         establish()          // discard old session, connect, handshake
//!         on failure: sleep(backoff)
//!     }
//!     sleep(poll_interval)
//! }
//! ```
//!
//! There is no exponential back-off and no retry limit.  A dropped session is
//! noticed at the next readiness check, so it is replaced within one poll
//! interval when the studio accepts the next attempt.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::sleep;
use tracing::{debug, warn};

use crate::application::session_manager::{SessionError, SessionManager};

/// Pause after a failed attempt.
pub const DEFAULT_BACKOFF: Duration = Duration::from_secs(5);

/// Pause between two readiness checks.
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);

/// Timing of the supervisor loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReconnectPolicy {
    /// Pause between readiness checks, also after a successful attempt.
    pub poll_interval: Duration,
    /// Extra pause after a failed attempt.
    pub backoff: Duration,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            poll_interval: DEFAULT_POLL_INTERVAL,
            backoff: DEFAULT_BACKOFF,
        }
    }
}

/// Result of one readiness check.
#[derive(Debug)]
pub enum SupervisorStep {
    /// The session was already ready.
    Healthy,
    /// A new session was established.
    Established { negotiated_rpc_version: u32 },
    /// The attempt failed.
    Failed(SessionError),
}

/// Background loop that re-establishes the session whenever it is not ready.
pub struct ReconnectSupervisor {
    manager: Arc<SessionManager>,
    policy: ReconnectPolicy,
}

impl ReconnectSupervisor {
    /// Creates a supervisor for `manager`.
    pub fn new(manager: Arc<SessionManager>, policy: ReconnectPolicy) -> Self {
        Self { manager, policy }
    }

    /// Checks readiness once and reconnects if needed.  Does not sleep.
    pub async fn step(&self) -> SupervisorStep {
        if self.manager.is_ready().await {
            return SupervisorStep::Healthy;
        }
        match self.manager.establish().await {
            Ok(negotiated_rpc_version) => SupervisorStep::Established {
                negotiated_rpc_version,
            },
            Err(e) => SupervisorStep::Failed(e),
        }
    }

    /// Runs forever.  Spawn it as a task and abort the task to stop it.
    pub async fn run(self) {
        debug!(policy = ?self.policy, "reconnect supervisor started");
        loop {
            if let SupervisorStep::Failed(e) = self.step().await {
                warn!(
                    "could not establish session with {}: {e}; retrying in {:?}",
                    self.manager.endpoint(),
                    self.policy.backoff
                );
                sleep(self.policy.backoff).await;
            }
            sleep(self.policy.poll_interval).await;
        }
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::session_manager::SessionConfig;
    use crate::application::transport::Connector;
    use crate::infrastructure::mock_transport::{MockConnector, MockHandle};
    use tokio::time::Instant;

    fn supervised(connector: &Arc<MockConnector>) -> (Arc<SessionManager>, ReconnectSupervisor) {
        let connector: Arc<dyn Connector> = Arc::clone(connector) as Arc<dyn Connector>;
        let manager = Arc::new(SessionManager::new(connector, SessionConfig::default()));
        let supervisor = ReconnectSupervisor::new(Arc::clone(&manager), ReconnectPolicy::default());
        (manager, supervisor)
    }

    /// Polls in 10 ms steps of (possibly paused) time until `manager` reaches
    /// generation `generation` and is ready.
    async fn wait_ready(manager: &SessionManager, generation: u64) {
        loop {
            let status = manager.status().await;
            if status.generation >= generation && manager.is_ready().await {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    }

    #[tokio::test]
    async fn test_step_establishes_then_reports_healthy() {
        // Arrange
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(MockHandle::accepting(1));
        let (_manager, supervisor) = supervised(&connector);

        // Act
        let first = supervisor.step().await;
        let second = supervisor.step().await;

        // Assert
        assert!(matches!(
            first,
            SupervisorStep::Established {
                negotiated_rpc_version: 1
            }
        ));
        assert!(matches!(second, SupervisorStep::Healthy));
        assert_eq!(connector.attempts(), 1);
    }

    #[tokio::test]
    async fn test_step_reports_failure() {
        let connector = Arc::new(MockConnector::new());
        connector.push_refusal();
        let (_manager, supervisor) = supervised(&connector);

        assert!(matches!(
            supervisor.step().await,
            SupervisorStep::Failed(SessionError::Connect(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_session_is_replaced_within_one_poll_interval() {
        // Arrange
        let first = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&first));
        connector.push_peer(MockHandle::accepting(1));
        let (manager, supervisor) = supervised(&connector);
        let task = tokio::spawn(supervisor.run());
        wait_ready(&manager, 1).await;

        // Act
        first.hang_up();
        let dropped_at = Instant::now();
        wait_ready(&manager, 2).await;

        // Assert
        let elapsed = dropped_at.elapsed();
        assert!(
            elapsed <= DEFAULT_POLL_INTERVAL + Duration::from_millis(10),
            "reconnect took {elapsed:?}"
        );
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_refused_attempt_waits_for_backoff_then_recovers() {
        // Arrange
        let first = MockHandle::accepting(1);
        let connector = Arc::new(MockConnector::new());
        connector.push_peer(Arc::clone(&first));
        connector.push_refusal();
        connector.push_peer(MockHandle::accepting(1));
        let (manager, supervisor) = supervised(&connector);
        let task = tokio::spawn(supervisor.run());
        wait_ready(&manager, 1).await;

        // Act
        first.hang_up();
        let dropped_at = Instant::now();
        wait_ready(&manager, 3).await;

        // Assert: one poll to notice, back-off, one poll, then the retry
        let elapsed = dropped_at.elapsed();
        assert!(elapsed >= DEFAULT_BACKOFF, "retried after only {elapsed:?}");
        assert!(
            elapsed <= DEFAULT_BACKOFF + 2 * DEFAULT_POLL_INTERVAL + Duration::from_millis(10),
            "reconnect took {elapsed:?}"
        );
        assert_eq!(connector.attempts(), 3);
        task.abort();
    }

    #[tokio::test(start_paused = true)]
    async fn test_supervisor_retries_forever() {
        // Arrange: the studio is never reachable
        let connector = Arc::new(MockConnector::new());
        let (manager, supervisor) = supervised(&connector);
        let task = tokio::spawn(supervisor.run());

        // Act: one minute of paused time
        sleep(Duration::from_secs(60)).await;

        // Assert: one attempt per back-off + poll cycle
        let attempts = connector.attempts();
        assert!((9..=11).contains(&attempts), "attempts = {attempts}");
        assert!(!manager.is_ready().await);
        task.abort();
    }
}
