//! Backend Health Monitoring
//!
//! A tri-state view of whether the workflow backend answers its health probe.
//!
//! ```text
//! +---------+   probe ok    +--------------+
//! | Unknown | ------------> | Healthy(msg) | <--+
//! +---------+               +--------------+    | probe ok
//!      |                      |       ^         |
//!      | probe failed         |       +---------+
//!      v                      v probe failed
//! +-------------+ <-----------+
//! | Unreachable | ---- probe ok ----> Healthy(msg)
//! +-------------+
//! ```
//!
//! Failures never escape: a failed probe is just another status. Overlapping
//! checks are allowed and the last one to finish wins.

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use parking_lot::RwLock;
use tokio::task::JoinHandle;

use crate::transport::WorkflowTransport;

/// Health of the workflow backend
#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub enum HealthStatus {
    /// Not probed yet
    #[default]
    Unknown,
    /// Probe succeeded with this backend-reported status
    Healthy(String),
    /// Probe failed
    Unreachable,
}

impl HealthStatus {
    /// Whether the last probe succeeded
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy(_))
    }
}

impl fmt::Display for HealthStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unknown => write!(f, "unknown"),
            Self::Healthy(status) => write!(f, "{status}"),
            Self::Unreachable => write!(f, "unreachable"),
        }
    }
}

/// Probes backend health and keeps the latest status
pub struct HealthMonitor<T: WorkflowTransport> {
    transport: Arc<T>,
    status: Arc<RwLock<HealthStatus>>,
}

impl<T: WorkflowTransport> Clone for HealthMonitor<T> {
    fn clone(&self) -> Self {
        Self {
            transport: Arc::clone(&self.transport),
            status: Arc::clone(&self.status),
        }
    }
}

impl<T: WorkflowTransport + 'static> HealthMonitor<T> {
    /// Create a monitor with status `Unknown`
    pub fn new(transport: Arc<T>) -> Self {
        Self {
            transport,
            status: Arc::new(RwLock::new(HealthStatus::Unknown)),
        }
    }

    /// Latest status
    #[must_use]
    pub fn status(&self) -> HealthStatus {
        self.status.read().clone()
    }

    /// Probe once and record the result
    pub async fn check(&self) -> HealthStatus {
        let next = match self.transport.health().await {
            Ok(status) => HealthStatus::Healthy(status),
            Err(e) => {
                tracing::debug!(error = %e, "Health probe failed");
                HealthStatus::Unreachable
            }
        };

        let previous = std::mem::replace(&mut *self.status.write(), next.clone());
        if previous != next {
            tracing::info!(from = %previous, to = %next, "Backend health changed");
        }
        next
    }

    /// Probe once in the background
    pub fn spawn_check(&self) -> JoinHandle<HealthStatus> {
        let monitor = self.clone();
        tokio::spawn(async move { monitor.check().await })
    }

    /// Probe now and then every `interval` until the handle is aborted
    pub fn spawn_polling(&self, interval: Duration) -> JoinHandle<()> {
        let monitor = self.clone();
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                monitor.check().await;
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_display() {
        assert_eq!(HealthStatus::Unknown.to_string(), "unknown");
        assert_eq!(HealthStatus::Healthy("ok".to_string()).to_string(), "ok");
        assert_eq!(HealthStatus::Unreachable.to_string(), "unreachable");
    }

    #[test]
    fn test_default_is_unknown() {
        assert_eq!(HealthStatus::default(), HealthStatus::Unknown);
        assert!(!HealthStatus::default().is_healthy());
    }
}
