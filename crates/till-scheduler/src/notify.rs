//! # Run Notifications
//!
//! Outcome notifications for completed and failed runs. The pipeline
//! publishes one notification per finished run; the host decides where
//! they go (in-app toast, email, nothing).
//!
//! ## Delivery Contract
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  run succeeds  ──►  Normal priority, names the exported file            │
//! │  run fails     ──►  High priority, carries the error text               │
//! │  publish fails ──►  logged by the pipeline, run outcome unchanged       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use async_trait::async_trait;
use tracing::{info, warn};

use till_core::ScheduledReport;

use crate::error::SchedulerResult;

// =============================================================================
// Notification
// =============================================================================

/// Notification priority.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NotificationPriority {
    Normal,
    High,
}

/// One run-outcome notification.
#[derive(Debug, Clone)]
pub struct Notification {
    /// Id of the schedule this notification is about.
    pub report_id: String,

    /// Owner of the schedule; publishers route the notification to this
    /// user without another store lookup.
    pub user_id: String,

    /// Short headline, e.g. "Report ready: Weekly Sales".
    pub title: String,

    /// Detail text: exported file path or the failure reason.
    pub body: String,

    pub priority: NotificationPriority,
}

impl Notification {
    /// Builds the success notification for a finished run.
    pub fn success(report: &ScheduledReport, file_path: &str) -> Self {
        Notification {
            report_id: report.id.clone(),
            user_id: report.created_by_id.clone(),
            title: format!("Report ready: {}", report.name),
            body: format!("Saved to {file_path}"),
            priority: NotificationPriority::Normal,
        }
    }

    /// Builds the failure notification for a failed run.
    pub fn failure(report: &ScheduledReport, reason: &str) -> Self {
        Notification {
            report_id: report.id.clone(),
            user_id: report.created_by_id.clone(),
            title: format!("Report failed: {}", report.name),
            body: reason.to_string(),
            priority: NotificationPriority::High,
        }
    }
}

// =============================================================================
// Publisher Trait
// =============================================================================

/// Delivers run-outcome notifications (implemented by the host).
#[async_trait]
pub trait NotificationPublisher: Send + Sync {
    async fn publish(&self, notification: Notification) -> SchedulerResult<()>;
}

/// Publisher that writes notifications to the log. The default when the
/// host wires nothing else.
pub struct LogPublisher;

#[async_trait]
impl NotificationPublisher for LogPublisher {
    async fn publish(&self, notification: Notification) -> SchedulerResult<()> {
        match notification.priority {
            NotificationPriority::Normal => info!(
                report_id = %notification.report_id,
                user_id = %notification.user_id,
                title = %notification.title,
                body = %notification.body,
                "Run notification"
            ),
            NotificationPriority::High => warn!(
                report_id = %notification.report_id,
                user_id = %notification.user_id,
                title = %notification.title,
                body = %notification.body,
                "Run notification"
            ),
        }
        Ok(())
    }
}
