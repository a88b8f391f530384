//! # till-scheduler: Scheduling Engine for Till Reports
//!
//! This crate turns persisted report schedules into files on disk. It
//! owns the live triggers, the run pipeline, and the export step; the
//! pure calendar math lives in till-core and persistence in till-db.
//!
//! ## Engine Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      till-scheduler Architecture                        │
//! │                                                                         │
//! │  ┌──────────────────────────────────────────────────────────────────┐   │
//! │  │                      ScheduleRegistry                            │   │
//! │  │                                                                  │   │
//! │  │  • One live trigger per active schedule                          │   │
//! │  │  • Atomic trigger replacement on config change                   │   │
//! │  │  • Fresh snapshot fetch at fire time                             │   │
//! │  └────────────────────────────┬─────────────────────────────────────┘   │
//! │                               │                                         │
//! │         ┌─────────────────────┼─────────────────────┐                   │
//! │         ▼                     ▼                     ▼                   │
//! │  ┌────────────────┐  ┌────────────────┐  ┌────────────────────────┐     │
//! │  │ TriggerEngine  │  │ExecutionPipeline│ │   ExportPipeline       │     │
//! │  │ (tokio sleep   │  │                │  │                        │     │
//! │  │  loops)        │  │ resolve range  │  │ csv / spreadsheet /    │     │
//! │  │                │  │ fetch aggregate│  │ document (csv          │     │
//! │  │                │  │ persist + notify│ │ fallback)              │     │
//! │  └────────────────┘  └────────────────┘  └────────────────────────┘     │
//! │                                                                         │
//! │  SEAMS (host-implemented traits):                                       │
//! │  • ReportDataProvider  - answers report queries                         │
//! │  • NotificationPublisher - delivers run outcomes                        │
//! │  • ArtifactRenderer    - produces xlsx/pdf bytes                        │
//! │  • ReportStore         - persistence (till-db impl provided)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```rust,ignore
//! use till_scheduler::{SchedulerBuilder, SchedulerConfig};
//!
//! let config = SchedulerConfig::load_or_default(None);
//! let (registry, db) = SchedulerBuilder::new(config)
//!     .with_provider(my_provider)
//!     .build()
//!     .await?;
//! registry.start().await;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod config;
pub mod error;
pub mod export;
pub mod notify;
pub mod pipeline;
pub mod provider;
pub mod registry;
pub mod store;
pub mod trigger;

// =============================================================================
// Re-exports
// =============================================================================

pub use config::SchedulerConfig;
pub use error::{SchedulerError, SchedulerResult};
pub use export::{ArtifactRenderer, ExportOutcome, ExportPipeline};
pub use notify::{LogPublisher, Notification, NotificationPriority, NotificationPublisher};
pub use pipeline::{ExecutionPipeline, RunTrigger};
pub use provider::{EmptyDataProvider, ProviderError, ReportDataProvider};
pub use registry::{ScheduleRegistry, SchedulerBuilder};
pub use store::{MemoryStore, ReportStore};
pub use trigger::{FireCallback, ManualTriggerEngine, TokioTriggerEngine, TriggerEngine, TriggerHandle};
