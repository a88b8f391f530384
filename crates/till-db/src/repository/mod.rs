//! # Repository Module
//!
//! Database repository implementations for Till Reports.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Repository Pattern                                   │
//! │                                                                         │
//! │  Scheduler / host app                                                   │
//! │       │                                                                 │
//! │       │  db.reports().list_active()                                     │
//! │       ▼                                                                 │
//! │  ReportRepository                                                       │
//! │  ├── insert(&self, new_report)                                          │
//! │  ├── get_by_id(&self, id)                                               │
//! │  ├── list_active(&self)                                                 │
//! │  ├── update(&self, report)                                              │
//! │  └── update_run_times(&self, id, last, next)                            │
//! │       │                                                                 │
//! │       │  SQL + config blob validation                                   │
//! │       ▼                                                                 │
//! │  SQLite Database                                                        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`report::ReportRepository`] - Scheduled report CRUD and run bookkeeping

pub mod report;
