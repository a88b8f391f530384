//! # Trigger Engine
//!
//! One live timer per active schedule. A trigger owns a small task that
//! sleeps until the next recurrence occurrence, fires the callback, and
//! re-arms for the occurrence after that.
//!
//! ## Trigger Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  create(spec, callback)                                                 │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  loop:                                                                  │
//! │    next = spec.next_occurrence(now)     (None → trigger retires)        │
//! │    sleep until next ──────────────► callback().await                    │
//! │       ▲                                  │                              │
//! │       └──────────── re-arm ◄─────────────┘                              │
//! │                                                                         │
//! │  handle.stop() ──► task exits, no further fires                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The callback decides everything else (snapshot fetch, pipeline run);
//! the trigger only keeps time.

use std::future::Future;
use std::pin::Pin;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use chrono::Local;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use till_core::RecurrenceSpec;

/// Async callback invoked on each fire.
pub type FireCallback =
    Arc<dyn Fn() -> Pin<Box<dyn Future<Output = ()> + Send>> + Send + Sync>;

// =============================================================================
// Trigger Handle
// =============================================================================

/// Handle to a live trigger. Stopping is fire-and-forget and idempotent;
/// dropping the handle also retires the trigger.
pub struct TriggerHandle {
    shutdown_tx: mpsc::Sender<()>,
}

impl TriggerHandle {
    /// Signals the trigger task to exit. No further fires happen after
    /// the signal is observed.
    pub fn stop(&self) {
        let _ = self.shutdown_tx.try_send(());
    }
}

// =============================================================================
// Engine Trait
// =============================================================================

/// Creates live triggers from compiled recurrence specs. The registry
/// talks to this trait so tests can drive fires by hand.
pub trait TriggerEngine: Send + Sync {
    fn create(&self, report_id: &str, spec: RecurrenceSpec, callback: FireCallback)
        -> TriggerHandle;
}

// =============================================================================
// Tokio Engine
// =============================================================================

/// Production engine: one tokio task per trigger, sleeping on the wall
/// clock between occurrences.
#[derive(Default)]
pub struct TokioTriggerEngine;

impl TokioTriggerEngine {
    pub fn new() -> Self {
        TokioTriggerEngine
    }
}

impl TriggerEngine for TokioTriggerEngine {
    fn create(
        &self,
        report_id: &str,
        spec: RecurrenceSpec,
        callback: FireCallback,
    ) -> TriggerHandle {
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);
        let report_id = report_id.to_string();

        tokio::spawn(async move {
            loop {
                let now = Local::now().naive_local();
                let next = match spec.next_occurrence(now) {
                    Some(next) => next,
                    None => {
                        warn!(report_id = %report_id, "No further occurrences, trigger retiring");
                        break;
                    }
                };

                let wait = (next - now).to_std().unwrap_or(std::time::Duration::ZERO);
                debug!(
                    report_id = %report_id,
                    next = %next,
                    "Trigger armed"
                );

                tokio::select! {
                    _ = tokio::time::sleep(wait) => {
                        callback().await;
                    }
                    _ = shutdown_rx.recv() => {
                        debug!(report_id = %report_id, "Trigger stopped");
                        break;
                    }
                }
            }
        });

        TriggerHandle { shutdown_tx }
    }
}

// =============================================================================
// Manual Engine (test double)
// =============================================================================

/// Engine whose triggers never fire on their own; tests call
/// [`ManualTriggerEngine::fire`] to simulate the clock reaching an
/// occurrence.
#[derive(Default)]
pub struct ManualTriggerEngine {
    seq: AtomicU64,
    triggers: Arc<Mutex<Vec<(u64, String, FireCallback)>>>,
}

impl ManualTriggerEngine {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of live (not stopped) triggers.
    pub fn active_count(&self) -> usize {
        self.triggers.lock().unwrap().len()
    }

    /// Fires every live trigger registered for the given report id.
    pub async fn fire(&self, report_id: &str) {
        let callbacks: Vec<FireCallback> = self
            .triggers
            .lock()
            .unwrap()
            .iter()
            .filter(|(_, id, _)| id == report_id)
            .map(|(_, _, cb)| cb.clone())
            .collect();

        for callback in callbacks {
            callback().await;
        }
    }
}

impl TriggerEngine for ManualTriggerEngine {
    fn create(
        &self,
        report_id: &str,
        _spec: RecurrenceSpec,
        callback: FireCallback,
    ) -> TriggerHandle {
        let seq = self.seq.fetch_add(1, Ordering::SeqCst);
        let (shutdown_tx, mut shutdown_rx) = mpsc::channel(1);

        self.triggers
            .lock()
            .unwrap()
            .push((seq, report_id.to_string(), callback));

        // Retire the entry when the handle stops or is dropped
        let triggers = self.triggers.clone();
        tokio::spawn(async move {
            let _ = shutdown_rx.recv().await;
            triggers.lock().unwrap().retain(|(s, _, _)| *s != seq);
        });

        TriggerHandle { shutdown_tx }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use till_core::{recurrence, ScheduleConfig, ScheduleType};

    fn daily_spec() -> RecurrenceSpec {
        recurrence::compile(ScheduleType::Daily, &ScheduleConfig::default()).unwrap()
    }

    fn counting_callback(counter: Arc<AtomicUsize>) -> FireCallback {
        Arc::new(move || {
            let counter = counter.clone();
            Box::pin(async move {
                counter.fetch_add(1, Ordering::SeqCst);
            })
        })
    }

    #[tokio::test]
    async fn test_manual_engine_fire_and_stop() {
        let engine = ManualTriggerEngine::new();
        let counter = Arc::new(AtomicUsize::new(0));

        let handle = engine.create("r-1", daily_spec(), counting_callback(counter.clone()));
        assert_eq!(engine.active_count(), 1);

        engine.fire("r-1").await;
        engine.fire("other").await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);

        handle.stop();
        // Give the retirement task a chance to run
        tokio::task::yield_now().await;
        tokio::task::yield_now().await;
        assert_eq!(engine.active_count(), 0);

        engine.fire("r-1").await;
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_tokio_engine_fires_callback() {
        let engine = TokioTriggerEngine::new();
        let (tx, mut rx) = mpsc::channel(4);

        let callback: FireCallback = Arc::new(move || {
            let tx = tx.clone();
            Box::pin(async move {
                let _ = tx.send(()).await;
            })
        });

        // Paused tokio time auto-advances through the sleep
        let handle = engine.create("r-1", daily_spec(), callback);
        rx.recv().await.expect("trigger should fire");
        handle.stop();
    }
}
