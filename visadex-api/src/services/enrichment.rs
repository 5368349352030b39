//! Batch visa-status enrichment loop
//!
//! A recurring timer drives ticks. Each tick selects a bounded batch of
//! unresolved (passport, destination) pairs, classifies them concurrently,
//! and persists every successful result. An empty fetch is the loop's own
//! termination signal. Per-pair failures never abort sibling pairs; a
//! failed pair keeps its NULL status and is retried on a later tick.
//!
//! Ticks run inline on the loop task and missed timer fires are dropped,
//! not queued, so a slow tick can never overlap the next one.

use async_trait::async_trait;
use futures::stream::{FuturesUnordered, StreamExt};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use visadex_common::config::EnrichmentConfig;
use visadex_common::db::models::{UnresolvedPair, VisaStatus};
use visadex_common::Result;

use crate::services::classifier::Classifier;

/// Data access contract consumed by the enrichment loop
#[async_trait]
pub trait VisaStore: Send + Sync {
    /// Fetch up to `limit` unresolved records (status IS NULL), optionally
    /// restricted to one passport country, in the store's natural order.
    async fn fetch_unresolved(&self, scope: Option<i64>, limit: i64)
        -> Result<Vec<UnresolvedPair>>;

    /// Update exactly one record by id. Never inserts.
    async fn persist_status(&self, id: i64, status: VisaStatus, notes: &str) -> Result<()>;
}

/// Timer and batch settings for the loop
#[derive(Debug, Clone)]
pub struct EnrichmentSettings {
    /// Time between ticks
    pub interval: Duration,
    /// Maximum records fetched per tick
    pub batch_limit: i64,
}

impl From<&EnrichmentConfig> for EnrichmentSettings {
    fn from(config: &EnrichmentConfig) -> Self {
        Self {
            interval: Duration::from_secs(config.interval_seconds),
            batch_limit: config.batch_limit,
        }
    }
}

/// Result of a start request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOutcome {
    Started,
    /// A loop is already armed or mid-tick; no second timer is created
    AlreadyRunning,
}

/// Result of a stop request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StopOutcome {
    Stopped,
    NotRunning,
}

/// What one tick accomplished
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TickOutcome {
    /// Batch processed; loop stays armed
    Progressed { updated: usize, failed: usize },
    /// Zero unresolved records: the loop should self-terminate
    AllResolved,
}

/// Mutable loop state, serialized behind one mutex so start/stop/self-
/// terminate can never race an orphaned timer into existence.
struct LoopState {
    cancel: Option<CancellationToken>,
    scope: Option<i64>,
}

/// Controller owning the single enrichment loop instance.
///
/// Store and classifier are injected so tests can run the loop against
/// in-memory fakes. Scope is fixed for the lifetime of one run; changing it
/// requires stop + start.
pub struct EnrichmentController {
    store: Arc<dyn VisaStore>,
    classifier: Arc<dyn Classifier>,
    settings: EnrichmentSettings,
    state: Arc<Mutex<LoopState>>,
}

impl EnrichmentController {
    pub fn new(
        store: Arc<dyn VisaStore>,
        classifier: Arc<dyn Classifier>,
        settings: EnrichmentSettings,
    ) -> Self {
        Self {
            store,
            classifier,
            settings,
            state: Arc::new(Mutex::new(LoopState {
                cancel: None,
                scope: None,
            })),
        }
    }

    /// Arm the recurring timer. Idempotent: a second start while running
    /// reports `AlreadyRunning` without touching the active loop.
    pub async fn start(&self, scope: Option<i64>) -> StartOutcome {
        let mut state = self.state.lock().await;

        if state.cancel.as_ref().is_some_and(|t| !t.is_cancelled()) {
            return StartOutcome::AlreadyRunning;
        }

        let cancel = CancellationToken::new();
        state.cancel = Some(cancel.clone());
        state.scope = scope;
        drop(state);

        info!(?scope, interval = ?self.settings.interval, "Visa enrichment loop started");

        let store = Arc::clone(&self.store);
        let classifier = Arc::clone(&self.classifier);
        let settings = self.settings.clone();
        let loop_state = Arc::clone(&self.state);

        tokio::spawn(async move {
            run_loop(store, classifier, settings, scope, cancel, loop_state).await;
        });

        StartOutcome::Started
    }

    /// Cancel future ticks. An in-flight tick finishes its writes; that is
    /// safe because persists are idempotent by id.
    pub async fn stop(&self) -> StopOutcome {
        let mut state = self.state.lock().await;

        match state.cancel.take() {
            Some(cancel) => {
                cancel.cancel();
                state.scope = None;
                info!("Visa enrichment loop stopped");
                StopOutcome::Stopped
            }
            None => StopOutcome::NotRunning,
        }
    }

    pub async fn is_running(&self) -> bool {
        let state = self.state.lock().await;
        state.cancel.as_ref().is_some_and(|t| !t.is_cancelled())
    }

    /// Scope of the active run, if any
    pub async fn current_scope(&self) -> Option<i64> {
        let state = self.state.lock().await;
        if state.cancel.as_ref().is_some_and(|t| !t.is_cancelled()) {
            state.scope
        } else {
            None
        }
    }
}

/// Timer loop: one tick per interval until cancelled or all records resolve.
async fn run_loop(
    store: Arc<dyn VisaStore>,
    classifier: Arc<dyn Classifier>,
    settings: EnrichmentSettings,
    scope: Option<i64>,
    cancel: CancellationToken,
    state: Arc<Mutex<LoopState>>,
) {
    let mut ticker = tokio::time::interval(settings.interval);
    // Fires skipped while a tick is in flight are dropped, not queued
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = cancel.cancelled() => break,
            _ = ticker.tick() => {
                match run_tick(&*store, &*classifier, scope, settings.batch_limit).await {
                    Ok(TickOutcome::Progressed { updated, failed }) => {
                        info!(updated, failed, "Enrichment tick complete");
                    }
                    Ok(TickOutcome::AllResolved) => {
                        info!("All visa statuses are updated, stopping the loop");
                        let mut state = state.lock().await;
                        // Our token still uncancelled means the state entry is
                        // ours: stop() always cancels before clearing it.
                        if !cancel.is_cancelled() {
                            state.cancel = None;
                            state.scope = None;
                        }
                        cancel.cancel();
                        break;
                    }
                    Err(e) => {
                        // Batch fetch failed; timer stays armed for another attempt
                        warn!(error = %e, "Enrichment tick aborted, will retry");
                    }
                }
            }
        }
    }
}

/// One batch: fetch, fan out classification, persist successes.
async fn run_tick(
    store: &dyn VisaStore,
    classifier: &dyn Classifier,
    scope: Option<i64>,
    batch_limit: i64,
) -> Result<TickOutcome> {
    let batch = store.fetch_unresolved(scope, batch_limit).await?;

    if batch.is_empty() {
        return Ok(TickOutcome::AllResolved);
    }

    info!(count = batch.len(), "Processing visa records");

    let mut tasks: FuturesUnordered<_> = batch
        .into_iter()
        .map(|pair| async move {
            let outcome = classifier.classify(&pair.passport, &pair.destination).await;
            (pair, outcome)
        })
        .collect();

    let mut updated = 0;
    let mut failed = 0;

    while let Some((pair, outcome)) = tasks.next().await {
        match outcome {
            Ok(classification) => {
                match store
                    .persist_status(pair.id, classification.status, &classification.notes)
                    .await
                {
                    Ok(()) => updated += 1,
                    Err(e) => {
                        failed += 1;
                        warn!(id = pair.id, error = %e, "Failed to persist visa status");
                    }
                }
            }
            Err(e) => {
                failed += 1;
                warn!(
                    passport = %pair.passport,
                    destination = %pair.destination,
                    error = %e,
                    "Classification failed, record left unresolved"
                );
            }
        }
    }

    Ok(TickOutcome::Progressed { updated, failed })
}
