use std::collections::HashMap;
use std::sync::{Arc, Mutex, mpsc};
use std::thread;
use std::time::{Duration, Instant};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use invenhub_products::ProductId;
use invenhub_purchasing::PurchaseOrderId;

use super::planner::{PlannedOrder, ReorderPlanner, ReorderSnapshot};
use crate::projections::ReadModels;

/// Files a planned purchase order (origin `auto_reorder`).
pub trait ReorderExecutor: Send + Sync + 'static {
    type Error: std::fmt::Display;

    fn file_order(&self, order: &PlannedOrder) -> Result<PurchaseOrderId, Self::Error>;
}

#[derive(Debug, Error)]
pub enum ReorderError {
    #[error("{failed} of {planned} reorder(s) failed: {first}")]
    Executor {
        planned: usize,
        failed: usize,
        first: String,
    },

    #[error("reorder state lock poisoned")]
    Poisoned,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReorderOutcome {
    pub orders: Vec<PurchaseOrderId>,
    pub lines: usize,
}

/// One reorder pass over the current read models.
///
/// Passes are serialized: a manual run and the background runner never plan
/// from the same snapshot concurrently.
pub struct ReorderJob<X> {
    read_models: ReadModels,
    planner: ReorderPlanner,
    executor: Arc<X>,
    cooldowns: Mutex<HashMap<ProductId, DateTime<Utc>>>,
}

impl<X: ReorderExecutor> ReorderJob<X> {
    pub fn new(read_models: ReadModels, planner: ReorderPlanner, executor: Arc<X>) -> Self {
        Self {
            read_models,
            planner,
            executor,
            cooldowns: Mutex::new(HashMap::new()),
        }
    }

    pub fn run_once(&self, now: DateTime<Utc>) -> Result<ReorderOutcome, ReorderError> {
        let mut cooldowns = self.cooldowns.lock().map_err(|_| ReorderError::Poisoned)?;

        let products = self.read_models.products.list();
        let stock = self.read_models.stock.list();
        let suppliers = self.read_models.suppliers.list();
        let orders = self.read_models.purchase_orders.list(None);

        let planned = self.planner.plan(
            &ReorderSnapshot {
                products: &products,
                stock: &stock,
                suppliers: &suppliers,
                orders: &orders,
                cooldowns: &cooldowns,
            },
            now,
        );

        let mut outcome = ReorderOutcome::default();
        let mut failures = Vec::new();
        for order in &planned {
            match self.executor.file_order(order) {
                Ok(order_id) => {
                    for line in &order.lines {
                        cooldowns.insert(line.product_id, now);
                    }
                    info!(%order_id, supplier_id = %order.supplier_id, lines = order.lines.len(), "auto-reorder filed");
                    outcome.orders.push(order_id);
                    outcome.lines += order.lines.len();
                }
                Err(e) => {
                    warn!(supplier_id = %order.supplier_id, error = %e, "auto-reorder failed");
                    failures.push(e.to_string());
                }
            }
        }

        match failures.into_iter().next() {
            None => Ok(outcome),
            Some(first) => Err(ReorderError::Executor {
                planned: planned.len(),
                failed: planned.len() - outcome.orders.len(),
                first,
            }),
        }
    }
}

/// Scheduling config for the background reorder thread.
#[derive(Debug, Clone)]
pub struct ReorderRunner {
    pub interval: Duration,
    pub max_retries: u32,
    pub base_backoff: Duration,
}

impl Default for ReorderRunner {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(300),
            max_retries: 5,
            base_backoff: Duration::from_millis(250),
        }
    }
}

/// Handle for the running reorder thread (shutdown + trigger hook).
#[derive(Debug)]
pub struct ReorderRunnerHandle {
    shutdown: mpsc::Sender<()>,
    trigger: mpsc::SyncSender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ReorderRunnerHandle {
    /// Request a pass soon (call after stock went down).
    ///
    /// Triggers are coalesced: while one is pending further calls are no-ops.
    pub fn trigger(&self) {
        let _ = self.trigger.try_send(());
    }

    /// Stop the thread and wait for it.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(j) = self.join.take() {
            let _ = j.join();
        }
    }
}

impl ReorderRunner {
    /// Spawn the runner.
    ///
    /// Runs once on startup, then every `interval` and whenever triggered.
    /// Failures are logged and retried with bounded exponential backoff;
    /// they never propagate.
    pub fn spawn<X: ReorderExecutor>(&self, job: Arc<ReorderJob<X>>) -> std::io::Result<ReorderRunnerHandle> {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();
        let (trigger_tx, trigger_rx) = mpsc::sync_channel::<()>(1);

        let cfg = self.clone();
        let join = thread::Builder::new()
            .name("reorder-runner".to_string())
            .spawn(move || runner_loop(cfg, shutdown_rx, trigger_rx, job))?;

        Ok(ReorderRunnerHandle {
            shutdown: shutdown_tx,
            trigger: trigger_tx,
            join: Some(join),
        })
    }
}

fn runner_loop<X: ReorderExecutor>(
    cfg: ReorderRunner,
    shutdown_rx: mpsc::Receiver<()>,
    trigger_rx: mpsc::Receiver<()>,
    job: Arc<ReorderJob<X>>,
) {
    info!(interval_secs = cfg.interval.as_secs(), "reorder runner started");

    let mut next_tick = Instant::now() + cfg.interval;
    let mut pending = true;
    let mut failures: u32 = 0;
    let mut backoff_until: Option<Instant> = None;

    loop {
        // Shutdown has priority.
        if shutdown_rx.try_recv().is_ok() {
            break;
        }

        let now = Instant::now();
        if now >= next_tick {
            pending = true;
            while next_tick <= now {
                next_tick += cfg.interval;
            }
        }

        while trigger_rx.try_recv().is_ok() {
            pending = true;
        }

        if let Some(until) = backoff_until {
            if Instant::now() < until {
                thread::sleep(Duration::from_millis(50));
                continue;
            }
            backoff_until = None;
        }

        if !pending {
            let sleep_for = next_tick
                .saturating_duration_since(Instant::now())
                .min(Duration::from_millis(250));
            thread::sleep(sleep_for);
            continue;
        }

        pending = false;

        match job.run_once(Utc::now()) {
            Ok(outcome) => {
                failures = 0;
                debug!(orders = outcome.orders.len(), lines = outcome.lines, "reorder pass finished");
            }
            Err(e) => {
                warn!(error = %e, attempt = failures + 1, "reorder pass failed");
                failures += 1;
                if failures <= cfg.max_retries {
                    pending = true;
                    backoff_until = Some(Instant::now() + backoff(cfg.base_backoff, failures));
                } else {
                    failures = 0;
                }
            }
        }
    }

    info!("reorder runner stopped");
}

fn backoff(base: Duration, attempt: u32) -> Duration {
    // base * 2^(attempt-1), capped at 10s.
    let pow = 1u32 << attempt.saturating_sub(1).min(10);
    let ms = base.as_millis().saturating_mul(pow as u128);
    Duration::from_millis(ms.min(10_000) as u64)
}
