//! Concurrent write-phase executor
//!
//! Runs the planned nodes in topological order under a semaphore bound.
//! Readiness is tracked with a remaining-parents counter per node; one
//! completion channel serialises every state transition, so the graph needs
//! no locks. Only warehouse calls block.

use crate::plan::{NodeAction, NodePlan, RunPlan};
use crate::progress::{Event, Phase, ProgressSink};
use lea_core::{RunConfig, TableRef};
use lea_db::Warehouse;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, watch, Semaphore};
use tokio::task::JoinSet;

/// Terminal state of one node.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    /// Materialised or queried successfully.
    Done,
    /// Nothing to do (fresh checkpoint or up-to-date production table).
    Skipped,
    /// Not run because an ancestor failed or the run stopped early.
    SkippedDueToError,
    /// The warehouse rejected the node, a test returned rows, the node
    /// timed out, or the run was cancelled.
    Errored,
}

/// Outcome of one node.
#[derive(Debug, Clone)]
pub struct JobResult {
    pub table_ref: TableRef,
    pub status: JobStatus,
    pub duration: Duration,
    pub n_rows: Option<u64>,
    pub error: Option<String>,
}

impl JobResult {
    fn terminal(table_ref: TableRef, status: JobStatus, error: Option<String>) -> Self {
        Self {
            table_ref,
            status,
            duration: Duration::ZERO,
            n_rows: None,
            error,
        }
    }

    /// Whether the node ended in a state that poisons its descendants and
    /// suppresses publishing.
    pub fn is_failure(&self) -> bool {
        matches!(self.status, JobStatus::Errored | JobStatus::SkippedDueToError)
    }
}

/// Execute the write and audit phases of the plan.
///
/// Returns a result per active node. Cancellation (`cancel` flipping to
/// true) stops scheduling; in-flight nodes transition to `Errored`.
pub async fn execute_plan(
    plan: &RunPlan,
    warehouse: Arc<dyn Warehouse>,
    config: &RunConfig,
    sink: Arc<dyn ProgressSink>,
    cancel: watch::Receiver<bool>,
) -> HashMap<TableRef, JobResult> {
    let mut remaining: HashMap<TableRef, usize> = HashMap::new();
    let mut dependents: HashMap<TableRef, Vec<TableRef>> = HashMap::new();
    for table_ref in &plan.order {
        let node = &plan.nodes[table_ref];
        remaining.insert(table_ref.clone(), node.active_parents.len());
        for parent in &node.active_parents {
            dependents
                .entry(parent.clone())
                .or_default()
                .push(table_ref.clone());
        }
    }

    let semaphore = Arc::new(Semaphore::new(config.concurrency.max(1)));
    let (tx, mut rx) = mpsc::unbounded_channel::<JobResult>();
    let mut tasks = JoinSet::new();

    let mut results: HashMap<TableRef, JobResult> = HashMap::new();
    let mut poisoned: HashSet<TableRef> = HashSet::new();
    let mut stopped = false;
    let mut pending = plan.order.len();
    let mut ready: Vec<TableRef> = plan
        .order
        .iter()
        .filter(|table_ref| remaining[*table_ref] == 0)
        .cloned()
        .collect();

    while pending > 0 {
        for table_ref in std::mem::take(&mut ready) {
            dispatch(
                &plan.nodes[&table_ref],
                &warehouse,
                config,
                &sink,
                &cancel,
                &semaphore,
                &tx,
                &mut tasks,
                &poisoned,
                stopped,
            );
        }

        let Some(result) = rx.recv().await else {
            break;
        };
        pending -= 1;

        if result.is_failure() {
            if config.fail_fast && !stopped {
                stopped = true;
                log::warn!("stopping the run: {} failed", result.table_ref);
            }
            for dependent in dependents.get(&result.table_ref).into_iter().flatten() {
                poisoned.insert(dependent.clone());
            }
        }

        for dependent in dependents.get(&result.table_ref).into_iter().flatten() {
            if let Some(count) = remaining.get_mut(dependent) {
                *count -= 1;
                if *count == 0 {
                    ready.push(dependent.clone());
                }
            }
        }

        results.insert(result.table_ref.clone(), result);
    }

    while tasks.join_next().await.is_some() {}

    results
}

/// Start one node: inline terminal states go straight to the channel,
/// runnable nodes get a task.
#[allow(clippy::too_many_arguments)]
fn dispatch(
    node: &NodePlan,
    warehouse: &Arc<dyn Warehouse>,
    config: &RunConfig,
    sink: &Arc<dyn ProgressSink>,
    cancel: &watch::Receiver<bool>,
    semaphore: &Arc<Semaphore>,
    tx: &mpsc::UnboundedSender<JobResult>,
    tasks: &mut JoinSet<()>,
    poisoned: &HashSet<TableRef>,
    stopped: bool,
) {
    let table_ref = node.table_ref.clone();

    if *cancel.borrow() {
        let _ = tx.send(JobResult::terminal(
            table_ref,
            JobStatus::SkippedDueToError,
            Some("run cancelled".to_string()),
        ));
        return;
    }
    if stopped {
        let _ = tx.send(JobResult::terminal(
            table_ref,
            JobStatus::SkippedDueToError,
            Some("run stopped early".to_string()),
        ));
        return;
    }
    if poisoned.contains(&table_ref) {
        sink.emit(Event::Started {
            table_ref: table_ref.clone(),
            phase: Phase::Write,
        });
        sink.emit(Event::Skipped {
            table_ref: table_ref.clone(),
            reason: "upstream failure",
        });
        let _ = tx.send(JobResult::terminal(
            table_ref,
            JobStatus::SkippedDueToError,
            Some("upstream failure".to_string()),
        ));
        return;
    }
    if let NodeAction::Skip { checkpoint } = node.action {
        let reason = if checkpoint {
            "fresh audit checkpoint"
        } else {
            "already up to date"
        };
        sink.emit(Event::Started {
            table_ref: table_ref.clone(),
            phase: Phase::Write,
        });
        sink.emit(Event::Skipped {
            table_ref: table_ref.clone(),
            reason,
        });
        let _ = tx.send(JobResult::terminal(table_ref, JobStatus::Skipped, None));
        return;
    }

    let node = node.clone();
    let warehouse = Arc::clone(warehouse);
    let sink = Arc::clone(sink);
    let semaphore = Arc::clone(semaphore);
    let tx = tx.clone();
    let mut cancel = cancel.clone();
    let timeout = config.timeout;

    tasks.spawn(async move {
        // A closed semaphore means the run is over; report cancellation.
        let Ok(_permit) = semaphore.acquire().await else {
            let _ = tx.send(JobResult::terminal(
                node.table_ref,
                JobStatus::Errored,
                Some("cancelled".to_string()),
            ));
            return;
        };

        if *cancel.borrow() {
            let _ = tx.send(JobResult::terminal(
                node.table_ref,
                JobStatus::Errored,
                Some("cancelled".to_string()),
            ));
            return;
        }

        sink.emit(Event::Started {
            table_ref: node.table_ref.clone(),
            phase: Phase::Write,
        });
        let started = Instant::now();

        let outcome = tokio::select! {
            outcome = run_node(&node, warehouse.as_ref(), timeout) => outcome,
            _ = wait_cancelled(&mut cancel) => Err("cancelled".to_string()),
        };
        let duration = started.elapsed();

        let result = match outcome {
            Ok(n_rows) => {
                sink.emit(Event::Done {
                    table_ref: node.table_ref.clone(),
                    phase: Phase::Write,
                    duration,
                    n_rows,
                });
                JobResult {
                    table_ref: node.table_ref,
                    status: JobStatus::Done,
                    duration,
                    n_rows,
                    error: None,
                }
            }
            Err(error) => {
                sink.emit(Event::Errored {
                    table_ref: node.table_ref.clone(),
                    phase: Phase::Write,
                    duration,
                    error: error.clone(),
                });
                JobResult {
                    table_ref: node.table_ref,
                    status: JobStatus::Errored,
                    duration,
                    n_rows: None,
                    error: Some(error),
                }
            }
        };
        let _ = tx.send(result);
    });
}

/// Resolves only on a real cancellation signal. A dropped sender means the
/// caller finished without cancelling; pend forever in that case.
async fn wait_cancelled(cancel: &mut watch::Receiver<bool>) {
    while cancel.changed().await.is_ok() {
        if *cancel.borrow() {
            return;
        }
    }
    std::future::pending::<()>().await
}

/// Materialise or query one node, with the optional per-node timeout.
async fn run_node(
    node: &NodePlan,
    warehouse: &dyn Warehouse,
    timeout: Option<Duration>,
) -> Result<Option<u64>, String> {
    let work = async {
        match &node.action {
            NodeAction::Materialize { .. } => warehouse
                .materialize(&node.table_ref, &node.sql, true)
                .await
                .map(Some)
                .map_err(|e| e.to_string()),
            NodeAction::Query => {
                let violations = warehouse
                    .query_count(&node.sql)
                    .await
                    .map_err(|e| e.to_string())?;
                if violations == 0 {
                    Ok(None)
                } else {
                    let sample = warehouse
                        .query_rows(&node.sql, 5)
                        .await
                        .unwrap_or_default()
                        .join("; ");
                    Err(format!("assertion failed, {violations} rows, e.g. {sample}"))
                }
            }
            NodeAction::Skip { .. } => Ok(None),
        }
    };

    match timeout {
        Some(limit) => tokio::time::timeout(limit, work)
            .await
            .unwrap_or_else(|_| Err(format!("timeout after {}s", limit.as_secs()))),
        None => work.await,
    }
}

#[cfg(test)]
#[path = "execute_test.rs"]
mod tests;
