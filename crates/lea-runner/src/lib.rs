//! lea-runner - the write-audit-publish execution engine
//!
//! Takes a planned active set through the four phases:
//!
//! 1. **Plan** — decide per node whether to materialise, query, or skip,
//!    and rewrite dependency references (audit / plain / frozen).
//! 2. **Write** — run ready nodes concurrently under a semaphore bound,
//!    each into its `___audit` side-table.
//! 3. **Audit** — test nodes are ordinary nodes; a failing test errors and
//!    poisons its descendants like any other failure.
//! 4. **Publish** — only when nothing failed, promote every audit table to
//!    its production name and drop the audit form.

pub mod execute;
pub mod plan;
pub mod progress;
#[cfg(test)]
pub mod test_utils;

pub use execute::{execute_plan, JobResult, JobStatus};
pub use plan::{build_plan, NodeAction, NodePlan, RunPlan};
pub use progress::{Event, JsonSink, NullSink, Phase, ProgressSink, TextSink};

use lea_core::RunConfig;
use lea_db::Warehouse;
use std::time::Instant;

/// Promote every audit table of the plan, then drop the audit forms.
///
/// Per-table atomic, best-effort as a group: a mid-publish warehouse
/// failure leaves the remaining audit tables in place for the next run.
pub async fn publish(
    plan: &RunPlan,
    config: &RunConfig,
    warehouse: &dyn Warehouse,
    sink: &dyn ProgressSink,
) -> Result<(), lea_db::DbError> {
    for (table_ref, incremental_key) in plan.promotable(config) {
        let audit_ref = table_ref.audit();
        sink.emit(Event::Started {
            table_ref: table_ref.clone(),
            phase: Phase::Publish,
        });
        let started = Instant::now();
        let promoted = match &incremental_key {
            Some(key) => warehouse.promote_incremental(&audit_ref, key).await,
            None => warehouse.promote(&audit_ref).await,
        };
        match promoted {
            Ok(()) => {
                warehouse.drop_table(&table_ref, true).await?;
                sink.emit(Event::Done {
                    table_ref,
                    phase: Phase::Publish,
                    duration: started.elapsed(),
                    n_rows: None,
                });
            }
            Err(error) => {
                sink.emit(Event::Errored {
                    table_ref,
                    phase: Phase::Publish,
                    duration: started.elapsed(),
                    error: error.to_string(),
                });
                return Err(error);
            }
        }
    }
    Ok(())
}
