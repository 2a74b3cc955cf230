//! The run command: plan, write, audit, publish

use crate::cli::{GlobalArgs, OutputFormat, RunArgs};
use crate::commands::common;
use lea_core::{EnvTarget, IncrementalClause, LeaError, LeaResult, RunConfig, TableRef};
use lea_db::Warehouse;
use lea_runner::{
    build_plan, execute_plan, publish, JobResult, JobStatus, JsonSink, NodeAction, ProgressSink,
    RunPlan, TextSink,
};
use lea_sql::SqlDialect;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::watch;

/// Entry point for `lea run`. Returns the process exit code.
pub async fn execute(args: &RunArgs, global: &GlobalArgs) -> i32 {
    match run_pipeline(args, global).await {
        Ok(code) => code,
        Err(error) => {
            log::error!("{error}");
            error.exit_code()
        }
    }
}

/// Build the run configuration from CLI arguments.
fn run_config(args: &RunArgs, global: &GlobalArgs) -> LeaResult<RunConfig> {
    let env = EnvTarget::from_env(global.production)?;
    let dialect = SqlDialect::from_name(&global.dialect).map_err(|e| LeaError::Config {
        message: e.to_string(),
    })?;

    Ok(RunConfig {
        env,
        concurrency: args.concurrency.max(1),
        restart: args.restart,
        fail_fast: args.fail_fast,
        freeze_unselected: args.freeze_unselected,
        select: args.select.clone(),
        unselect: args.unselect.clone(),
        scripts_root: global.scripts.clone(),
        dialect,
        incremental: parse_incremental(&args.incremental)?,
        timeout: args.timeout_seconds.map(Duration::from_secs),
        dry_run: args.dry,
    })
}

/// `--incremental field value` pairs collapse into one clause; multiple
/// fields are not supported.
fn parse_incremental(pairs: &[String]) -> LeaResult<Option<IncrementalClause>> {
    let mut clause: Option<IncrementalClause> = None;
    for pair in pairs.chunks(2) {
        let [field, value] = pair else {
            return Err(LeaError::Config {
                message: "--incremental expects a field and a value".to_string(),
            });
        };
        match &mut clause {
            None => {
                clause = Some(IncrementalClause {
                    field: field.clone(),
                    values: [value.clone()].into_iter().collect(),
                });
            }
            Some(clause) if clause.field == *field => {
                clause.values.insert(value.clone());
            }
            Some(_) => {
                return Err(LeaError::Config {
                    message: "multiple incremental fields are not supported".to_string(),
                });
            }
        }
    }
    Ok(clause)
}

async fn run_pipeline(args: &RunArgs, global: &GlobalArgs) -> LeaResult<i32> {
    let started = Instant::now();
    let config = run_config(args, global)?;

    let (project, dag) = common::load_dag(global)?;
    let active = common::resolve_active(&project, &dag, &config.select, &config.unselect)?;
    if active.is_empty() {
        log::warn!("nothing selected");
        return Ok(0);
    }
    log::info!("{} out of {} scripts selected", active.len(), dag.len());

    let warehouse: Arc<dyn Warehouse> = Arc::new(common::open_warehouse(global)?);
    warehouse.prepare().await.map_err(db_config_error)?;

    if config.restart {
        for table_ref in &active {
            warehouse
                .drop_table(table_ref, true)
                .await
                .map_err(db_config_error)?;
        }
    }

    let existing = warehouse.list_tables().await.map_err(db_config_error)?;
    let plan = build_plan(&dag, &active, &config, &existing, warehouse.as_ref())?;

    if config.dry_run {
        print_plan(&plan);
        return Ok(0);
    }

    let sink: Arc<dyn ProgressSink> = match args.output {
        OutputFormat::Json => Arc::new(JsonSink),
        OutputFormat::Text => Arc::new(TextSink::new(plan.order.len(), args.quiet)),
    };

    // Ctrl-c flips the cancellation signal; in-flight nodes error out and
    // their audit tables remain as checkpoints.
    let (cancel_tx, cancel_rx) = watch::channel(false);
    let cancel_guard = tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            log::warn!("cancelling the run");
            let _ = cancel_tx.send(true);
        }
    });

    let results = execute_plan(
        &plan,
        Arc::clone(&warehouse),
        &config,
        Arc::clone(&sink),
        cancel_rx,
    )
    .await;
    cancel_guard.abort();

    let failures = results.values().filter(|r| r.is_failure()).count();
    let mut exit_code = if failures > 0 { 1 } else { 0 };

    if failures == 0 {
        if let Err(error) = publish(&plan, &config, warehouse.as_ref(), sink.as_ref()).await {
            log::error!("publish failed: {error}");
            exit_code = 1;
        }
    } else {
        log::warn!("{failures} nodes failed; audit tables are kept, nothing was promoted");
    }

    sink.finish();
    summarize(&results, started.elapsed());

    Ok(exit_code)
}

fn db_config_error(error: lea_db::DbError) -> LeaError {
    LeaError::Config {
        message: error.to_string(),
    }
}

fn print_plan(plan: &RunPlan) {
    for table_ref in &plan.order {
        let node = &plan.nodes[table_ref];
        let action = match &node.action {
            NodeAction::Materialize { incremental: true } => "materialize (incremental)",
            NodeAction::Materialize { incremental: false } => "materialize",
            NodeAction::Query => "test",
            NodeAction::Skip { checkpoint: true } => "skip (fresh audit checkpoint)",
            NodeAction::Skip { checkpoint: false } => "skip (already up to date)",
        };
        println!("{table_ref}: {action}");
    }
}

fn summarize(results: &HashMap<TableRef, JobResult>, elapsed: Duration) {
    let count = |status: JobStatus| results.values().filter(|r| r.status == status).count();
    log::info!(
        "finished in {:.1}s: {} done, {} skipped, {} errored, {} skipped due to errors",
        elapsed.as_secs_f64(),
        count(JobStatus::Done),
        count(JobStatus::Skipped),
        count(JobStatus::Errored),
        count(JobStatus::SkippedDueToError),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_incremental_collects_values() {
        let clause = parse_incremental(&[
            "account".to_string(),
            "alpha".to_string(),
            "account".to_string(),
            "beta".to_string(),
        ])
        .unwrap()
        .unwrap();
        assert_eq!(clause.field, "account");
        assert_eq!(clause.values.len(), 2);
    }

    #[test]
    fn test_parse_incremental_rejects_mixed_fields() {
        let err = parse_incremental(&[
            "account".to_string(),
            "alpha".to_string(),
            "region".to_string(),
            "eu".to_string(),
        ])
        .unwrap_err();
        assert!(matches!(err, LeaError::Config { .. }));
    }

    #[test]
    fn test_parse_incremental_empty_is_none() {
        assert!(parse_incremental(&[]).unwrap().is_none());
    }
}
