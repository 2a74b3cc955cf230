//! The test command: run only the test nodes
//!
//! Shorthand for a run selecting the `tests/` schema (which holds both
//! singular tests and synthesised assertion tests). Tests read audit
//! checkpoints when present and production tables otherwise; no tables are
//! written, so there is nothing to publish.

use crate::cli::{GlobalArgs, RunArgs, TestArgs};
use crate::commands::run;

/// Entry point for `lea test`. Returns the process exit code.
pub async fn execute(args: &TestArgs, global: &GlobalArgs) -> i32 {
    let mut select = vec!["tests/".to_string()];
    select.extend(args.select.clone());

    let run_args = RunArgs {
        select,
        unselect: Vec::new(),
        restart: false,
        fail_fast: args.fail_fast,
        freeze_unselected: false,
        concurrency: args.concurrency,
        incremental: Vec::new(),
        timeout_seconds: None,
        dry: false,
        output: args.output,
        quiet: args.quiet,
    };

    run::execute(&run_args, global).await
}
