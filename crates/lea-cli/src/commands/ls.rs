//! The ls command: list scripts and their dependencies

use crate::cli::{GlobalArgs, LsArgs, OutputFormat};
use crate::commands::common;
use lea_core::LeaResult;

/// Entry point for `lea ls`. Returns the process exit code.
pub async fn execute(args: &LsArgs, global: &GlobalArgs) -> i32 {
    match list(args, global) {
        Ok(()) => 0,
        Err(error) => {
            log::error!("{error}");
            error.exit_code()
        }
    }
}

fn list(args: &LsArgs, global: &GlobalArgs) -> LeaResult<()> {
    let (project, dag) = common::load_dag(global)?;
    let selected = common::resolve_active(&project, &dag, &args.select, &[])?;

    for table_ref in dag.topological_order()? {
        if !selected.contains(&table_ref) {
            continue;
        }
        let script = dag
            .script(&table_ref)
            .expect("listed nodes come from the graph");
        match args.output {
            OutputFormat::Text => {
                let deps: Vec<String> = script
                    .dependencies
                    .iter()
                    .map(|dep| dep.to_string())
                    .collect();
                if deps.is_empty() {
                    println!("{table_ref}");
                } else {
                    println!("{table_ref} <- {}", deps.join(", "));
                }
            }
            OutputFormat::Json => {
                let value = serde_json::json!({
                    "node": table_ref.to_string(),
                    "kind": script.kind,
                    "dependencies": script
                        .dependencies
                        .iter()
                        .map(|dep| dep.to_string())
                        .collect::<Vec<_>>(),
                    "external_dependencies": &script.external_dependencies,
                    "incremental": script.is_incremental,
                });
                println!("{value}");
            }
        }
    }
    Ok(())
}
