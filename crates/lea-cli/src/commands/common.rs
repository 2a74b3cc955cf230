//! Shared command plumbing: project loading, selection, warehouse setup

use crate::cli::GlobalArgs;
use crate::commands::git;
use lea_core::{selector, EnvTarget, LeaError, LeaResult, Project, ScriptDag, TableRef};
use lea_db::DuckDbWarehouse;
use lea_sql::SqlDialect;
use std::collections::BTreeSet;

/// Load the project and build the DAG, assertion tests included.
pub fn load_dag(global: &GlobalArgs) -> LeaResult<(Project, ScriptDag)> {
    let dialect = SqlDialect::from_name(&global.dialect).map_err(|e| LeaError::Config {
        message: e.to_string(),
    })?;
    let project = Project::load(&global.scripts, dialect)?;

    let mut scripts = project.scripts.clone();
    for script in &project.scripts {
        scripts.extend(lea_test::assertion_scripts(script));
    }

    let dag = ScriptDag::build(scripts)?;
    Ok((project, dag))
}

/// Resolve select/unselect expressions into the active set.
pub fn resolve_active(
    project: &Project,
    dag: &ScriptDag,
    select: &[String],
    unselect: &[String],
) -> LeaResult<BTreeSet<TableRef>> {
    let select_atoms = selector::parse_atoms(select)?;
    let unselect_atoms = selector::parse_atoms(unselect)?;

    let needs_git = select_atoms
        .iter()
        .chain(unselect_atoms.iter())
        .any(|atom| atom.is_git());
    let git_modified = if needs_git {
        git::modified_table_refs(project)?
    } else {
        BTreeSet::new()
    };

    selector::select(dag, &select_atoms, &unselect_atoms, &git_modified)
}

/// Open the warehouse bound to the requested environment.
pub fn open_warehouse(global: &GlobalArgs) -> LeaResult<DuckDbWarehouse> {
    let env = EnvTarget::from_env(global.production)?;
    DuckDbWarehouse::open(&global.database, env.username()).map_err(|e| LeaError::Config {
        message: e.to_string(),
    })
}
