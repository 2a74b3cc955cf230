//! Git-based selection
//!
//! The `git` selector atom resolves to the scripts whose files have been
//! added or modified in the working tree relative to the base branch:
//! committed changes against `main`, plus anything uncommitted.

use lea_core::{LeaError, LeaResult, Project, TableRef};
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Table references of the scripts changed in the working tree.
pub fn modified_table_refs(project: &Project) -> LeaResult<BTreeSet<TableRef>> {
    // Git reports paths relative to the repository toplevel, not the cwd.
    let toplevel = git_output(&["rev-parse", "--show-toplevel"])?;
    let toplevel = PathBuf::from(toplevel.trim());

    let mut changed_paths: BTreeSet<PathBuf> = BTreeSet::new();
    for args in [
        // Committed relative to the base branch.
        vec!["diff", "--name-only", "main"],
        // Uncommitted.
        vec!["diff", "--name-only"],
        // Untracked new scripts.
        vec!["ls-files", "--others", "--exclude-standard"],
    ] {
        changed_paths.extend(git_paths(&toplevel, &args)?);
    }

    let mut modified = BTreeSet::new();
    for script in &project.scripts {
        let canonical = script
            .path
            .canonicalize()
            .unwrap_or_else(|_| script.path.clone());
        if changed_paths.contains(&canonical) || changed_paths.contains(&script.path) {
            modified.insert(script.table_ref.clone());
        }
    }
    Ok(modified)
}

fn git_output(args: &[&str]) -> LeaResult<String> {
    let output = Command::new("git")
        .args(args)
        .output()
        .map_err(|e| git_error(format!("failed to invoke git: {e}")))?;
    if !output.status.success() {
        return Err(git_error(format!(
            "git {} failed: {}",
            args.join(" "),
            String::from_utf8_lossy(&output.stderr).trim()
        )));
    }
    Ok(String::from_utf8_lossy(&output.stdout).into_owned())
}

fn git_paths(toplevel: &Path, args: &[&str]) -> LeaResult<BTreeSet<PathBuf>> {
    Ok(git_output(args)?
        .lines()
        .filter(|line| !line.is_empty())
        .map(|line| {
            let path = toplevel.join(line);
            path.canonicalize().unwrap_or(path)
        })
        .collect())
}

fn git_error(reason: String) -> LeaError {
    LeaError::Selector {
        selector: "git".to_string(),
        reason,
    }
}
