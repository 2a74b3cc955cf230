//! The teardown command: drop the development namespace

use crate::cli::{GlobalArgs, TeardownArgs};
use crate::commands::common;
use lea_core::LeaError;
use lea_db::Warehouse;

/// Entry point for `lea teardown`. Returns the process exit code.
pub async fn execute(args: &TeardownArgs, global: &GlobalArgs) -> i32 {
    if global.production {
        let error = LeaError::Config {
            message: "refusing to tear down the production namespace".to_string(),
        };
        log::error!("{error}");
        return error.exit_code();
    }
    if !args.yes {
        let error = LeaError::Config {
            message: "pass --yes to confirm dropping the dev namespace".to_string(),
        };
        log::error!("{error}");
        return error.exit_code();
    }

    let warehouse = match common::open_warehouse(global) {
        Ok(warehouse) => warehouse,
        Err(error) => {
            log::error!("{error}");
            return error.exit_code();
        }
    };

    match warehouse.teardown().await {
        Ok(()) => {
            log::info!("dropped namespace {}", warehouse.path());
            0
        }
        Err(error) => {
            log::error!("{error}");
            1
        }
    }
}
