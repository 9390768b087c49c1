//! Command-line entry point for the action core.
//!
//! # Usage
//! - `lifeops <domain> <action> [parameters-json]`
//! - `lifeops` with a full request object on stdin:
//!   `{"domain": "tasks", "action": "create", "parameters": {...}}`
//!
//! The result envelope is printed as JSON on stdout. Exit status is 0 when
//! the action succeeded and 1 otherwise.

use lifeops_core::{
    default_log_level, init_stderr_logging, open_db, ActionConfig, ActionContext, ActionRequest,
    ActionResult, Coordinator, SqliteStore,
};
use log::warn;
use serde_json::Value;
use std::io::Read;
use std::path::PathBuf;
use std::process::ExitCode;

const ENV_DB_PATH: &str = "LIFEOPS_DB_PATH";
const ENV_LOG_LEVEL: &str = "LIFEOPS_LOG_LEVEL";
const DEFAULT_DB_FILE: &str = "lifeops.sqlite3";

fn main() -> ExitCode {
    let level = std::env::var(ENV_LOG_LEVEL).unwrap_or_else(|_| default_log_level().to_string());
    if let Err(err) = init_stderr_logging(&level) {
        eprintln!("logging disabled: {err}");
    }

    match run() {
        Ok(result) => {
            let status = if result.success {
                ExitCode::SUCCESS
            } else {
                ExitCode::FAILURE
            };
            match serde_json::to_string_pretty(&result) {
                Ok(json) => println!("{json}"),
                Err(err) => {
                    eprintln!("failed to encode result: {err}");
                    return ExitCode::FAILURE;
                }
            }
            status
        }
        Err(message) => {
            eprintln!("lifeops: {message}");
            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<ActionResult, String> {
    let request = read_request(std::env::args().skip(1).collect())?;

    let db_path = db_path();
    let conn = open_db(&db_path)
        .map_err(|err| format!("failed to open database `{}`: {err}", db_path.display()))?;
    let store = SqliteStore::try_new(&conn).map_err(|err| err.to_string())?;
    let ctx = ActionContext::new(store).with_config(ActionConfig::from_env());

    Ok(Coordinator::new(ctx).handle(request))
}

fn read_request(args: Vec<String>) -> Result<ActionRequest, String> {
    match args.as_slice() {
        [] => {
            let mut input = String::new();
            std::io::stdin()
                .read_to_string(&mut input)
                .map_err(|err| format!("failed to read stdin: {err}"))?;
            serde_json::from_str(&input).map_err(|err| format!("invalid request JSON: {err}"))
        }
        [domain, action] => Ok(request(domain, action, Value::Null)),
        [domain, action, parameters] => {
            let parameters = serde_json::from_str(parameters)
                .map_err(|err| format!("invalid parameters JSON: {err}"))?;
            Ok(request(domain, action, parameters))
        }
        _ => Err("usage: lifeops <domain> <action> [parameters-json]".to_string()),
    }
}

fn request(domain: &str, action: &str, parameters: Value) -> ActionRequest {
    ActionRequest {
        domain: domain.to_string(),
        action: action.to_string(),
        parameters,
    }
}

fn db_path() -> PathBuf {
    match std::env::var(ENV_DB_PATH) {
        Ok(path) if !path.trim().is_empty() => PathBuf::from(path.trim()),
        _ => {
            let fallback = std::env::temp_dir().join(DEFAULT_DB_FILE);
            warn!(
                "event=cli_db_path module=cli status=fallback path={}",
                fallback.display()
            );
            fallback
        }
    }
}
