//! Environment-sourced configuration for the external runner
//!
//! Pure data plus a loader, with no dependency on the store or registry:
//! connection details, the initial-admin seed, and the two engine-facing
//! tunables (event queue capacity, default operation deadline) that the
//! external runner needs to construct an engine instance. Every field is
//! read from an environment variable under the `BRANCHGRAPH_` prefix and
//! fails fast — a missing required variable is a `Validation` error, not a
//! silently-applied default.

use crate::error::{ConstraintReason, ErrorDetails, GraphError, GraphResult};
use serde::{Deserialize, Serialize};
use std::env;
use std::str::FromStr;

const PREFIX: &str = "BRANCHGRAPH_";

/// Runtime configuration loaded from the process environment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    /// Graph store connection URL.
    pub connection_url: String,
    /// Graph store credentials (a connection string secret, a token, ...).
    pub credentials: String,
    /// Logical database/namespace name.
    pub database_name: String,
    /// Seed used to derive the initial admin account's password on first boot.
    pub admin_password_seed: String,
    /// Capacity of the event emitter's write-behind queue.
    pub event_queue_capacity: usize,
    /// Default deadline, in milliseconds, applied to operations that don't
    /// supply their own.
    pub default_deadline_ms: u64,
}

impl Config {
    /// Load configuration from `BRANCHGRAPH_*` environment variables.
    ///
    /// `connection_url`, `credentials`, `database_name`, and
    /// `admin_password_seed` are required; `event_queue_capacity` and
    /// `default_deadline_ms` fall back to sensible defaults if unset.
    pub fn from_env() -> GraphResult<Self> {
        Ok(Config {
            connection_url: required("CONNECTION_URL")?,
            credentials: required("CREDENTIALS")?,
            database_name: required("DATABASE_NAME")?,
            admin_password_seed: required("ADMIN_PASSWORD_SEED")?,
            event_queue_capacity: optional("EVENT_QUEUE_CAPACITY", 4_096)?,
            default_deadline_ms: optional("DEFAULT_DEADLINE_MS", 30_000)?,
        })
    }
}

fn required(suffix: &str) -> GraphResult<String> {
    let key = format!("{PREFIX}{suffix}");
    env::var(&key).map_err(|_| {
        GraphError::Validation(ErrorDetails::new(
            key.to_lowercase(),
            ConstraintReason::Required,
        ))
    })
}

fn optional<T: FromStr>(suffix: &str, default: T) -> GraphResult<T> {
    let key = format!("{PREFIX}{suffix}");
    match env::var(&key) {
        Ok(raw) => raw.parse().map_err(|_| {
            GraphError::Validation(ErrorDetails::new(
                key.to_lowercase(),
                ConstraintReason::Other(format!("'{raw}' is not a valid value")),
            ))
        }),
        Err(_) => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    // Environment variables are process-global; serialize the tests that
    // touch them so they don't race each other's `set_var`/`remove_var`.
    static ENV_LOCK: Mutex<()> = Mutex::new(());

    fn clear_all() {
        for suffix in [
            "CONNECTION_URL",
            "CREDENTIALS",
            "DATABASE_NAME",
            "ADMIN_PASSWORD_SEED",
            "EVENT_QUEUE_CAPACITY",
            "DEFAULT_DEADLINE_MS",
        ] {
            env::remove_var(format!("{PREFIX}{suffix}"));
        }
    }

    #[test]
    fn missing_required_var_fails_validation() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        let err = Config::from_env().unwrap_err();
        assert!(matches!(err, GraphError::Validation(_)));
    }

    #[test]
    fn loads_required_and_defaults_optional() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var(format!("{PREFIX}CONNECTION_URL"), "graph://localhost:9000");
        env::set_var(format!("{PREFIX}CREDENTIALS"), "token");
        env::set_var(format!("{PREFIX}DATABASE_NAME"), "branchgraph");
        env::set_var(format!("{PREFIX}ADMIN_PASSWORD_SEED"), "seed");

        let config = Config::from_env().unwrap();
        assert_eq!(config.connection_url, "graph://localhost:9000");
        assert_eq!(config.event_queue_capacity, 4_096);
        assert_eq!(config.default_deadline_ms, 30_000);
        clear_all();
    }

    #[test]
    fn optional_var_overrides_default() {
        let _guard = ENV_LOCK.lock().unwrap();
        clear_all();
        env::set_var(format!("{PREFIX}CONNECTION_URL"), "graph://localhost:9000");
        env::set_var(format!("{PREFIX}CREDENTIALS"), "token");
        env::set_var(format!("{PREFIX}DATABASE_NAME"), "branchgraph");
        env::set_var(format!("{PREFIX}ADMIN_PASSWORD_SEED"), "seed");
        env::set_var(format!("{PREFIX}EVENT_QUEUE_CAPACITY"), "256");

        let config = Config::from_env().unwrap();
        assert_eq!(config.event_queue_capacity, 256);
        clear_all();
    }
}
