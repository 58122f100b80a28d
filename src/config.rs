//! Configuration for turnstile
//!
//! CLI arguments and environment variable handling using clap.

use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Turnstile - bearer-token gated account and file service
#[derive(Parser, Debug, Clone)]
#[command(name = "turnstile")]
#[command(about = "HTTP service for user accounts and file blobs behind bearer-token auth")]
pub struct Args {
    /// Address to listen on
    #[arg(long, env = "LISTEN", default_value = "0.0.0.0:8080")]
    pub listen: SocketAddr,

    /// SQLite database file (":memory:" for an in-memory database)
    #[arg(long, env = "DATABASE_PATH", default_value = "turnstile.db")]
    pub database_path: PathBuf,

    /// Shared secret used to sign and verify access tokens
    #[arg(long, env = "TOKEN_SECRET", hide_env_values = true)]
    pub token_secret: Option<String>,

    /// Access token lifetime in seconds
    #[arg(long, env = "TOKEN_TTL_SECONDS", default_value = "3600")]
    pub token_ttl_seconds: u64,

    /// Argon2 memory cost in KiB
    #[arg(long, env = "HASH_MEMORY_KIB", default_value_t = argon2::Params::DEFAULT_M_COST)]
    pub hash_memory_kib: u32,

    /// Argon2 iteration count
    #[arg(long, env = "HASH_ITERATIONS", default_value_t = argon2::Params::DEFAULT_T_COST)]
    pub hash_iterations: u32,

    /// Argon2 degree of parallelism
    #[arg(long, env = "HASH_PARALLELISM", default_value_t = argon2::Params::DEFAULT_P_COST)]
    pub hash_parallelism: u32,

    /// Largest accepted request body (file uploads included)
    #[arg(long, env = "MAX_UPLOAD_BYTES", default_value = "33554432")]
    pub max_upload_bytes: usize,

    /// Request timeout in milliseconds
    #[arg(long, env = "REQUEST_TIMEOUT_MS", default_value = "30000")]
    pub request_timeout_ms: u64,

    /// How long to wait for in-flight connections on shutdown
    #[arg(long, env = "SHUTDOWN_TIMEOUT_SECONDS", default_value = "5")]
    pub shutdown_timeout_seconds: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Emit logs as JSON lines
    #[arg(long, env = "LOG_JSON", default_value = "false")]
    pub log_json: bool,
}

impl Args {
    /// Signing secret, or a configuration error when unset or blank
    pub fn token_secret(&self) -> Result<&str, String> {
        match self.token_secret.as_deref() {
            Some(secret) if !secret.trim().is_empty() => Ok(secret),
            _ => Err("TOKEN_SECRET is required and must not be empty".to_string()),
        }
    }

    pub fn token_ttl(&self) -> Duration {
        Duration::from_secs(self.token_ttl_seconds)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }

    pub fn shutdown_timeout(&self) -> Duration {
        Duration::from_secs(self.shutdown_timeout_seconds)
    }

    /// Argon2 parameters built from the hash cost settings
    pub fn hash_params(&self) -> Result<argon2::Params, String> {
        argon2::Params::new(
            self.hash_memory_kib,
            self.hash_iterations,
            self.hash_parallelism,
            None,
        )
        .map_err(|e| format!("Invalid hash parameters: {}", e))
    }

    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        self.token_secret()?;

        if self.token_ttl_seconds == 0 {
            return Err("TOKEN_TTL_SECONDS must be greater than zero".to_string());
        }

        self.hash_params()?;

        if self.max_upload_bytes == 0 {
            return Err("MAX_UPLOAD_BYTES must be greater than zero".to_string());
        }

        if self.request_timeout_ms == 0 {
            return Err("REQUEST_TIMEOUT_MS must be greater than zero".to_string());
        }

        Ok(())
    }
}

/// Test configuration with every env-backed setting given as a flag
///
/// Flags always win over the environment, so variables such as
/// `TOKEN_SECRET` set in the test process cannot leak in. `overrides`
/// replaces the matching base flag.
#[cfg(test)]
pub(crate) fn test_args(overrides: &[(&str, &str)]) -> Args {
    let mut flags = vec![
        ("--listen", "127.0.0.1:0"),
        ("--database-path", ":memory:"),
        ("--token-secret", "test-secret"),
        ("--token-ttl-seconds", "600"),
        ("--hash-memory-kib", "1024"),
        ("--hash-iterations", "1"),
        ("--hash-parallelism", "1"),
        ("--max-upload-bytes", "33554432"),
        ("--request-timeout-ms", "30000"),
        ("--shutdown-timeout-seconds", "5"),
        ("--log-level", "info"),
    ];
    for (flag, value) in overrides {
        match flags.iter_mut().find(|(f, _)| *f == *flag) {
            Some(entry) => entry.1 = *value,
            None => flags.push((*flag, *value)),
        }
    }

    let mut argv = vec!["turnstile"];
    for (flag, value) in flags {
        argv.push(flag);
        argv.push(value);
    }
    Args::try_parse_from(argv).unwrap()
}
