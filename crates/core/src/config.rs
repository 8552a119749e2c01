use std::env;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Load .env file (silently ignores if missing).
pub fn load_dotenv() {
    dotenvy::dotenv().ok();
}

fn env_opt(key: &str) -> Option<String> {
    env::var(key).ok().filter(|s| !s.is_empty())
}

// ── Top-level config ──────────────────────────────────────────

/// Runtime sizing for executors, delaying channels and worker pools.
///
/// Every field has a default, so an empty TOML document is a valid config.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StintConfig {
    #[serde(default)]
    pub executor: ExecutorConfig,
    #[serde(default)]
    pub channel: ChannelConfig,
    #[serde(default)]
    pub pool: PoolConfig,
}

impl StintConfig {
    /// Parse config from a TOML string, then apply `STINT_*` overrides.
    pub fn from_toml(toml_str: &str) -> Result<Self, ConfigError> {
        let mut config: Self = toml::from_str(toml_str)?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Load config from a file path.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path.as_ref())?;
        Self::from_toml(&content)
    }

    /// Build config from defaults and environment variables (loads `.env` first).
    pub fn from_env() -> Result<Self, ConfigError> {
        load_dotenv();
        let mut config = Self::default();
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// Apply environment variable overrides.
    ///
    /// Convention: `STINT_SECTION_KEY` overrides `section.key`.
    /// - `STINT_EXECUTOR_INGEST_CAPACITY` -> `executor.ingest_capacity`
    /// - `STINT_EXECUTOR_THREAD_NAME` -> `executor.thread_name`
    /// - `STINT_CHANNEL_CAPACITY` -> `channel.capacity`
    /// - `STINT_POOL_WORKERS` -> `pool.workers`
    /// - `STINT_POOL_THREAD_NAME` -> `pool.thread_name`
    pub fn apply_env_overrides(&mut self) {
        self.apply_overrides(env_opt);
    }

    /// Apply overrides from an arbitrary key lookup. Unparseable numbers are ignored.
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(v) = lookup("STINT_EXECUTOR_INGEST_CAPACITY").and_then(|v| v.parse().ok()) {
            self.executor.ingest_capacity = v;
        }
        if let Some(v) = lookup("STINT_EXECUTOR_THREAD_NAME") {
            self.executor.thread_name = v;
        }
        if let Some(v) = lookup("STINT_CHANNEL_CAPACITY").and_then(|v| v.parse().ok()) {
            self.channel.capacity = v;
        }
        if let Some(v) = lookup("STINT_POOL_WORKERS").and_then(|v| v.parse().ok()) {
            self.pool.workers = v;
        }
        if let Some(v) = lookup("STINT_POOL_THREAD_NAME") {
            self.pool.thread_name = v;
        }
    }

    /// Reject configs that would produce unusable runtimes.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.executor.validate()?;
        self.channel.validate()?;
        self.pool.validate()
    }

    /// Log the effective sizing at startup.
    pub fn log_summary(&self) {
        tracing::info!(
            ingest_capacity = self.executor.ingest_capacity,
            channel_capacity = self.channel.capacity,
            pool_workers = self.pool.resolved_workers(),
            "stint config loaded"
        );
    }
}

// ── Executor ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExecutorConfig {
    /// Capacity of the ingestion channel feeding the executor loop.
    #[serde(default = "default_capacity")]
    pub ingest_capacity: usize,
    /// Prefix of the executor name. Each executor appends its instance
    /// number, and fired tasks run on `{name}-task` threads.
    #[serde(default = "default_executor_thread")]
    pub thread_name: String,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            ingest_capacity: default_capacity(),
            thread_name: default_executor_thread(),
        }
    }
}

impl ExecutorConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.ingest_capacity == 0 {
            return Err(ConfigError::Invalid(
                "executor.ingest_capacity must be positive".into(),
            ));
        }
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid("executor.thread_name is empty".into()));
        }
        Ok(())
    }
}

// ── Delaying channel ──────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChannelConfig {
    /// Capacity of both the output buffer and the underlying executor's ingestion channel.
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

impl Default for ChannelConfig {
    fn default() -> Self {
        Self {
            capacity: default_capacity(),
        }
    }
}

impl ChannelConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.capacity == 0 {
            return Err(ConfigError::Invalid("channel.capacity must be positive".into()));
        }
        Ok(())
    }
}

// ── Worker pool ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PoolConfig {
    /// Number of worker threads. 0 = available parallelism.
    #[serde(default)]
    pub workers: usize,
    #[serde(default = "default_pool_thread")]
    pub thread_name: String,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            workers: 0,
            thread_name: default_pool_thread(),
        }
    }
}

impl PoolConfig {
    /// Resolve worker thread count (0 means use available parallelism).
    pub fn resolved_workers(&self) -> usize {
        if self.workers == 0 {
            std::thread::available_parallelism()
                .map(|n| n.get())
                .unwrap_or(4)
        } else {
            self.workers
        }
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.thread_name.trim().is_empty() {
            return Err(ConfigError::Invalid("pool.thread_name is empty".into()));
        }
        Ok(())
    }
}

fn default_capacity() -> usize { 64 }
fn default_executor_thread() -> String { "stint-delaying".into() }
fn default_pool_thread() -> String { "stint-worker".into() }
