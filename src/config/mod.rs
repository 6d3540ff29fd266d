//! Configuration for lazypar
//!
//! The schema lives here; `core` layers the embedded defaults, user and project
//! files, and `LAZYPAR_` environment variables on top of each other.

use crate::error::ConfigError;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

mod core;

/// Main configuration structure
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LazyparConfig {
    /// Worker pool configuration
    pub pool: PoolConfig,

    /// Progress display configuration
    pub progress: ProgressConfig,
}

/// How many workers to start and of which kind
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PoolConfig {
    /// Worker processes, "auto" for one per logical core
    pub cores: WorkerCount,

    /// Use threads instead of processes (`cores` is then ignored)
    pub use_threads: bool,

    /// Worker threads, only read when `use_threads` is set
    pub threads: usize,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            cores: WorkerCount::Auto,
            use_threads: false,
            threads: 1,
        }
    }
}

impl PoolConfig {
    pub fn processes(cores: WorkerCount) -> Self {
        Self {
            cores,
            ..Self::default()
        }
    }

    pub fn threads(threads: usize) -> Self {
        Self {
            use_threads: true,
            threads,
            ..Self::default()
        }
    }

    /// Resolve to a concrete pool, calling `detect_cores` only for `cores = "auto"`.
    ///
    /// With `use_threads` set, `threads` wins and `cores` is neither validated
    /// nor resolved.
    pub fn resolve<D>(&self, detect_cores: D) -> Result<ResolvedPool, ConfigError>
    where
        D: FnOnce() -> usize,
    {
        if self.use_threads {
            if self.threads == 0 {
                return Err(ConfigError::InvalidWorkerCount {
                    field: "threads",
                    value: self.threads.to_string(),
                });
            }
            return Ok(ResolvedPool {
                mode: PoolMode::Thread,
                workers: self.threads,
            });
        }

        let workers = match self.cores {
            WorkerCount::Auto => detect_cores().max(1),
            WorkerCount::Explicit(0) => {
                return Err(ConfigError::InvalidWorkerCount {
                    field: "cores",
                    value: "0".to_string(),
                });
            }
            WorkerCount::Explicit(n) => n,
        };

        Ok(ResolvedPool {
            mode: PoolMode::Process,
            workers,
        })
    }
}

/// A worker count that is either detected or given
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WorkerCount {
    #[default]
    Auto,
    Explicit(usize),
}

impl fmt::Display for WorkerCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WorkerCount::Auto => f.write_str("auto"),
            WorkerCount::Explicit(n) => write!(f, "{n}"),
        }
    }
}

impl FromStr for WorkerCount {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.eq_ignore_ascii_case("auto") {
            return Ok(WorkerCount::Auto);
        }
        s.parse::<usize>()
            .map(WorkerCount::Explicit)
            .map_err(|_| ConfigError::InvalidWorkerCount {
                field: "cores",
                value: s.to_string(),
            })
    }
}

impl Serialize for WorkerCount {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        match self {
            WorkerCount::Auto => serializer.serialize_str("auto"),
            WorkerCount::Explicit(n) => serializer.serialize_u64(*n as u64),
        }
    }
}

impl<'de> Deserialize<'de> for WorkerCount {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        #[derive(Deserialize)]
        #[serde(untagged)]
        enum Raw {
            Count(u64),
            Signed(i64),
            Name(String),
        }

        match Raw::deserialize(deserializer)? {
            Raw::Count(n) => Ok(WorkerCount::Explicit(n as usize)),
            Raw::Signed(n) => Err(serde::de::Error::custom(ConfigError::InvalidWorkerCount {
                field: "cores",
                value: n.to_string(),
            })),
            Raw::Name(name) => name.parse().map_err(serde::de::Error::custom),
        }
    }
}

/// Kind of worker a pool runs
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolMode {
    Process,
    Thread,
}

impl fmt::Display for PoolMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PoolMode::Process => f.write_str("process"),
            PoolMode::Thread => f.write_str("thread"),
        }
    }
}

/// Pool configuration after `auto` and precedence have been applied
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedPool {
    pub mode: PoolMode,
    pub workers: usize,
}

/// Progress display configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProgressConfig {
    /// How progress is drawn on verbose runs
    pub style: ProgressDisplay,

    /// Status line width; redraws pad to this many columns
    pub width: usize,
}

impl Default for ProgressConfig {
    fn default() -> Self {
        Self {
            style: ProgressDisplay::Line,
            width: crate::parallel::estimator::STATUS_LINE_WIDTH,
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum ProgressDisplay {
    /// Self-overwriting status line
    #[default]
    Line,
    /// indicatif progress bar
    Bar,
    /// No progress output
    None,
}

#[cfg(test)]
mod tests;
