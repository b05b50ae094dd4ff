use std::path::PathBuf;

pub const DEFAULT_DUMP_TOOL: &str = "/code/quickstart.sh";
pub const DEFAULT_STORAGE_CLI: &str = "/code/ossutil64";
pub const DEFAULT_STAGED_STORAGE_CLI: &str = "/tmp/ossutil64";
pub const DEFAULT_WORK_DIR: &str = "/tmp/";
pub const DEFAULT_BOOTSTRAP_SCRIPT: &str = "/var/fc/runtime/java11/bootstrap.sh";

pub const ENV_DUMP_TOOL: &str = "ACCEL_DUMP_TOOL";
pub const ENV_STORAGE_CLI: &str = "ACCEL_STORAGE_CLI";
pub const ENV_STAGED_STORAGE_CLI: &str = "ACCEL_STORAGE_CLI_STAGED";
pub const ENV_WORK_DIR: &str = "ACCEL_WORK_DIR";
pub const ENV_BOOTSTRAP_SCRIPT: &str = "ACCEL_BOOTSTRAP_SCRIPT";

/// Filesystem layout of the deployed function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HelperConfig {
    /// Dump/archive tool invoked with `dump` and `save`.
    pub dump_tool: PathBuf,
    /// Storage CLI as shipped in the code package (read-only).
    pub storage_cli: PathBuf,
    /// Writable copy of the storage CLI that is actually executed.
    pub staged_storage_cli: PathBuf,
    /// Working directory of every subprocess.
    pub work_dir: PathBuf,
    pub bootstrap_script: PathBuf,
}

impl Default for HelperConfig {
    fn default() -> Self {
        Self {
            dump_tool: PathBuf::from(DEFAULT_DUMP_TOOL),
            storage_cli: PathBuf::from(DEFAULT_STORAGE_CLI),
            staged_storage_cli: PathBuf::from(DEFAULT_STAGED_STORAGE_CLI),
            work_dir: PathBuf::from(DEFAULT_WORK_DIR),
            bootstrap_script: PathBuf::from(DEFAULT_BOOTSTRAP_SCRIPT),
        }
    }
}

impl HelperConfig {
    /// Defaults overridden by any non-blank variable `lookup` returns.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let resolve = |key: &str, default: &str| {
            lookup(key)
                .map(|value| value.trim().to_string())
                .filter(|value| !value.is_empty())
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from(default))
        };

        Self {
            dump_tool: resolve(ENV_DUMP_TOOL, DEFAULT_DUMP_TOOL),
            storage_cli: resolve(ENV_STORAGE_CLI, DEFAULT_STORAGE_CLI),
            staged_storage_cli: resolve(ENV_STAGED_STORAGE_CLI, DEFAULT_STAGED_STORAGE_CLI),
            work_dir: resolve(ENV_WORK_DIR, DEFAULT_WORK_DIR),
            bootstrap_script: resolve(ENV_BOOTSTRAP_SCRIPT, DEFAULT_BOOTSTRAP_SCRIPT),
        }
    }

    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}
