use std::collections::BTreeMap;

use accel_helper_core::HelperError;

pub const ENV_RUNTIME_HOME: &str = "ACCEL_RUNTIME_HOME";
pub const ENV_JAVA_HOME: &str = "JAVA_HOME";
pub const ENV_TARGET_PID: &str = "ACCEL_TARGET_PID";

/// Process facts the dump workflow and diagnostics depend on, captured once
/// and passed in explicitly.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProcessContext {
    pub runtime_home: Option<String>,
    pub pid: u32,
    pub environment: BTreeMap<String, String>,
}

impl ProcessContext {
    /// Resolves the runtime home and target pid from `environment`, falling
    /// back to `own_pid` when no target pid is configured.
    pub fn from_environment(environment: BTreeMap<String, String>, own_pid: u32) -> Self {
        let non_blank = |key: &str| {
            environment
                .get(key)
                .map(|value| value.trim())
                .filter(|value| !value.is_empty())
        };

        let runtime_home = non_blank(ENV_RUNTIME_HOME)
            .or_else(|| non_blank(ENV_JAVA_HOME))
            .map(str::to_string);
        let pid = non_blank(ENV_TARGET_PID)
            .and_then(|value| value.parse::<u32>().ok())
            .unwrap_or(own_pid);

        Self {
            runtime_home,
            pid,
            environment,
        }
    }

    pub fn capture() -> Self {
        Self::from_environment(std::env::vars().collect(), std::process::id())
    }

    pub fn require_runtime_home(&self) -> Result<&str, HelperError> {
        self.runtime_home
            .as_deref()
            .ok_or(HelperError::MissingRuntimeHome)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn env(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(key, value)| (key.to_string(), value.to_string()))
            .collect()
    }

    #[test]
    fn explicit_runtime_home_beats_java_home() {
        let context = ProcessContext::from_environment(
            env(&[
                (ENV_RUNTIME_HOME, "/opt/dragonwell11"),
                (ENV_JAVA_HOME, "/usr/lib/jvm/java-11"),
            ]),
            42,
        );
        assert_eq!(
            context.require_runtime_home().expect("home"),
            "/opt/dragonwell11"
        );
        assert_eq!(context.pid, 42);
    }

    #[test]
    fn java_home_is_the_fallback() {
        let context =
            ProcessContext::from_environment(env(&[(ENV_JAVA_HOME, "/usr/lib/jvm/java-11")]), 1);
        assert_eq!(
            context.runtime_home.as_deref(),
            Some("/usr/lib/jvm/java-11")
        );
    }

    #[test]
    fn target_pid_overrides_own_pid_when_numeric() {
        let context = ProcessContext::from_environment(env(&[(ENV_TARGET_PID, "977")]), 5);
        assert_eq!(context.pid, 977);

        let context = ProcessContext::from_environment(env(&[(ENV_TARGET_PID, "jvm")]), 5);
        assert_eq!(context.pid, 5);
    }

    #[test]
    fn missing_runtime_home_is_an_error() {
        let context = ProcessContext::from_environment(BTreeMap::new(), 1);
        assert!(matches!(
            context.require_runtime_home(),
            Err(HelperError::MissingRuntimeHome)
        ));
    }
}
