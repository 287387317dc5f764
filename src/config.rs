use serde::{Deserialize, Serialize};

use crate::{encoder::CallerEncoding, level::Severity, sink};

/// Extra file destination written by the development preset.
pub const DEVELOPMENT_LOG_PATH: &str = "/tmp/logs";

/// Engine configuration consumed by [`crate::LoggerFactory`].
///
/// Every field has a default, so a host can deserialize a partial table from
/// its own configuration file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Records below this severity are dropped.
    pub level: Severity,
    /// Also write to [`DEVELOPMENT_LOG_PATH`].
    pub development: bool,
    /// `"stdout"`, `"stderr"` or a file path, opened in append mode.
    pub output_paths: Vec<String>,
    /// Where write and sync failures of the outputs are reported.
    pub error_output_paths: Vec<String>,
    pub caller: CallerEncoding,
}

impl LogConfig {
    pub fn production() -> Self {
        Self {
            level: Severity::Debug,
            development: false,
            output_paths: vec![sink::STDOUT.to_string()],
            error_output_paths: vec![sink::STDERR.to_string()],
            caller: CallerEncoding::Short,
        }
    }

    pub fn development() -> Self {
        Self {
            development: true,
            ..Self::production()
        }
    }

    /// Destinations the engine opens: `output_paths`, plus
    /// [`DEVELOPMENT_LOG_PATH`] in development mode unless already listed.
    pub fn effective_output_paths(&self) -> Vec<String> {
        let mut paths = self.output_paths.clone();
        if self.development && !paths.iter().any(|p| p == DEVELOPMENT_LOG_PATH) {
            paths.push(DEVELOPMENT_LOG_PATH.to_string());
        }
        paths
    }
}

impl Default for LogConfig {
    fn default() -> Self {
        Self::production()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn production_writes_to_standard_streams() {
        let cfg = LogConfig::default();
        assert_eq!(cfg, LogConfig::production());
        assert_eq!(cfg.level, Severity::Debug);
        assert!(!cfg.development);
        assert_eq!(cfg.output_paths, vec!["stdout"]);
        assert_eq!(cfg.error_output_paths, vec!["stderr"]);
    }

    #[test]
    fn development_adds_the_local_file() {
        let cfg = LogConfig::development();
        assert!(cfg.development);
        assert_eq!(cfg.output_paths, vec!["stdout"]);
        assert_eq!(cfg.effective_output_paths(), vec!["stdout", DEVELOPMENT_LOG_PATH]);
        assert_eq!(cfg.error_output_paths, vec!["stderr"]);
        assert_eq!(LogConfig::production().effective_output_paths(), vec!["stdout"]);
    }

    #[test]
    fn deserialized_development_flag_adds_the_local_file() -> Result<(), serde_json::Error> {
        let cfg: LogConfig = serde_json::from_str(r#"{"development": true}"#)?;
        assert_eq!(cfg.effective_output_paths(), vec!["stdout", DEVELOPMENT_LOG_PATH]);

        let listed: LogConfig = serde_json::from_str(
            r#"{"development": true, "output_paths": ["/tmp/logs", "stderr"]}"#,
        )?;
        assert_eq!(listed.effective_output_paths(), vec!["/tmp/logs", "stderr"]);
        Ok(())
    }

    #[test]
    fn partial_tables_fall_back_to_defaults() -> Result<(), serde_json::Error> {
        let cfg: LogConfig = serde_json::from_str(
            r#"{"level": "warn", "output_paths": ["/var/log/app.log"], "caller": "full"}"#,
        )?;
        assert_eq!(cfg.level, Severity::Warn);
        assert_eq!(cfg.output_paths, vec!["/var/log/app.log"]);
        assert_eq!(cfg.error_output_paths, vec!["stderr"]);
        assert_eq!(cfg.caller, CallerEncoding::Full);
        Ok(())
    }
}
