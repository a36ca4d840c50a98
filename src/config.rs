//! Workflow configuration.
//!
//! Every value the original workflow hardcoded lives here as a named field,
//! validated up front so a bad setup fails before the first network call.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "gpt-3.5-turbo";
pub const DEFAULT_ASSISTANT_NAME: &str = "Coding Bot";
pub const DEFAULT_INSTRUCTIONS: &str = "Generate a file, always. You are an expert Python \
     developer. When asked to solve a query, you write and run code to answer the question. \
     Make the file id available for download.";
pub const DEFAULT_POLL_INTERVAL_SECS: u64 = 10;
pub const DEFAULT_MAX_POLLS: u32 = 60;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("api key is empty")]
    MissingApiKey,
    #[error("{0} must not be empty")]
    EmptyField(&'static str),
    #[error("input file not found: {}", .0.display())]
    InputFileNotFound(PathBuf),
    #[error("poll interval must be non-zero")]
    ZeroPollInterval,
    #[error("poll bound must be non-zero")]
    ZeroPollBound,
}

#[derive(Debug, Clone)]
pub struct WorkflowConfig {
    /// Bearer credential for the remote service.
    pub api_key: String,
    pub base_url: String,
    /// Local file uploaded for the assistant to work on.
    pub input_file: PathBuf,
    /// User query seeded into the conversation thread.
    pub query: String,
    pub assistant_name: String,
    pub instructions: String,
    pub model: String,
    /// Where a generated image artifact is written (overwritten if present).
    pub image_output: PathBuf,
    /// Where a generated code artifact is written (overwritten if present).
    pub code_output: PathBuf,
    /// Fixed delay between run status checks.
    pub poll_interval: Duration,
    /// Maximum number of status checks before the run is abandoned.
    pub max_polls: u32,
}

impl WorkflowConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.api_key.trim().is_empty() {
            return Err(ConfigError::MissingApiKey);
        }
        if self.query.trim().is_empty() {
            return Err(ConfigError::EmptyField("query"));
        }
        if self.model.trim().is_empty() {
            return Err(ConfigError::EmptyField("model"));
        }
        if self.assistant_name.trim().is_empty() {
            return Err(ConfigError::EmptyField("assistant name"));
        }
        if !self.input_file.is_file() {
            return Err(ConfigError::InputFileNotFound(self.input_file.clone()));
        }
        if self.poll_interval.is_zero() {
            return Err(ConfigError::ZeroPollInterval);
        }
        if self.max_polls == 0 {
            return Err(ConfigError::ZeroPollBound);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn config_with_input(input_file: PathBuf) -> WorkflowConfig {
        WorkflowConfig {
            api_key: "sk-test".to_string(),
            base_url: "http://127.0.0.1:1".to_string(),
            input_file,
            query: "plot the data".to_string(),
            assistant_name: DEFAULT_ASSISTANT_NAME.to_string(),
            instructions: DEFAULT_INSTRUCTIONS.to_string(),
            model: DEFAULT_MODEL.to_string(),
            image_output: PathBuf::from("output.png"),
            code_output: PathBuf::from("output.py"),
            poll_interval: Duration::from_millis(10),
            max_polls: 5,
        }
    }

    #[test]
    fn valid_config_passes() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        fs::write(&input, "a,b\n1,2\n").unwrap();

        config_with_input(input).validate().unwrap();
    }

    #[test]
    fn empty_api_key_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        fs::write(&input, "x").unwrap();

        let mut config = config_with_input(input);
        config.api_key = "  ".to_string();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::MissingApiKey)
        ));
    }

    #[test]
    fn missing_input_file_is_rejected() {
        let config = config_with_input(PathBuf::from("/no/such/data.csv"));
        assert!(matches!(
            config.validate(),
            Err(ConfigError::InputFileNotFound(_))
        ));
    }

    #[test]
    fn empty_query_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        fs::write(&input, "x").unwrap();

        let mut config = config_with_input(input);
        config.query = String::new();
        assert!(matches!(
            config.validate(),
            Err(ConfigError::EmptyField("query"))
        ));
    }

    #[test]
    fn zero_poll_bound_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("data.csv");
        fs::write(&input, "x").unwrap();

        let mut config = config_with_input(input);
        config.max_polls = 0;
        assert!(matches!(config.validate(), Err(ConfigError::ZeroPollBound)));
    }
}
