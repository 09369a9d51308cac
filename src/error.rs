use std::fmt;

use thiserror::Error;

/// Identifies the pipeline step a failure originated from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    CheckInputParams,
    LoadConfig,
    GetReleaseVersion,
    SetProcessingFlag,
    GenerateEnvs,
    GenerateScript,
    WriteScript,
    RunScript,
    ExtractUnsealKeys,
    GetRootToken,
    PersistConfig,
    PublishUrl,
    Finalize,
}

impl Step {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Step::CheckInputParams => "check_input_params",
            Step::LoadConfig => "load_config",
            Step::GetReleaseVersion => "get_release_version",
            Step::SetProcessingFlag => "set_processing_flag",
            Step::GenerateEnvs => "generate_envs",
            Step::GenerateScript => "generate_script",
            Step::WriteScript => "write_script",
            Step::RunScript => "run_script",
            Step::ExtractUnsealKeys => "extract_unseal_keys",
            Step::GetRootToken => "get_root_token",
            Step::PersistConfig => "persist_config",
            Step::PublishUrl => "publish_url",
            Step::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Step {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A bootstrap step failure, tagged with the step it originated from.
#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error("{step}: data not found: {message}")]
    DataNotFound { step: Step, message: String },

    #[error("{step}: operation failed: {message}")]
    OperationFailed {
        step: Step,
        message: String,
        #[source]
        source: Option<Box<dyn std::error::Error + Send + Sync>>,
    },
}

impl BootstrapError {
    pub fn not_found(step: Step, message: impl Into<String>) -> Self {
        BootstrapError::DataNotFound {
            step,
            message: message.into(),
        }
    }

    pub fn failed(step: Step, message: impl Into<String>) -> Self {
        BootstrapError::OperationFailed {
            step,
            message: message.into(),
            source: None,
        }
    }

    pub fn failed_with(step: Step, message: impl Into<String>, source: anyhow::Error) -> Self {
        BootstrapError::OperationFailed {
            step,
            message: message.into(),
            source: Some(source.into()),
        }
    }

    #[must_use]
    pub fn step(&self) -> Step {
        match self {
            BootstrapError::DataNotFound { step, .. }
            | BootstrapError::OperationFailed { step, .. } => *step,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display_includes_step() {
        let err = BootstrapError::not_found(Step::LoadConfig, "no configuration for secrets");
        assert_eq!(
            err.to_string(),
            "load_config: data not found: no configuration for secrets"
        );
    }

    #[test]
    fn test_failed_with_keeps_source() {
        let cause = anyhow::anyhow!("connection refused");
        let err = BootstrapError::failed_with(Step::GetReleaseVersion, "system settings", cause);
        assert_eq!(err.step(), Step::GetReleaseVersion);
        let source = std::error::Error::source(&err).map(ToString::to_string);
        assert_eq!(source.as_deref(), Some("connection refused"));
    }
}
