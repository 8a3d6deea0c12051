use thiserror::Error;

/// Errors when loading or validating verification configuration.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum VerifyConfigError {
    /// Required environment variable was not provided.
    #[error("missing env var {0}")]
    MissingEnv(&'static str),

    /// Configuration failed validation checks.
    #[error("invalid verify config: {0}")]
    Invalid(String),
}

/// Verification configuration.
///
/// Injected into [`Verify`](crate::Verify) at construction; nothing in
/// the crate reads ambient process state after that point.
#[derive(Debug, Clone)]
pub struct VerifyConfig {
    /// Hostname used to build verification links, without scheme
    /// (e.g. "app.example.com").
    pub host: String,

    /// System name used in the email footer
    /// (default: "Immediate Feedback System")
    pub system_name: String,

    /// Subject used when the caller supplies an empty one
    /// (default: "Please confirm this action")
    pub default_subject: String,
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            host: String::new(), // Must be provided by user
            system_name: "Immediate Feedback System".to_string(),
            default_subject: "Please confirm this action".to_string(),
        }
    }
}

impl VerifyConfig {
    /// Build verification config from environment variables.
    ///
    /// Required:
    /// - `VERIFY_HOST`
    ///
    /// Optional variables fall back to `Default` values when not provided:
    /// - `VERIFY_SYSTEM_NAME`
    /// - `VERIFY_DEFAULT_SUBJECT`
    pub fn from_env() -> Result<Self, VerifyConfigError> {
        let mut cfg = Self::default();
        cfg.host = env_var_required("VERIFY_HOST")?;

        if let Some(v) = env_var_optional("VERIFY_SYSTEM_NAME") {
            cfg.system_name = v;
        }
        if let Some(v) = env_var_optional("VERIFY_DEFAULT_SUBJECT") {
            cfg.default_subject = v;
        }

        cfg.validate()?;
        Ok(cfg)
    }

    /// Validate configuration.
    pub fn validate(&self) -> Result<(), VerifyConfigError> {
        if self.host.trim().is_empty() {
            return Err(VerifyConfigError::Invalid(
                "host cannot be empty".to_string(),
            ));
        }

        // Links are always built as http://{host}/..., so a configured
        // scheme or path would corrupt the wire format.
        if self.host.contains("://") || self.host.contains('/') {
            return Err(VerifyConfigError::Invalid(
                "host must be a bare hostname without scheme or path".to_string(),
            ));
        }

        if self.system_name.trim().is_empty() {
            return Err(VerifyConfigError::Invalid(
                "system name cannot be empty".to_string(),
            ));
        }

        Ok(())
    }
}

fn env_var_required(key: &'static str) -> Result<String, VerifyConfigError> {
    std::env::var(key).map_err(|_| VerifyConfigError::MissingEnv(key))
}

fn env_var_optional(key: &str) -> Option<String> {
    std::env::var(key).ok().filter(|v| !v.is_empty())
}
