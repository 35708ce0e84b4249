//! Environment variables read by the connection constructors and fixtures.

/// Runtime stage indicator, `local` selects the developer endpoint
pub const STAGE_VAR: &str = "ENV";
/// Database endpoint/URI override
pub const DB_URI_VAR: &str = "DB_URI";
/// AWS region override
pub const REGION_VAR: &str = "AWS_DEFAULT_REGION";
/// Continuous-integration indicator
pub const CI_VAR: &str = "CI";

/// Stage value that selects local connections
pub const LOCAL_STAGE: &str = "local";
/// Region used when none is configured
pub const DEFAULT_REGION: &str = "us-east-1";

/// Value of the environment variable `name`, or `default` when it is not set.
///
/// A variable set to an empty string is returned as is.
pub fn get_env(name: &str, default: &str) -> String {
    std::env::var(name).unwrap_or_else(|_| default.to_string())
}

/// Snapshot of the environment relevant to this crate
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Environment {
    /// Runtime stage (`ENV`)
    pub stage: String,
    /// Endpoint or connection URI (`DB_URI`), `None` when unset or empty
    pub db_uri: Option<String>,
    /// AWS region (`AWS_DEFAULT_REGION`)
    pub region: String,
    /// Whether the process runs in CI (`CI`)
    pub ci: bool,
}

impl Default for Environment {
    fn default() -> Self {
        Self {
            stage: LOCAL_STAGE.to_string(),
            db_uri: None,
            region: DEFAULT_REGION.to_string(),
            ci: false,
        }
    }
}

impl Environment {
    /// Read the environment of the current process
    pub fn from_env() -> Self {
        Self {
            stage: get_env(STAGE_VAR, LOCAL_STAGE),
            db_uri: std::env::var(DB_URI_VAR).ok().filter(|uri| !uri.is_empty()),
            region: get_env(REGION_VAR, DEFAULT_REGION),
            ci: std::env::var(CI_VAR).map(|v| is_ci_flag(&v)).unwrap_or(false),
        }
    }

    /// Whether connections should target the developer endpoint
    pub fn is_local(&self) -> bool {
        self.stage.eq_ignore_ascii_case(LOCAL_STAGE)
    }
}

// CI pipelines export CI=true; older job templates export CI=CI.
fn is_ci_flag(value: &str) -> bool {
    ["ci", "true", "1"]
        .iter()
        .any(|flag| value.trim().eq_ignore_ascii_case(flag))
}
