/// Prompt version - kept in step with Cargo.toml
pub const PROMPT_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Binary name
pub const PROMPT_NAME: &str = "git-prompt";

/// Default config file name relative to home
pub const CONFIG_FILE_NAME: &str = ".git-prompt.json";

/// Environment variable overriding the config file path
pub const CONFIG_ENV: &str = "GIT_PROMPT_CONFIG";

/// Environment variable holding the env_logger filter
pub const LOG_ENV: &str = "GIT_PROMPT_LOG";
