/// Fatal conditions. Each one aborts the run with its own exit code and no
/// prompt output. Unborn HEAD and a missing upstream are not errors.
#[derive(Debug, thiserror::Error)]
pub enum PromptError {
    #[error("Cannot determine current directory: {0}")]
    EnvironmentError(String),
    #[error("Not inside a git repository: {0}")]
    RepositoryNotFound(String),
    #[error("Failed to open repository: {0}")]
    RepositoryOpenFailed(String),
    #[error("Failed to read repository status: {0}")]
    StatusEnumerationFailed(String),
    #[error("Failed to read submodule status: {0}")]
    SubmoduleEnumerationFailed(String),
    #[error("Failed to resolve HEAD: {0}")]
    HeadResolutionFailed(String),
    #[error("Failed to compute ahead/behind: {0}")]
    AheadBehindComputationFailed(String),
    #[error("Failed to list remotes: {0}")]
    RemoteListingFailed(String),
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),
}

/// Exit code used after help output is shown.
pub const EXIT_HELP: i32 = 1;

impl PromptError {
    pub fn exit_code(&self) -> i32 {
        match self {
            PromptError::EnvironmentError(_) => -1,
            PromptError::RepositoryOpenFailed(_) => -2,
            PromptError::RepositoryNotFound(_) => -3,
            PromptError::StatusEnumerationFailed(_) => -4,
            PromptError::SubmoduleEnumerationFailed(_) => -5,
            PromptError::HeadResolutionFailed(_) => -6,
            PromptError::AheadBehindComputationFailed(_) => -7,
            PromptError::RemoteListingFailed(_) => -8,
            PromptError::InvalidArgument(_) => -9,
        }
    }
}

pub type Result<T> = std::result::Result<T, PromptError>;
