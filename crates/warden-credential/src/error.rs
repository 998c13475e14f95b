/// Errors produced while acquiring or attaching outbound credentials.
#[derive(Debug, thiserror::Error)]
pub enum CredentialError {
    #[error("token acquisition failed: {0}")]
    Acquisition(String),
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type CredentialResult<T> = Result<T, CredentialError>;
