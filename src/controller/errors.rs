//! Error types for the controller API client.

#[derive(Debug, thiserror::Error)]
pub enum ControllerError {
    #[error("controller returned status {status} for {url}")]
    Status {
        status: u16,
        url: String,
        /// Leading portion of the response body, for diagnostics.
        body: String,
    },
    #[error("failed to parse controller response from {url}")]
    ParseFailed {
        status: u16,
        url: String,
        #[source]
        source: anyhow::Error,
    },
    #[error(transparent)]
    RequestFailed(#[from] anyhow::Error),
}
