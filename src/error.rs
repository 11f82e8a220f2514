use thiserror::Error;

/// Everything a translation attempt can fail with. The display strings are
/// what the overlay shows, so they are written for the user, not the log.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TranslateError {
    #[error("No API key configured. Open Settings from the tray icon to add one.")]
    MissingCredential,
    #[error("Request failed: {0}")]
    Network(String),
    #[error("Unexpected response from the server: {0}")]
    MalformedResponse(String),
    #[error("Translation failed: {0}")]
    Unknown(String),
}
