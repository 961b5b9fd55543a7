use thiserror::Error;

#[derive(Error, Debug)]
pub enum StreamError {
    #[error("transport error: {0}")]
    Transport(String),

    #[error("persistence error: {0}")]
    Persistence(String),

    #[error("job is already terminal: {0}")]
    AlreadyTerminal(String),
}
