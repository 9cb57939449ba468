use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum ConfigError {
    #[error("failed to extract configuration: {0}")]
    Extract(#[source] Box<figment::Error>),

    #[error("invalid configuration: {0}")]
    Invalid(String),
}
