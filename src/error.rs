use crate::config::ConfigError;
use crate::records::RecordError;
use crate::schedule::QueryError;
use crate::storage::SourceError;

#[derive(Debug, thiserror::Error)]
pub enum ClinicError {
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),
    #[error("record source error: {0}")]
    Source(#[from] SourceError),
    #[error("record error: {0}")]
    Records(#[from] RecordError),
    #[error("query error: {0}")]
    Query(#[from] QueryError),
    #[error("server error: {0}")]
    Server(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type ClinicResult<T> = Result<T, ClinicError>;
