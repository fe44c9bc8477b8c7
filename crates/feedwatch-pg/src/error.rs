use feedwatch_core::DecodeError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum PgError {
    #[error("postgres error: {0}")]
    Postgres(String),

    #[error("connection failed: {0}")]
    Connection(String),

    #[error("changefeed row has {0} columns, expected 3")]
    UnexpectedColumns(usize),

    #[error("failed to decode changefeed row: {0}")]
    Decode(#[from] DecodeError),

    #[error("invalid table name '{0}'")]
    InvalidTableName(String),
}

impl From<tokio_postgres::Error> for PgError {
    fn from(e: tokio_postgres::Error) -> Self {
        if e.is_closed() {
            return PgError::Connection(e.to_string());
        }

        // Extract database error details if available
        if let Some(db_err) = e.as_db_error() {
            let msg = format!(
                "{}: {} (code: {})",
                db_err.severity(),
                db_err.message(),
                db_err.code().code()
            );
            PgError::Postgres(msg)
        } else {
            PgError::Postgres(e.to_string())
        }
    }
}

impl PgError {
    /// Whether the underlying connection is gone.
    pub fn is_connection(&self) -> bool {
        matches!(self, PgError::Connection(_))
    }
}

pub type PgResult<T> = Result<T, PgError>;
