//! Raw row reader for a running changefeed query.

use std::error::Error as StdError;

use bytes::Bytes;
use feedwatch_core::{QuerySpec, RawRow};
use futures::stream::BoxStream;
use futures::StreamExt;
use tokio_postgres::types::{FromSql, Type};
use tokio_postgres::{Client, Row};
use tracing::info;

use crate::error::{PgError, PgResult};

/// Column bytes exactly as sent by the server, whatever the column type.
#[derive(Debug)]
struct RawColumn<'a>(&'a [u8]);

impl<'a> FromSql<'a> for RawColumn<'a> {
    fn from_sql(_: &Type, raw: &'a [u8]) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(RawColumn(raw))
    }

    fn from_sql_null(_: &Type) -> Result<Self, Box<dyn StdError + Sync + Send>> {
        Ok(RawColumn(&[]))
    }

    fn accepts(_: &Type) -> bool {
        true
    }
}

/// Lazily pulled rows of a changefeed, in server order.
pub type RawRowStream = BoxStream<'static, PgResult<RawRow>>;

/// Run the initiation statement and return the stream of rows it produces.
///
/// The query never completes on its own; rows arrive as the server emits them
/// and the stream ends only if the server closes the feed.
pub async fn open_changefeed(client: &Client, request: &QuerySpec) -> PgResult<RawRowStream> {
    let statement = request.statement();
    info!(table = %request.table(), statement = %statement, "Opening changefeed");

    let rows = client
        .query_raw(statement.as_str(), std::iter::empty::<&str>())
        .await?;

    Ok(rows
        .map(|row| row.map_err(PgError::from).and_then(|row| raw_row(&row)))
        .boxed())
}

fn raw_row(row: &Row) -> PgResult<RawRow> {
    if row.len() != 3 {
        return Err(PgError::UnexpectedColumns(row.len()));
    }

    Ok(RawRow {
        table: column(row, 0)?,
        keys: column(row, 1)?,
        value: column(row, 2)?,
    })
}

fn column(row: &Row, idx: usize) -> PgResult<Bytes> {
    let RawColumn(data) = row.try_get::<_, RawColumn>(idx)?;
    Ok(Bytes::copy_from_slice(data))
}
