//! Decoded changefeed consumption with resolved-timestamp tracking.

use feedwatch_core::{decode, Advance, ChangeEvent, Cursor, CursorTracker, QuerySpec, RawRow};
use futures::{Stream, StreamExt};
use tokio_postgres::Client;
use tracing::{debug, info, warn};

use crate::error::PgResult;
use crate::reader::{open_changefeed, RawRowStream};

/// A decoded row together with the raw columns it came from.
#[derive(Debug, Clone)]
pub struct FeedItem {
    pub raw: RawRow,
    pub event: ChangeEvent,
}

/// Pull-based consumer of a changefeed.
///
/// Rows are decoded one at a time in server order. Every resolved marker is
/// applied to the cursor tracker before the item is handed out, so
/// [`ChangefeedStream::current_cursor`] reflects all items returned so far.
pub struct ChangefeedStream<S = RawRowStream> {
    rows: S,
    tracker: CursorTracker,
    rows_seen: u64,
}

impl ChangefeedStream<RawRowStream> {
    /// Open a changefeed on `client` as described by `request`.
    pub async fn open(client: &Client, request: &QuerySpec) -> PgResult<Self> {
        let rows = open_changefeed(client, request).await?;
        Ok(Self::new(rows, request.resume_cursor().cloned()))
    }
}

impl<S> ChangefeedStream<S>
where
    S: Stream<Item = PgResult<RawRow>> + Unpin,
{
    /// Wrap a row stream, seeding the cursor with the point the feed was started from.
    pub fn new(rows: S, start: Option<Cursor>) -> Self {
        Self {
            rows,
            tracker: CursorTracker::starting_at(start),
            rows_seen: 0,
        }
    }

    /// Pull and decode the next row.
    ///
    /// Returns `Ok(None)` when the server ends the feed. Connection and decode
    /// failures are returned as errors; the feed should not be read further.
    pub async fn next(&mut self) -> PgResult<Option<FeedItem>> {
        let Some(raw) = self.rows.next().await.transpose()? else {
            info!(rows = self.rows_seen, "Changefeed ended");
            return Ok(None);
        };
        self.rows_seen += 1;

        let event = decode(&raw)?;

        if let ChangeEvent::Resolved(marker) = &event {
            match self.tracker.observe(marker) {
                Ok(Advance::Initial) => {
                    info!(cursor = %marker.timestamp, "Cursor established");
                }
                Ok(Advance::Advanced { previous }) => {
                    debug!(cursor = %marker.timestamp, previous = %previous, "Cursor advanced");
                }
                Ok(Advance::Unchanged) => {}
                Err(violation) => {
                    warn!(
                        table = %marker.table,
                        error = %violation,
                        cursor = ?self.tracker.current_cursor().map(Cursor::as_str),
                        "Protocol violation, keeping current cursor"
                    );
                }
            }
        }

        Ok(Some(FeedItem { raw, event }))
    }

    /// The latest resolved timestamp seen, or the start cursor if none arrived yet.
    pub fn current_cursor(&self) -> Option<&Cursor> {
        self.tracker.current_cursor()
    }

    /// Number of rows pulled from the feed.
    pub fn rows_seen(&self) -> u64 {
        self.rows_seen
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PgError;
    use feedwatch_core::DecodeStage;
    use futures::stream;

    const ROW_ID: &str = "1d3c6a0e-7b2f-4c8d-9e1a-5f6b7c8d9e0f";

    fn upsert(updated: &str) -> RawRow {
        RawRow::new(
            "messages",
            format!(r#"["{}"]"#, ROW_ID),
            format!(
                r#"{{"after":{{"id":"{}","source":"a@noemail.com","title":"t","body":"b"}},"updated":"{}"}}"#,
                ROW_ID, updated
            ),
        )
    }

    fn resolved(ts: &str) -> RawRow {
        RawRow::new("", "", format!(r#"{{"resolved":"{}"}}"#, ts))
    }

    type VecStream = stream::Iter<std::vec::IntoIter<PgResult<RawRow>>>;

    fn feed_of(rows: Vec<PgResult<RawRow>>) -> ChangefeedStream<VecStream> {
        ChangefeedStream::new(stream::iter(rows), None)
    }

    #[tokio::test]
    async fn test_items_in_order_with_cursor() {
        let mut feed = feed_of(vec![
            Ok(upsert("90.0")),
            Ok(resolved("100.0")),
            Ok(resolved("200.0")),
            Ok(resolved("150.0")),
        ]);

        let first = feed.next().await.unwrap().unwrap();
        assert!(first.event.as_row_change().is_some());
        assert_eq!(first.raw.table.as_ref(), b"messages");
        assert!(feed.current_cursor().is_none());

        let mut cursors = Vec::new();
        while let Some(item) = feed.next().await.unwrap() {
            assert!(item.event.as_resolved().is_some());
            cursors.push(feed.current_cursor().unwrap().as_str().to_string());
        }

        assert_eq!(cursors, vec!["100.0", "200.0", "200.0"]);
        assert_eq!(feed.rows_seen(), 4);
    }

    #[tokio::test]
    async fn test_violation_still_delivers_item() {
        let mut feed = feed_of(vec![Ok(resolved("200.0")), Ok(resolved("150.0"))]);

        feed.next().await.unwrap().unwrap();
        let item = feed.next().await.unwrap().unwrap();
        assert_eq!(item.event.as_resolved().unwrap().timestamp, "150.0");
        assert_eq!(feed.current_cursor().unwrap().as_str(), "200.0");
    }

    #[tokio::test]
    async fn test_resume_cursor_seeds_tracker() {
        let start = Cursor::parse("42.0").unwrap();
        let rows = stream::iter(vec![Ok::<_, PgError>(upsert("43.0"))]);
        let mut feed = ChangefeedStream::new(rows, Some(start));

        assert_eq!(feed.current_cursor().unwrap().as_str(), "42.0");
        feed.next().await.unwrap().unwrap();
        assert_eq!(feed.current_cursor().unwrap().as_str(), "42.0");
    }

    #[tokio::test]
    async fn test_decode_error_is_returned() {
        let mut feed = feed_of(vec![
            Ok(RawRow::new("messages", "[oops", r#"{"updated":"1.0"}"#)),
            Ok(resolved("100.0")),
        ]);

        match feed.next().await {
            Err(PgError::Decode(e)) => assert_eq!(e.stage(), DecodeStage::Keys),
            other => panic!("expected decode error, got {:?}", other.map(|_| ())),
        }
    }

    #[tokio::test]
    async fn test_connection_error_is_returned() {
        let mut feed = feed_of(vec![Err(PgError::Connection("connection closed".into()))]);

        let err = feed.next().await.unwrap_err();
        assert!(err.is_connection());
    }

    #[tokio::test]
    async fn test_end_of_stream() {
        let mut feed = feed_of(vec![]);
        assert!(feed.next().await.unwrap().is_none());
        assert_eq!(feed.rows_seen(), 0);
    }
}
