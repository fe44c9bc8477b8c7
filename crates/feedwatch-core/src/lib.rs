pub mod cursor;
pub mod decode;
pub mod error;
pub mod request;
pub mod types;

pub use cursor::{Advance, Cursor, CursorTracker, ProtocolViolation};
pub use decode::decode;
pub use error::{CursorError, DecodeError, DecodeResult, DecodeStage};
pub use request::{build_initiation_request, is_valid_table_name, FeedMode, QuerySpec};
pub use types::{ChangeEvent, RawRow, ResolvedMarker, Row, RowChange};
