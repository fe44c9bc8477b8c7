pub mod bootstrap;
mod connect;
mod error;
pub mod generator;
pub mod reader;
pub mod stream;

pub use bootstrap::ensure_table;
pub use connect::{connect_store, redact_connection_string};
pub use error::{PgError, PgResult};
pub use generator::{random_row, WriteGenerator, WriteGeneratorConfig};
pub use reader::{open_changefeed, RawRowStream};
pub use stream::{ChangefeedStream, FeedItem};
