pub mod pm2;
pub mod types;

pub use pm2::Pm2;
pub use types::{Channel, ChannelKind, ParseError, Parseable, TimeSeriesTable, Value};
