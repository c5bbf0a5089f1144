//! Hoops core: IO-free data model, canonical schemas, key generation and
//! normalization for harvested season / schedule / boxscore batches.
mod dates;
mod frame;
mod keys;
mod normalize;
mod urls;
mod value;

pub mod schema;

pub use dates::parse_event_date;
pub use frame::Frame;
pub use keys::{
    boxscore_id, game_id, game_id_from_url, normalize_segment, season_id, PLAYER_SEGMENT_LEN,
    TEAM_SEGMENT_LEN, UNKNOWN_SEGMENT,
};
pub use normalize::{coerce, normalize, NormalizeError, NormalizeOutcome};
pub use schema::{Column, ColumnKind, EntityKind, TableSchema};
pub use urls::{build_schedule_url, resolve_href, season_year_from_url};
pub use value::Value;
