//! Hoops engine: fetching, table extraction, the harvest walk and storage.
mod decode;
mod events;
mod extract;
mod fetch;
mod harvest;
mod locate;
mod persist;
mod types;

pub mod store;

pub use decode::{decode_html, DecodedHtml};
pub use events::{ChannelEventSink, EventSink, HarvestEvent, LogEventSink, Stage};
pub use extract::{
    extract_primary_table, extract_table, find_column, parse_page, unwrap_commented_tables,
    ExtractError, TableData,
};
pub use fetch::{FetchSettings, Fetcher, ProxySettings, ReqwestFetcher};
pub use harvest::{
    error_chain, filter_listings_by_date, DetailCache, DetailReport, HarvestError, Harvester,
    ListingReport, UnitReport, DEFAULT_BASE_URL, DEFAULT_START_PATH, LISTING_COLUMNS,
    UNIT_COLUMNS,
};
pub use locate::{
    default_strategies, locate_role_tables, CombinedContainer, NamedContainers,
    PositionalFallback, RoleMatch, RoleTableStrategy,
};
pub use persist::{ensure_output_dir, AtomicFileWriter, PersistError};
pub use store::{
    DatabaseBackend, DatabaseStore, FileStore, StorageBackend, StoreConfig, StoreError, WriteMode,
};
pub use types::{FailureKind, FetchError, Role};
