//! Library layer for kaburank: fetch Japanese stock-ranking pages, extract
//! security codes, and export TradingView watchlists.
//!
//! The pipeline is orchestrated by [`RankingClient`]: resolve a ranking type
//! to its source site, fetch the page(s), extract codes in document order,
//! deduplicate, truncate, and hand the snapshot to [`WatchlistExporter`].

pub mod error;
pub mod export;
pub mod extract;
pub mod fetch;
pub mod ranking;
pub mod sources;

pub use error::RankingError;
pub use export::WatchlistExporter;
pub use fetch::{BrowserFetcher, DirectFetcher};
pub use ranking::{RankingClient, RankingSnapshot};
pub use sources::{RankingType, SiteId, SourceRegistry};
