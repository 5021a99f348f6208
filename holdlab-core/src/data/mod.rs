//! Market data: sources, local storage, and the shared price book

pub mod csv_store;
pub mod download;
pub mod loader;
pub mod price_book;
pub mod provider;
pub mod universe;
pub mod yahoo;

pub use csv_store::{CsvHistoryStore, StoreMeta};
pub use download::{download_histories, DownloadSummary};
pub use loader::StoreFirstSource;
pub use price_book::PriceBook;
pub use provider::{CloseHistory, DataError, DownloadProgress, PriceSource, StdoutProgress};
pub use universe::TickerUniverse;
pub use yahoo::YahooProvider;
