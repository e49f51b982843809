pub mod config;
pub mod crawler;
pub mod error;
pub mod metrics;
pub mod result;
pub mod scope;
pub mod sitemap;
pub mod strategy;

pub use config::CrawlConfig;
pub use crawler::{CrawlOutcome, Crawler, ProgressCallback, ResultCallback};
pub use error::ScanError;
pub use result::{CrawlTarget, ExtractedPage, Extraction, ExtractionFailure, PageResult, ReasonCode};
pub use scope::{HostMatch, HostScope};
pub use strategy::{ExtractionStrategy, StrategyKind};
