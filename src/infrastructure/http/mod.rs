//! HTTP adapters.

mod fetcher;

pub use fetcher::HttpFetcher;
