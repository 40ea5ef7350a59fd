mod aggregator;
mod canonical;
mod entry;
mod fetcher;
mod opml_import;

#[cfg(test)]
pub(crate) mod fixtures;

pub use aggregator::collect_articles;
pub use fetcher::FeedFetcher;
pub use opml_import::feed_urls_from_opml;
