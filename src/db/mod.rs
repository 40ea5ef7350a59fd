mod schema;
mod store;

#[cfg(test)]
pub use schema::DEFAULT_FEEDS;
pub use store::HistoryStore;
