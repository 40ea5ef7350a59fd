mod article;
mod source;

pub use article::{checksum, Article};
pub use source::FeedSource;
