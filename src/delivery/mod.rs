mod format;
mod pipeline;
mod sink;

pub use format::{Language, MessageFormatter};
pub use pipeline::{Pipeline, RunOptions};
pub use sink::{DeliveryError, DeliverySink, LogSink};
