pub mod error;
pub mod pipeline;
pub mod scoring;
pub mod store;
#[cfg(any(test, feature = "test-support"))]
pub mod testing;
pub mod traits;

pub use error::SelectionError;
pub use pipeline::selector::{ArticleSelector, SelectionRequest, SelectionResult};
pub use pipeline::stats::SelectionStats;
