//! Recommendation engine: query recommendations with remote/local
//! fallback, item-to-item ranking, category filtering, catalog clustering
//! and remote index population, all hanging off an [`AppContext`].
pub mod api;
pub mod category;
pub mod content;
pub mod context;
pub mod error;
pub mod grouping;
pub mod populate;
pub mod recommender;

pub use api::{clamp_limit, ApiError};
pub use category::by_category;
pub use context::AppContext;
pub use error::EngineError;
pub use populate::{PopulateOptions, PopulateReport};
pub use recommender::Recommendations;
