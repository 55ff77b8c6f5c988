pub mod analytics;
pub mod catalog;
pub mod config;
pub mod error;
pub mod traits;
pub mod types;

pub use catalog::{Catalog, LoadReport, QuarantinedRow};
pub use error::{Error, Result};
pub use traits::Embedder;
pub use types::{ClusterAssignment, Item, ItemId, ItemVector, RetrievalSource, SimilarityMatch};
