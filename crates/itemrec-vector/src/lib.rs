//! Vector layer: embedding cache, brute-force cosine ranking, k-means
//! grouping and the remote index client.
pub mod cache;
pub mod cluster;
pub mod embed_provider;
pub mod remote;
pub mod similarity;

pub use cache::{EmbeddingCache, VectorTable};
pub use cluster::{kmeans, ClusterError, Clustering, KMeansParams};
pub use embed_provider::{EmbedProvider, Embedded, LocalProvider};
pub use remote::{IndexStats, ItemMetadata, RemoteError, RemoteIndexClient, RemoteMatch, UpsertRecord};
pub use similarity::{rank, Ranked, EXCLUDED_SCORE};
