pub mod embeddings;
pub mod http;
pub mod postgres;

pub use embeddings::HttpEmbeddingBackend;
pub use http::ReqwestHttpClient;
pub use postgres::PgStore;
