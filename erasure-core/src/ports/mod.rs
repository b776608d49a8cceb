// erasure-core/src/ports/mod.rs

pub mod catalog;
pub mod connector;
pub mod tokenizer;

pub use catalog::CatalogService;
pub use connector::{ConnectorFactory, RelationalConnector};
pub use tokenizer::{TokenSpec, Tokenizer};
