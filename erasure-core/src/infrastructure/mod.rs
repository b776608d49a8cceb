pub mod adapters;
pub mod catalog;
pub mod config;
pub mod credentials;
pub mod error;
pub mod http;
pub mod tokenization;
