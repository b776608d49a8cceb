// erasure-core/src/lib.rs

// Public items are not all documented yet.
#![allow(missing_docs)]
#![deny(unsafe_code)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]
#![warn(clippy::perf)]

// Contracts towards the outside world: relational connectors, the
// tokenization vendor and the data catalog.
pub mod ports;

// Records, grouping, unique-identifier safety, pagination, SQL generation.
// Depends on nothing else in the crate.
pub mod domain;

// Dialect connectors, HTTP clients, credential decryption, configuration.
// Implements the ports on top of the domain.
pub mod infrastructure;

// Anonymization, remediation and action dispatch.
pub mod application;

pub mod error;

pub use error::ErasureError;
