// erasure/src/commands/mod.rs

pub mod execute;
pub mod serve;
