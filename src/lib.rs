pub mod cli;
pub mod config;
pub mod enrich;
pub mod error;
pub mod sanitize;
pub mod supplier;
pub mod table;
pub mod tree;
