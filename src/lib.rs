//! Bookstore query runner over an embedded bson document store.
//!
//! The store (engine, collections, indexes, query and aggregation) is reached through
//! [`client::Client`]; [`runner`] holds the fixed query script.

pub mod aggregate;
pub mod books;
pub mod client;
pub mod collection;
pub mod config;
pub mod document;
pub mod engine;
pub mod errors;
pub mod export;
pub mod import;
pub mod index;
pub mod logger;
pub mod query;
pub mod runner;
pub mod types;
pub mod utils;

pub use client::{Client, CollectionRef, Database};
pub use errors::{DbError, DbResult};
pub use runner::{QueryRunner, QuerySettings, RunReport, Step, StepOutput, run_queries};
