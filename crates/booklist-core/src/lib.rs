//! Core types for keeping a denormalized book list in step with the
//! normalized book/author/review store.
//!
//! This crate is free of database dependencies. It owns the mutation-intent
//! log a unit of work fills in, the detector that turns that log into one
//! change per affected book, and the synchronizer that replays those changes
//! against a document store.

pub mod book;
pub mod change;
pub mod document;
pub mod error;
pub mod memory;
pub mod store;
pub mod sync;
pub mod tracking;

pub use error::{Error, Result};
