//! SQLite backend for the book list.
//!
//! [`SqlBookStore`] is the normalized primary store. Writes go through a
//! [`Session`], which records every mutation in a change log and, on save,
//! brings the denormalized book list up to date before committing.
//! [`SqliteDocumentStore`] is a document store for that book list, wrapping
//! [`tokio_rusqlite`] so its I/O never blocks the async runtime.

mod encode;
mod query;
mod schema;
mod session;
mod store;

pub mod docstore;
pub mod error;
pub mod seed;

pub use docstore::SqliteDocumentStore;
pub use error::{Error, Result};
pub use session::{SaveReport, Session};
pub use store::SqlBookStore;
