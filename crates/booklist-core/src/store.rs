//! Collaborator traits for the two stores the synchronizer sits between.
//!
//! The primary store is only ever read through [`BookProjector`]. The
//! document store comes in a blocking ([`DocumentStore`]) and a
//! suspend-capable ([`AsyncDocumentStore`]) form with the same contract.

use std::future::Future;

use crate::{book::BookId, document::BookListDoc};

// ─── Primary store ───────────────────────────────────────────────────────────

/// Builds a fresh [`BookListDoc`] from the current state of a book aggregate.
pub trait BookProjector {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Project one book. Returns `None` when the primary store does not expose
  /// the book, because it is deleted or soft-deleted.
  fn project_book(&self, book_id: BookId) -> Result<Option<BookListDoc>, Self::Error>;
}

// ─── Document store ──────────────────────────────────────────────────────────

/// Blocking CRUD access to the document store.
pub trait DocumentStore {
  type Error: std::error::Error + Send + Sync + 'static;

  /// Look a document up by book id. Returns `None` if absent.
  fn find(&self, book_id: BookId) -> Result<Option<BookListDoc>, Self::Error>;

  /// Insert a document. Stores may reject an id that is already present.
  fn add(&self, doc: BookListDoc) -> Result<(), Self::Error>;

  /// Remove a document previously returned by [`find`](Self::find).
  fn remove(&self, doc: BookListDoc) -> Result<(), Self::Error>;

  /// Flush pending writes. Called by the host once the synchronizer returns.
  fn save_changes(&self) -> Result<(), Self::Error>;
}

/// Suspend-capable CRUD access to the document store.
///
/// All methods return `Send` futures so hosts can drive them from a
/// multi-threaded runtime.
pub trait AsyncDocumentStore: Send + Sync {
  type Error: std::error::Error + Send + Sync + 'static;

  fn find_async(
    &self,
    book_id: BookId,
  ) -> impl Future<Output = Result<Option<BookListDoc>, Self::Error>> + Send + '_;

  fn add_async(
    &self,
    doc: BookListDoc,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn remove_async(
    &self,
    doc: BookListDoc,
  ) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;

  fn save_changes_async(&self) -> impl Future<Output = Result<(), Self::Error>> + Send + '_;
}
