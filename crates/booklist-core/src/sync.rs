//! Replays detected book changes against the document store.
//!
//! `Deleted` removes the book's document if there is one. `Added` and
//! `Modified` both rebuild the document from the primary store and replace
//! whatever is stored under the book id, so a refresh of a missing document
//! inserts it and a create over a stale document never trips a uniqueness
//! check.
//!
//! The pass is best-effort: a failure stops it and is returned to the
//! caller. Documents already written stay written, or stay staged in a
//! store that buffers until `save_changes`.

use tracing::{debug, info, warn};

use crate::{
  Error, Result,
  book::BookId,
  change::{BookChange, BookOperation},
  document::BookListDoc,
  store::{AsyncDocumentStore, BookProjector, DocumentStore},
};

/// Applies a change list using a projector over the primary store and an
/// optional document store.
pub struct ProjectionSync<'a, P, D> {
  projector: &'a P,
  documents: Option<&'a D>,
}

impl<'a, P, D> ProjectionSync<'a, P, D> {
  /// A `None` document store makes every pass a no-op.
  pub fn new(projector: &'a P, documents: Option<&'a D>) -> Self {
    Self { projector, documents }
  }

  /// The store to write to, or `None` when there is nothing to do.
  fn target(&self, changes: &[BookChange]) -> Option<&'a D> {
    let Some(documents) = self.documents else {
      debug!("no document store configured, skipping book list sync");
      return None;
    };
    if changes.is_empty() {
      return None;
    }
    Some(documents)
  }
}

impl<P: BookProjector, D> ProjectionSync<'_, P, D> {
  fn project(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    self
      .projector
      .project_book(book_id)
      .map_err(|e| Error::Projection(Box::new(e)))
  }
}

fn store_error<E: std::error::Error + Send + Sync + 'static>(e: E) -> Error {
  Error::DocumentStore(Box::new(e))
}

/// A refresh found nothing to project, e.g. the book is soft-deleted.
fn invisible(book_id: BookId, had_document: bool) {
  if had_document {
    warn!(%book_id, "book not visible in primary store, dropped its document");
  } else {
    debug!(%book_id, "book not visible in primary store, nothing to write");
  }
}

// ─── Blocking ────────────────────────────────────────────────────────────────

impl<P: BookProjector, D: DocumentStore> ProjectionSync<'_, P, D> {
  /// Apply every change in order. Returns `false` when no store is configured
  /// or `changes` is empty, `true` once every change has been applied.
  pub fn apply(&self, changes: &[BookChange]) -> Result<bool> {
    let Some(documents) = self.target(changes) else {
      return Ok(false);
    };

    for change in changes {
      debug!(book_id = %change.book_id, operation = %change.operation, "syncing book");
      let existing = documents.find(change.book_id).map_err(store_error)?;

      match change.operation {
        BookOperation::Deleted => {
          if let Some(doc) = existing {
            documents.remove(doc).map_err(store_error)?;
          }
        }
        BookOperation::Added | BookOperation::Modified => {
          let fresh = self.project(change.book_id)?;
          let had_document = existing.is_some();
          if let Some(doc) = existing {
            documents.remove(doc).map_err(store_error)?;
          }
          match fresh {
            Some(doc) => documents.add(doc).map_err(store_error)?,
            None => invisible(change.book_id, had_document),
          }
        }
      }
    }

    info!(changes = changes.len(), "book list synchronized");
    Ok(true)
  }
}

// ─── Async ───────────────────────────────────────────────────────────────────

impl<P: BookProjector, D: AsyncDocumentStore> ProjectionSync<'_, P, D> {
  /// Same as [`apply`](Self::apply), yielding only at document-store I/O.
  pub async fn apply_async(&self, changes: &[BookChange]) -> Result<bool> {
    let Some(documents) = self.target(changes) else {
      return Ok(false);
    };

    for change in changes {
      debug!(book_id = %change.book_id, operation = %change.operation, "syncing book");
      let existing = documents
        .find_async(change.book_id)
        .await
        .map_err(store_error)?;

      match change.operation {
        BookOperation::Deleted => {
          if let Some(doc) = existing {
            documents.remove_async(doc).await.map_err(store_error)?;
          }
        }
        BookOperation::Added | BookOperation::Modified => {
          let fresh = self.project(change.book_id)?;
          let had_document = existing.is_some();
          if let Some(doc) = existing {
            documents.remove_async(doc).await.map_err(store_error)?;
          }
          match fresh {
            Some(doc) => documents.add_async(doc).await.map_err(store_error)?,
            None => invisible(change.book_id, had_document),
          }
        }
      }
    }

    info!(changes = changes.len(), "book list synchronized");
    Ok(true)
  }
}

#[cfg(test)]
mod tests {
  use std::{collections::HashMap, convert::Infallible};

  use chrono::NaiveDate;

  use super::*;
  use crate::memory::MemoryDocumentStore;

  /// A primary store that already knows every book's projection.
  #[derive(Default)]
  struct FixedProjector {
    books: HashMap<BookId, BookListDoc>,
  }

  impl FixedProjector {
    fn with(docs: impl IntoIterator<Item = BookListDoc>) -> Self {
      Self { books: docs.into_iter().map(|d| (d.book_id, d)).collect() }
    }
  }

  impl BookProjector for FixedProjector {
    type Error = Infallible;

    fn project_book(&self, book_id: BookId) -> Result<Option<BookListDoc>, Infallible> {
      Ok(self.books.get(&book_id).cloned())
    }
  }

  /// Projects one book and fails for every other.
  struct OneBookProjector(BookListDoc);

  impl BookProjector for OneBookProjector {
    type Error = Error;

    fn project_book(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
      if book_id == self.0.book_id { Ok(Some(self.0.clone())) } else { Err(Error::Poisoned) }
    }
  }

  /// A document store whose every call fails.
  struct BrokenStore;

  impl DocumentStore for BrokenStore {
    type Error = Error;

    fn find(&self, _: BookId) -> Result<Option<BookListDoc>> { Err(Error::Poisoned) }

    fn add(&self, _: BookListDoc) -> Result<()> { Err(Error::Poisoned) }

    fn remove(&self, _: BookListDoc) -> Result<()> { Err(Error::Poisoned) }

    fn save_changes(&self) -> Result<()> { Err(Error::Poisoned) }
  }

  fn doc(title: &str) -> BookListDoc {
    BookListDoc {
      book_id:               BookId::generate(),
      title:                 title.into(),
      published_on:          NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
      org_price:             10.0,
      actual_price:          10.0,
      promotional_text:      None,
      authors_ordered:       "Someone".into(),
      reviews_count:         0,
      reviews_average_votes: None,
    }
  }

  fn apply(
    projector: &FixedProjector,
    store: &MemoryDocumentStore,
    changes: &[BookChange],
  ) -> bool {
    let synced = ProjectionSync::new(projector, Some(store)).apply(changes).unwrap();
    store.save_changes().unwrap();
    synced
  }

  #[test]
  fn empty_change_list_is_a_no_op() {
    let store = MemoryDocumentStore::new();
    let projector = FixedProjector::default();
    assert!(!apply(&projector, &store, &[]));
    assert!(store.is_empty());
  }

  #[test]
  fn missing_document_store_is_a_no_op() {
    let book = doc("Unsynced");
    let projector = FixedProjector::with([book.clone()]);
    let sync = ProjectionSync::<_, MemoryDocumentStore>::new(&projector, None);

    let synced = sync
      .apply(&[BookChange::new(book.book_id, BookOperation::Added)])
      .unwrap();
    assert!(!synced);
  }

  #[test]
  fn added_book_is_inserted() {
    let book = doc("New");
    let projector = FixedProjector::with([book.clone()]);
    let store = MemoryDocumentStore::new();

    assert!(apply(&projector, &store, &[BookChange::new(book.book_id, BookOperation::Added)]));
    assert_eq!(store.get(book.book_id), Some(book));
  }

  #[test]
  fn added_over_a_stale_document_replaces_it() {
    let book = doc("Fresh");
    let store = MemoryDocumentStore::new();
    store.add(BookListDoc { title: "Stale".into(), ..book.clone() }).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::with([book.clone()]);
    apply(&projector, &store, &[BookChange::new(book.book_id, BookOperation::Added)]);

    assert_eq!(store.len(), 1);
    assert_eq!(store.get(book.book_id).unwrap().title, "Fresh");
  }

  #[test]
  fn modified_book_is_refreshed() {
    let book = doc("Before");
    let store = MemoryDocumentStore::new();
    store.add(book.clone()).unwrap();
    store.save_changes().unwrap();

    let after = BookListDoc { title: "After".into(), reviews_count: 1, ..book.clone() };
    let projector = FixedProjector::with([after.clone()]);
    apply(&projector, &store, &[BookChange::new(book.book_id, BookOperation::Modified)]);

    assert_eq!(store.get(book.book_id), Some(after));
  }

  #[test]
  fn modified_book_without_a_document_is_inserted() {
    let book = doc("Never synced");
    let projector = FixedProjector::with([book.clone()]);
    let store = MemoryDocumentStore::new();

    apply(&projector, &store, &[BookChange::new(book.book_id, BookOperation::Modified)]);
    assert_eq!(store.get(book.book_id), Some(book));
  }

  #[test]
  fn deleting_twice_is_harmless() {
    let book = doc("Doomed");
    let store = MemoryDocumentStore::new();
    store.add(book.clone()).unwrap();
    store.save_changes().unwrap();
    let projector = FixedProjector::default();
    let changes = [BookChange::new(book.book_id, BookOperation::Deleted)];

    assert!(apply(&projector, &store, &changes));
    assert!(store.get(book.book_id).is_none());

    assert!(apply(&projector, &store, &changes));
    assert!(store.get(book.book_id).is_none());
  }

  #[test]
  fn invisible_book_loses_its_document() {
    let book = doc("Hidden");
    let store = MemoryDocumentStore::new();
    store.add(book.clone()).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::default();
    apply(&projector, &store, &[BookChange::new(book.book_id, BookOperation::Modified)]);
    assert!(store.is_empty());
  }

  #[test]
  fn invisible_book_without_a_document_is_a_no_op() {
    let store = MemoryDocumentStore::new();
    let projector = FixedProjector::default();
    let id = BookId::generate();

    assert!(apply(&projector, &store, &[BookChange::new(id, BookOperation::Modified)]));
    assert!(store.is_empty());
    assert!(!store.has_pending());
  }

  #[test]
  fn projection_failure_leaves_earlier_writes_staged() {
    let (good, bad) = (doc("Good"), doc("Bad"));
    let store = MemoryDocumentStore::new();
    let projector = OneBookProjector(good.clone());

    let result = ProjectionSync::new(&projector, Some(&store)).apply(&[
      BookChange::new(good.book_id, BookOperation::Added),
      BookChange::new(bad.book_id, BookOperation::Added),
    ]);
    assert!(matches!(result, Err(Error::Projection(_))));
    assert!(store.has_pending());

    store.discard().unwrap();
    store.save_changes().unwrap();
    assert!(store.is_empty());
  }

  #[test]
  fn every_change_in_the_list_is_applied() {
    let (a, b, c) = (doc("A"), doc("B"), doc("C"));
    let store = MemoryDocumentStore::new();
    store.add(c.clone()).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::with([a.clone(), b.clone()]);
    apply(&projector, &store, &[
      BookChange::new(a.book_id, BookOperation::Added),
      BookChange::new(b.book_id, BookOperation::Modified),
      BookChange::new(c.book_id, BookOperation::Deleted),
    ]);

    let titles: Vec<_> = store.documents().into_iter().map(|d| d.title).collect();
    assert_eq!(titles.len(), 2);
    assert!(titles.contains(&"A".to_string()));
    assert!(titles.contains(&"B".to_string()));
  }

  #[test]
  fn store_failure_is_propagated() {
    let book = doc("Unlucky");
    let projector = FixedProjector::with([book.clone()]);
    let result = ProjectionSync::new(&projector, Some(&BrokenStore))
      .apply(&[BookChange::new(book.book_id, BookOperation::Added)]);
    assert!(matches!(result, Err(Error::DocumentStore(_))));
  }

  #[tokio::test]
  async fn async_pass_matches_blocking_pass() {
    let (kept, gone) = (doc("Kept"), doc("Gone"));
    let store = MemoryDocumentStore::new();
    store.add(gone.clone()).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::with([kept.clone()]);
    let synced = ProjectionSync::new(&projector, Some(&store))
      .apply_async(&[
        BookChange::new(kept.book_id, BookOperation::Added),
        BookChange::new(gone.book_id, BookOperation::Deleted),
      ])
      .await
      .unwrap();
    store.save_changes_async().await.unwrap();

    assert!(synced);
    assert_eq!(store.documents(), vec![kept]);
  }

  async fn apply_async(
    projector: &FixedProjector,
    store: &MemoryDocumentStore,
    changes: &[BookChange],
  ) -> bool {
    let synced = ProjectionSync::new(projector, Some(store))
      .apply_async(changes)
      .await
      .unwrap();
    store.save_changes_async().await.unwrap();
    synced
  }

  #[tokio::test]
  async fn async_modified_book_is_refreshed() {
    let book = doc("Before");
    let store = MemoryDocumentStore::new();
    store.add(book.clone()).unwrap();
    store.save_changes().unwrap();

    let after = BookListDoc { title: "After".into(), reviews_count: 2, ..book.clone() };
    let projector = FixedProjector::with([after.clone()]);
    let changes = [BookChange::new(book.book_id, BookOperation::Modified)];

    assert!(apply_async(&projector, &store, &changes).await);
    assert_eq!(store.documents(), vec![after]);
  }

  #[tokio::test]
  async fn async_modified_book_without_a_document_is_inserted() {
    let book = doc("Never synced");
    let projector = FixedProjector::with([book.clone()]);
    let store = MemoryDocumentStore::new();
    let changes = [BookChange::new(book.book_id, BookOperation::Modified)];

    assert!(apply_async(&projector, &store, &changes).await);
    assert_eq!(store.get(book.book_id), Some(book));
  }

  #[tokio::test]
  async fn async_added_over_a_stale_document_replaces_it() {
    let book = doc("Fresh");
    let store = MemoryDocumentStore::new();
    store.add(BookListDoc { title: "Stale".into(), ..book.clone() }).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::with([book.clone()]);
    let changes = [BookChange::new(book.book_id, BookOperation::Added)];

    assert!(apply_async(&projector, &store, &changes).await);
    assert_eq!(store.len(), 1);
    assert_eq!(store.get(book.book_id).unwrap().title, "Fresh");
  }

  #[tokio::test]
  async fn async_invisible_book_loses_its_document() {
    let book = doc("Hidden");
    let store = MemoryDocumentStore::new();
    store.add(book.clone()).unwrap();
    store.save_changes().unwrap();

    let projector = FixedProjector::default();
    let changes = [BookChange::new(book.book_id, BookOperation::Modified)];

    assert!(apply_async(&projector, &store, &changes).await);
    assert!(store.is_empty());
  }

  #[tokio::test]
  async fn async_pass_with_nothing_to_do() {
    let store = MemoryDocumentStore::new();
    let projector = FixedProjector::default();
    let synced = ProjectionSync::new(&projector, Some(&store))
      .apply_async(&[])
      .await
      .unwrap();
    assert!(!synced);
  }
}
