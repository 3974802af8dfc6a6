//! In-memory document store for tests and single-process hosts.

use std::{
  collections::HashMap,
  sync::{Arc, RwLock},
};

use crate::{
  Error, Result,
  book::BookId,
  document::BookListDoc,
  store::{AsyncDocumentStore, DocumentStore},
};

#[derive(Debug, Default)]
struct Inner {
  committed: HashMap<BookId, BookListDoc>,
  /// Writes waiting for `save_changes`; `None` marks a removal.
  staged:    HashMap<BookId, Option<BookListDoc>>,
}

impl Inner {
  /// The document as the next flush would leave it.
  fn visible(&self, book_id: BookId) -> Option<&BookListDoc> {
    match self.staged.get(&book_id) {
      Some(staged) => staged.as_ref(),
      None => self.committed.get(&book_id),
    }
  }
}

/// A `HashMap`-backed document store with staged writes.
///
/// `find` sees staged writes; [`documents`](Self::documents) and
/// [`get`](Self::get) only see what has been flushed with `save_changes`.
/// Cloning is cheap and clones share state.
///
/// Once the lock is poisoned the [`DocumentStore`] methods fail with
/// [`Error::Poisoned`], while the inspection helpers (`get`, `documents`,
/// `len`, `has_pending`) read as an empty store.
#[derive(Debug, Clone, Default)]
pub struct MemoryDocumentStore {
  inner: Arc<RwLock<Inner>>,
}

impl MemoryDocumentStore {
  pub fn new() -> Self { Self::default() }

  fn read(&self) -> Result<std::sync::RwLockReadGuard<'_, Inner>> {
    self.inner.read().map_err(|_| Error::Poisoned)
  }

  fn write(&self) -> Result<std::sync::RwLockWriteGuard<'_, Inner>> {
    self.inner.write().map_err(|_| Error::Poisoned)
  }

  /// Flushed document for a book. `None` if the lock is poisoned.
  pub fn get(&self, book_id: BookId) -> Option<BookListDoc> {
    self
      .read()
      .ok()
      .and_then(|inner| inner.committed.get(&book_id).cloned())
  }

  /// All flushed documents, ordered by book id. Empty if the lock is poisoned.
  pub fn documents(&self) -> Vec<BookListDoc> {
    let Ok(inner) = self.read() else {
      return vec![];
    };
    let mut docs: Vec<_> = inner.committed.values().cloned().collect();
    docs.sort_by_key(|doc| doc.book_id);
    docs
  }

  /// Number of flushed documents, 0 if the lock is poisoned.
  pub fn len(&self) -> usize { self.read().map(|inner| inner.committed.len()).unwrap_or(0) }

  pub fn is_empty(&self) -> bool { self.len() == 0 }

  /// True while there are writes that have not been flushed. `false` if the
  /// lock is poisoned.
  pub fn has_pending(&self) -> bool {
    self.read().map(|inner| !inner.staged.is_empty()).unwrap_or(false)
  }

  /// Throw away unflushed writes.
  pub fn discard(&self) -> Result<()> {
    self.write()?.staged.clear();
    Ok(())
  }
}

impl DocumentStore for MemoryDocumentStore {
  type Error = Error;

  fn find(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    Ok(self.read()?.visible(book_id).cloned())
  }

  fn add(&self, doc: BookListDoc) -> Result<()> {
    let mut inner = self.write()?;
    if inner.visible(doc.book_id).is_some() {
      return Err(Error::DuplicateDocument(doc.book_id));
    }
    inner.staged.insert(doc.book_id, Some(doc));
    Ok(())
  }

  fn remove(&self, doc: BookListDoc) -> Result<()> {
    let mut inner = self.write()?;
    if inner.visible(doc.book_id).is_none() {
      return Err(Error::DocumentNotFound(doc.book_id));
    }
    inner.staged.insert(doc.book_id, None);
    Ok(())
  }

  fn save_changes(&self) -> Result<()> {
    let mut inner = self.write()?;
    let staged: Vec<_> = inner.staged.drain().collect();
    for (book_id, doc) in staged {
      match doc {
        Some(doc) => inner.committed.insert(book_id, doc),
        None => inner.committed.remove(&book_id),
      };
    }
    Ok(())
  }
}

impl AsyncDocumentStore for MemoryDocumentStore {
  type Error = Error;

  async fn find_async(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    self.find(book_id)
  }

  async fn add_async(&self, doc: BookListDoc) -> Result<()> { self.add(doc) }

  async fn remove_async(&self, doc: BookListDoc) -> Result<()> { self.remove(doc) }

  async fn save_changes_async(&self) -> Result<()> { self.save_changes() }
}
