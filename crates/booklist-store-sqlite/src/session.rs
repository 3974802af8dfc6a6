//! [`Session`]: one unit of work against the primary store.
//!
//! Every write runs inside a single SQLite transaction and is recorded in a
//! [`ChangeLog`] at the point it is made. Saving detects which books changed,
//! brings their book-list documents up to date, flushes the document store
//! and only then commits. Any failure on the way drops the transaction, so
//! the primary store is left untouched; document writes already flushed are
//! not undone.

use booklist_core::{
  book::{AuthorId, Book, BookId, NewBook, PromotionId, Review, ReviewId},
  change::{self, BookChange},
  document::BookListDoc,
  store::{AsyncDocumentStore, BookProjector, DocumentStore},
  sync::ProjectionSync,
  tracking::{ChangeLog, EntityRef, MutationKind, TrackedEntity},
};
use chrono::NaiveDate;
use rusqlite::{OptionalExtension as _, Transaction};
use tracing::{debug, info};

use crate::{
  Error, Result,
  encode::{encode_book_id, encode_date},
  query,
};

/// The outcome of [`Session::save_changes`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SaveReport {
  /// One entry per book whose document needed work.
  pub changes: Vec<BookChange>,
  /// `false` when no document store was configured or nothing changed.
  pub synced:  bool,
}

/// A unit of work. Obtain one from [`SqlBookStore::begin`](crate::SqlBookStore::begin).
pub struct Session<'c> {
  tx:  Transaction<'c>,
  log: ChangeLog,
}

impl<'c> Session<'c> {
  pub(crate) fn new(tx: Transaction<'c>) -> Self { Self { tx, log: ChangeLog::new() } }

  // ── Tracking ──────────────────────────────────────────────────────────────

  /// Snapshot of everything this session has written so far.
  pub fn tracked_entities(&self) -> Vec<TrackedEntity> { self.log.snapshot() }

  /// The book changes saving now would apply.
  pub fn find_book_changes(&self) -> Result<Vec<BookChange>> {
    Ok(change::find_book_changes(self.log.entries())?)
  }

  // ── Reads (see pending writes) ────────────────────────────────────────────

  pub fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
    query::get_book(&self.tx, book_id)
  }

  fn require_book(&self, book_id: BookId) -> Result<()> {
    query::soft_deleted(&self.tx, book_id)?
      .map(|_| ())
      .ok_or(Error::BookNotFound(book_id))
  }

  fn record(&mut self, entity: EntityRef, kind: MutationKind) -> Result<()> {
    Ok(self.log.record(entity, kind)?)
  }

  /// Record a field update on a book, carrying its current soft-delete flag.
  fn touch_book(&mut self, book_id: BookId) -> Result<()> {
    let soft_deleted =
      query::soft_deleted(&self.tx, book_id)?.ok_or(Error::BookNotFound(book_id))?;
    self.record(EntityRef::Book { book_id }, MutationKind::Modified { soft_deleted })
  }

  // ── Books ─────────────────────────────────────────────────────────────────

  /// Create a book, reusing existing authors with matching names.
  pub fn add_book(&mut self, book: NewBook) -> Result<BookId> {
    let book_id = BookId::generate();

    self.tx.execute(
      "INSERT INTO books (
         book_id, title, description, published_on,
         publisher, price, image_url, soft_deleted
       ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 0)",
      rusqlite::params![
        encode_book_id(book_id),
        book.title,
        book.description,
        encode_date(book.published_on),
        book.publisher,
        book.price,
        book.image_url,
      ],
    )?;
    self.record(EntityRef::Book { book_id }, MutationKind::Added)?;

    for (position, name) in book.authors.iter().enumerate() {
      let order = u8::try_from(position).map_err(|_| Error::TooManyAuthors)?;
      let author_id = match query::find_author_by_name(&self.tx, name)? {
        Some(author) => author.author_id,
        None => self.add_author(name)?,
      };
      self.link_author(book_id, author_id, order)?;
    }

    debug!(%book_id, title = %book.title, "added book");
    Ok(book_id)
  }

  /// Hard-delete a book. Its reviews, promotion and author links go with it.
  pub fn remove_book(&mut self, book_id: BookId) -> Result<()> {
    self.require_book(book_id)?;

    for review in query::reviews_for(&self.tx, book_id)? {
      self.record(
        EntityRef::Review { review_id: review.review_id, book_id },
        MutationKind::Deleted,
      )?;
    }
    if let Some(promotion) = query::promotion_for(&self.tx, book_id)? {
      self.record(
        EntityRef::Promotion { promotion_id: promotion.promotion_id, book_id },
        MutationKind::Deleted,
      )?;
    }
    for link in query::author_links(&self.tx, book_id)? {
      self.record(
        EntityRef::AuthorLink { book_id, author_id: link.author_id, order: link.order },
        MutationKind::Deleted,
      )?;
    }

    self.tx.execute(
      "DELETE FROM books WHERE book_id = ?1",
      rusqlite::params![encode_book_id(book_id)],
    )?;
    self.record(EntityRef::Book { book_id }, MutationKind::Deleted)?;

    debug!(%book_id, "removed book");
    Ok(())
  }

  /// Set or clear a book's soft-delete flag.
  pub fn set_soft_deleted(&mut self, book_id: BookId, soft_deleted: bool) -> Result<()> {
    let updated = self.tx.execute(
      "UPDATE books SET soft_deleted = ?2 WHERE book_id = ?1",
      rusqlite::params![encode_book_id(book_id), soft_deleted],
    )?;
    if updated == 0 {
      return Err(Error::BookNotFound(book_id));
    }
    self.record(EntityRef::Book { book_id }, MutationKind::Modified { soft_deleted })
  }

  pub fn update_published_on(&mut self, book_id: BookId, published_on: NaiveDate) -> Result<()> {
    let updated = self.tx.execute(
      "UPDATE books SET published_on = ?2 WHERE book_id = ?1",
      rusqlite::params![encode_book_id(book_id), encode_date(published_on)],
    )?;
    if updated == 0 {
      return Err(Error::BookNotFound(book_id));
    }
    self.touch_book(book_id)
  }

  pub fn update_price(&mut self, book_id: BookId, price: f64) -> Result<()> {
    let updated = self.tx.execute(
      "UPDATE books SET price = ?2 WHERE book_id = ?1",
      rusqlite::params![encode_book_id(book_id), price],
    )?;
    if updated == 0 {
      return Err(Error::BookNotFound(book_id));
    }
    self.touch_book(book_id)
  }

  // ── Authors ───────────────────────────────────────────────────────────────

  /// Create an author that is not linked to any book yet.
  pub fn add_author(&mut self, name: &str) -> Result<AuthorId> {
    self
      .tx
      .execute("INSERT INTO authors (name) VALUES (?1)", rusqlite::params![name])?;
    let author_id = AuthorId(self.tx.last_insert_rowid());
    self.record(
      EntityRef::Author { author_id, linked_books: vec![] },
      MutationKind::Added,
    )?;
    Ok(author_id)
  }

  /// Rename an author. Every book listing the author needs a new document.
  pub fn rename_author(&mut self, author_id: AuthorId, name: &str) -> Result<()> {
    let updated = self.tx.execute(
      "UPDATE authors SET name = ?2 WHERE author_id = ?1",
      rusqlite::params![author_id.0, name],
    )?;
    if updated == 0 {
      return Err(Error::AuthorNotFound(author_id));
    }

    let linked_books = query::books_for_author(&self.tx, author_id)?;
    debug!(%author_id, books = linked_books.len(), "renamed author");
    self.record(EntityRef::Author { author_id, linked_books }, MutationKind::MODIFIED)
  }

  /// List an author on a book at the given 0-based position.
  pub fn link_author(&mut self, book_id: BookId, author_id: AuthorId, order: u8) -> Result<()> {
    self.require_book(book_id)?;
    if query::get_author(&self.tx, author_id)?.is_none() {
      return Err(Error::AuthorNotFound(author_id));
    }

    self.tx.execute(
      "INSERT INTO book_authors (book_id, author_id, ord) VALUES (?1, ?2, ?3)",
      rusqlite::params![encode_book_id(book_id), author_id.0, order],
    )?;
    self.record(EntityRef::AuthorLink { book_id, author_id, order }, MutationKind::Added)
  }

  pub fn unlink_author(&mut self, book_id: BookId, author_id: AuthorId) -> Result<()> {
    let order: u8 = self
      .tx
      .query_row(
        "SELECT ord FROM book_authors WHERE book_id = ?1 AND author_id = ?2",
        rusqlite::params![encode_book_id(book_id), author_id.0],
        |row| row.get(0),
      )
      .optional()?
      .ok_or(Error::LinkNotFound { book: book_id, author: author_id })?;

    self.tx.execute(
      "DELETE FROM book_authors WHERE book_id = ?1 AND author_id = ?2",
      rusqlite::params![encode_book_id(book_id), author_id.0],
    )?;
    self.record(EntityRef::AuthorLink { book_id, author_id, order }, MutationKind::Deleted)
  }

  // ── Reviews ───────────────────────────────────────────────────────────────

  pub fn add_review(
    &mut self,
    book_id: BookId,
    num_stars: u8,
    comment: Option<&str>,
    voter_name: &str,
  ) -> Result<ReviewId> {
    let num_stars = Review::validate_stars(num_stars)?;
    self.require_book(book_id)?;

    self.tx.execute(
      "INSERT INTO reviews (book_id, num_stars, comment, voter_name) VALUES (?1, ?2, ?3, ?4)",
      rusqlite::params![encode_book_id(book_id), num_stars, comment, voter_name],
    )?;
    let review_id = ReviewId(self.tx.last_insert_rowid());
    self.record(EntityRef::Review { review_id, book_id }, MutationKind::Added)?;
    Ok(review_id)
  }

  pub fn remove_review(&mut self, review_id: ReviewId) -> Result<()> {
    let review =
      query::get_review(&self.tx, review_id)?.ok_or(Error::ReviewNotFound(review_id))?;

    self.tx.execute(
      "DELETE FROM reviews WHERE review_id = ?1",
      rusqlite::params![review_id.0],
    )?;
    self.record(
      EntityRef::Review { review_id, book_id: review.book_id },
      MutationKind::Deleted,
    )
  }

  // ── Promotions ────────────────────────────────────────────────────────────

  /// Put a book on promotion, replacing any promotion it already has.
  pub fn add_promotion(
    &mut self,
    book_id: BookId,
    new_price: f64,
    promotional_text: &str,
  ) -> Result<PromotionId> {
    self.require_book(book_id)?;

    if let Some(existing) = query::promotion_for(&self.tx, book_id)? {
      self.tx.execute(
        "UPDATE promotions SET new_price = ?2, promotional_text = ?3 WHERE promotion_id = ?1",
        rusqlite::params![existing.promotion_id.0, new_price, promotional_text],
      )?;
      self.record(
        EntityRef::Promotion { promotion_id: existing.promotion_id, book_id },
        MutationKind::MODIFIED,
      )?;
      return Ok(existing.promotion_id);
    }

    self.tx.execute(
      "INSERT INTO promotions (book_id, new_price, promotional_text) VALUES (?1, ?2, ?3)",
      rusqlite::params![encode_book_id(book_id), new_price, promotional_text],
    )?;
    let promotion_id = PromotionId(self.tx.last_insert_rowid());
    self.record(EntityRef::Promotion { promotion_id, book_id }, MutationKind::Added)?;
    Ok(promotion_id)
  }

  pub fn remove_promotion(&mut self, book_id: BookId) -> Result<()> {
    let promotion =
      query::promotion_for(&self.tx, book_id)?.ok_or(Error::PromotionNotFound(book_id))?;

    self.tx.execute(
      "DELETE FROM promotions WHERE promotion_id = ?1",
      rusqlite::params![promotion.promotion_id.0],
    )?;
    self.record(
      EntityRef::Promotion { promotion_id: promotion.promotion_id, book_id },
      MutationKind::Deleted,
    )
  }

  // ── Completion ────────────────────────────────────────────────────────────

  /// Detect changes, sync them to `documents`, flush it and commit.
  ///
  /// On error nothing is flushed, but a staging document store may still
  /// hold writes from the failed pass. Call its `discard` before reusing it.
  pub fn save_changes<D: DocumentStore>(self, documents: Option<&D>) -> Result<SaveReport> {
    let changes = self.find_book_changes()?;
    let synced = ProjectionSync::new(&self, documents).apply(&changes)?;
    if synced && let Some(documents) = documents {
      documents
        .save_changes()
        .map_err(|e| Error::Documents(Box::new(e)))?;
    }
    self.commit(changes, synced)
  }

  /// [`save_changes`](Self::save_changes) against an async document store.
  pub async fn save_changes_async<D: AsyncDocumentStore>(
    self,
    documents: Option<&D>,
  ) -> Result<SaveReport> {
    let changes = self.find_book_changes()?;
    let synced = ProjectionSync::new(&self, documents)
      .apply_async(&changes)
      .await?;
    if synced && let Some(documents) = documents {
      documents
        .save_changes_async()
        .await
        .map_err(|e| Error::Documents(Box::new(e)))?;
    }
    self.commit(changes, synced)
  }

  /// Roll back every write made in this session.
  pub fn discard(self) -> Result<()> {
    self.tx.rollback()?;
    Ok(())
  }

  fn commit(self, changes: Vec<BookChange>, synced: bool) -> Result<SaveReport> {
    self.tx.commit()?;
    info!(changes = changes.len(), synced, "saved unit of work");
    Ok(SaveReport { changes, synced })
  }
}

impl BookProjector for Session<'_> {
  type Error = Error;

  fn project_book(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    query::project_book(&self.tx, book_id)
  }
}
