//! [`SqlBookStore`], the normalized primary store.

use std::path::Path;

use booklist_core::{
  book::{Author, AuthorId, Book, BookAuthor, BookId, Promotion, Review},
  document::BookListDoc,
  store::BookProjector,
};

use crate::{Result, query, schema::SCHEMA, session::Session};

/// The book/author/review aggregate, backed by a single SQLite file.
pub struct SqlBookStore {
  conn: rusqlite::Connection,
}

impl SqlBookStore {
  /// Open (or create) a store at `path` and run schema initialisation.
  pub fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::init(rusqlite::Connection::open(path)?)
  }

  /// Open an in-memory store, mostly for tests.
  pub fn open_in_memory() -> Result<Self> { Self::init(rusqlite::Connection::open_in_memory()?) }

  fn init(conn: rusqlite::Connection) -> Result<Self> {
    conn.execute_batch(SCHEMA)?;
    Ok(Self { conn })
  }

  /// Start a unit of work. Dropping the session without saving rolls back.
  pub fn begin(&mut self) -> Result<Session<'_>> { Ok(Session::new(self.conn.transaction()?)) }

  // ── Reads ─────────────────────────────────────────────────────────────────

  /// A book by id, soft-deleted or not.
  pub fn get_book(&self, book_id: BookId) -> Result<Option<Book>> {
    query::get_book(&self.conn, book_id)
  }

  /// Ids of all books that are not soft-deleted, oldest first.
  pub fn list_book_ids(&self) -> Result<Vec<BookId>> { query::list_book_ids(&self.conn) }

  pub fn find_author_by_name(&self, name: &str) -> Result<Option<Author>> {
    query::find_author_by_name(&self.conn, name)
  }

  pub fn books_for_author(&self, author_id: AuthorId) -> Result<Vec<BookId>> {
    query::books_for_author(&self.conn, author_id)
  }

  /// Author links of a book, in display order.
  pub fn author_links(&self, book_id: BookId) -> Result<Vec<BookAuthor>> {
    query::author_links(&self.conn, book_id)
  }

  pub fn reviews_for(&self, book_id: BookId) -> Result<Vec<Review>> {
    query::reviews_for(&self.conn, book_id)
  }

  pub fn promotion_for(&self, book_id: BookId) -> Result<Option<Promotion>> {
    query::promotion_for(&self.conn, book_id)
  }
}

impl BookProjector for SqlBookStore {
  type Error = crate::Error;

  fn project_book(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    query::project_book(&self.conn, book_id)
  }
}
