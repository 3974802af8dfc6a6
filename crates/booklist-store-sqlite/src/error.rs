//! Error type for `booklist-store-sqlite`.

use booklist_core::book::{AuthorId, BookId, ReviewId};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum Error {
  #[error("core error: {0}")]
  Core(#[from] booklist_core::Error),

  #[error("database error: {0}")]
  Database(#[from] rusqlite::Error),

  #[error("document database error: {0}")]
  DocumentDatabase(#[from] tokio_rusqlite::Error),

  #[error("json error: {0}")]
  Json(#[from] serde_json::Error),

  #[error("uuid parse error: {0}")]
  Uuid(#[from] uuid::Error),

  #[error("date parse error: {0}")]
  DateParse(String),

  #[error("book not found: {0}")]
  BookNotFound(BookId),

  #[error("author not found: {0}")]
  AuthorNotFound(AuthorId),

  #[error("review not found: {0}")]
  ReviewNotFound(ReviewId),

  #[error("book {0} has no promotion")]
  PromotionNotFound(BookId),

  #[error("author {author} is not linked to book {book}")]
  LinkNotFound { book: BookId, author: AuthorId },

  #[error("a book can list at most 256 authors")]
  TooManyAuthors,

  #[error("document store error: {0}")]
  Documents(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
