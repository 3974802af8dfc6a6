//! [`SqliteDocumentStore`]: the book list kept as JSON documents in SQLite.

use std::path::Path;

use booklist_core::{book::BookId, document::BookListDoc, store::AsyncDocumentStore};
use rusqlite::OptionalExtension as _;

use crate::{
  Error, Result,
  encode::{decode_doc, encode_book_id, encode_doc},
  schema::DOCUMENT_SCHEMA,
};

/// A document store holding one JSON row per visible book.
///
/// Writes are durable as soon as each call returns, so
/// `save_changes_async` has nothing left to flush. Cloning is cheap and
/// clones share the connection.
#[derive(Clone)]
pub struct SqliteDocumentStore {
  conn: tokio_rusqlite::Connection,
}

impl SqliteDocumentStore {
  pub async fn open(path: impl AsRef<Path>) -> Result<Self> {
    Self::init(tokio_rusqlite::Connection::open(path).await?).await
  }

  pub async fn open_in_memory() -> Result<Self> {
    Self::init(tokio_rusqlite::Connection::open_in_memory().await?).await
  }

  async fn init(conn: tokio_rusqlite::Connection) -> Result<Self> {
    conn
      .call(|conn| {
        conn.execute_batch(DOCUMENT_SCHEMA)?;
        Ok(())
      })
      .await?;
    Ok(Self { conn })
  }

  /// Every document, ordered by title.
  pub async fn all(&self) -> Result<Vec<BookListDoc>> {
    let raws: Vec<String> = self
      .conn
      .call(|conn| {
        let mut stmt = conn.prepare("SELECT doc_json FROM book_list ORDER BY title, book_id")?;
        let rows = stmt
          .query_map([], |row| row.get::<_, String>(0))?
          .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
      })
      .await?;

    raws.iter().map(|s| decode_doc(s)).collect()
  }

  pub async fn len(&self) -> Result<usize> {
    let count: i64 = self
      .conn
      .call(|conn| Ok(conn.query_row("SELECT COUNT(*) FROM book_list", [], |row| row.get(0))?))
      .await?;
    Ok(usize::try_from(count).unwrap_or_default())
  }
}

impl AsyncDocumentStore for SqliteDocumentStore {
  type Error = Error;

  async fn find_async(&self, book_id: BookId) -> Result<Option<BookListDoc>> {
    let id_str = encode_book_id(book_id);

    let raw: Option<String> = self
      .conn
      .call(move |conn| {
        Ok(
          conn
            .query_row(
              "SELECT doc_json FROM book_list WHERE book_id = ?1",
              rusqlite::params![id_str],
              |row| row.get(0),
            )
            .optional()?,
        )
      })
      .await?;

    raw.as_deref().map(decode_doc).transpose()
  }

  async fn add_async(&self, doc: BookListDoc) -> Result<()> {
    let id_str = encode_book_id(doc.book_id);
    let json = encode_doc(&doc)?;
    let title = doc.title;

    self
      .conn
      .call(move |conn| {
        conn.execute(
          "INSERT INTO book_list (book_id, title, doc_json) VALUES (?1, ?2, ?3)",
          rusqlite::params![id_str, title, json],
        )?;
        Ok(())
      })
      .await?;
    Ok(())
  }

  async fn remove_async(&self, doc: BookListDoc) -> Result<()> {
    let id_str = encode_book_id(doc.book_id);

    let removed = self
      .conn
      .call(move |conn| {
        Ok(conn.execute("DELETE FROM book_list WHERE book_id = ?1", rusqlite::params![id_str])?)
      })
      .await?;

    if removed == 0 {
      return Err(booklist_core::Error::DocumentNotFound(doc.book_id).into());
    }
    Ok(())
  }

  async fn save_changes_async(&self) -> Result<()> { Ok(()) }
}
