//! Read queries shared by [`SqlBookStore`](crate::SqlBookStore) and
//! [`Session`](crate::Session).
//!
//! Everything here takes a plain `&Connection` so a session can run the same
//! reads inside its transaction and see its own pending writes.

use booklist_core::{
  book::{Author, AuthorId, Book, BookAuthor, BookId, Promotion, Review, ReviewId},
  document::BookListDoc,
};
use rusqlite::{Connection, OptionalExtension as _};

use crate::{
  Result,
  encode::{
    RawBook, RawPromotion, RawReview, author_from_row, decode_book_id, decode_date,
    encode_book_id,
  },
};

/// A book row, including soft-deleted ones.
pub fn get_book(conn: &Connection, book_id: BookId) -> Result<Option<Book>> {
  let raw = conn
    .query_row(
      &format!("SELECT {} FROM books WHERE book_id = ?1", RawBook::COLUMNS),
      rusqlite::params![encode_book_id(book_id)],
      RawBook::from_row,
    )
    .optional()?;
  raw.map(RawBook::into_book).transpose()
}

/// The soft-delete flag of a book, or `None` if the book does not exist.
pub fn soft_deleted(conn: &Connection, book_id: BookId) -> Result<Option<bool>> {
  Ok(
    conn
      .query_row(
        "SELECT soft_deleted FROM books WHERE book_id = ?1",
        rusqlite::params![encode_book_id(book_id)],
        |row| row.get(0),
      )
      .optional()?,
  )
}

/// Ids of every book that is not soft-deleted.
pub fn list_book_ids(conn: &Connection) -> Result<Vec<BookId>> {
  let mut stmt =
    conn.prepare("SELECT book_id FROM books WHERE soft_deleted = 0 ORDER BY published_on")?;
  let raws = stmt
    .query_map([], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.iter().map(|s| decode_book_id(s)).collect()
}

pub fn find_author_by_name(conn: &Connection, name: &str) -> Result<Option<Author>> {
  Ok(
    conn
      .query_row(
        "SELECT author_id, name FROM authors WHERE name = ?1 ORDER BY author_id LIMIT 1",
        rusqlite::params![name],
        author_from_row,
      )
      .optional()?,
  )
}

pub fn get_author(conn: &Connection, author_id: AuthorId) -> Result<Option<Author>> {
  Ok(
    conn
      .query_row(
        "SELECT author_id, name FROM authors WHERE author_id = ?1",
        rusqlite::params![author_id.0],
        author_from_row,
      )
      .optional()?,
  )
}

/// Every book linked to an author, soft-deleted ones included.
pub fn books_for_author(conn: &Connection, author_id: AuthorId) -> Result<Vec<BookId>> {
  let mut stmt = conn.prepare("SELECT book_id FROM book_authors WHERE author_id = ?1")?;
  let raws = stmt
    .query_map(rusqlite::params![author_id.0], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.iter().map(|s| decode_book_id(s)).collect()
}

/// The author links of a book, in display order.
pub fn author_links(conn: &Connection, book_id: BookId) -> Result<Vec<BookAuthor>> {
  let mut stmt =
    conn.prepare("SELECT author_id, ord FROM book_authors WHERE book_id = ?1 ORDER BY ord")?;
  let links = stmt
    .query_map(rusqlite::params![encode_book_id(book_id)], |row| {
      Ok(BookAuthor { book_id, author_id: AuthorId(row.get(0)?), order: row.get(1)? })
    })?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  Ok(links)
}

pub fn reviews_for(conn: &Connection, book_id: BookId) -> Result<Vec<Review>> {
  let mut stmt = conn.prepare(
    "SELECT review_id, book_id, num_stars, comment, voter_name
     FROM reviews WHERE book_id = ?1 ORDER BY review_id",
  )?;
  let raws = stmt
    .query_map(rusqlite::params![encode_book_id(book_id)], RawReview::from_row)?
    .collect::<rusqlite::Result<Vec<_>>>()?;
  raws.into_iter().map(RawReview::into_review).collect()
}

pub fn get_review(conn: &Connection, review_id: ReviewId) -> Result<Option<Review>> {
  let raw = conn
    .query_row(
      "SELECT review_id, book_id, num_stars, comment, voter_name
       FROM reviews WHERE review_id = ?1",
      rusqlite::params![review_id.0],
      RawReview::from_row,
    )
    .optional()?;
  raw.map(RawReview::into_review).transpose()
}

pub fn promotion_for(conn: &Connection, book_id: BookId) -> Result<Option<Promotion>> {
  let raw = conn
    .query_row(
      "SELECT promotion_id, book_id, new_price, promotional_text
       FROM promotions WHERE book_id = ?1",
      rusqlite::params![encode_book_id(book_id)],
      RawPromotion::from_row,
    )
    .optional()?;
  raw.map(RawPromotion::into_promotion).transpose()
}

// ─── Projection ──────────────────────────────────────────────────────────────

struct RawListRow {
  title:            String,
  published_on:     String,
  price:            f64,
  new_price:        Option<f64>,
  promotional_text: Option<String>,
  reviews_count:    u32,
  average_votes:    Option<f64>,
}

/// Build the book-list document for a book from its current rows.
/// Soft-deleted and missing books project to `None`.
pub fn project_book(conn: &Connection, book_id: BookId) -> Result<Option<BookListDoc>> {
  let id_str = encode_book_id(book_id);

  let raw: Option<RawListRow> = conn
    .query_row(
      "SELECT
         b.title, b.published_on, b.price,
         p.new_price, p.promotional_text,
         (SELECT COUNT(*)         FROM reviews r WHERE r.book_id = b.book_id),
         (SELECT AVG(r.num_stars) FROM reviews r WHERE r.book_id = b.book_id)
       FROM books b
       LEFT JOIN promotions p ON p.book_id = b.book_id
       WHERE b.book_id = ?1
         AND b.soft_deleted = 0",
      rusqlite::params![id_str],
      |row| {
        Ok(RawListRow {
          title:            row.get(0)?,
          published_on:     row.get(1)?,
          price:            row.get(2)?,
          new_price:        row.get(3)?,
          promotional_text: row.get(4)?,
          reviews_count:    row.get(5)?,
          average_votes:    row.get(6)?,
        })
      },
    )
    .optional()?;

  let Some(raw) = raw else {
    return Ok(None);
  };

  let mut stmt = conn.prepare(
    "SELECT a.name
     FROM book_authors ba
     JOIN authors a ON a.author_id = ba.author_id
     WHERE ba.book_id = ?1
     ORDER BY ba.ord",
  )?;
  let authors = stmt
    .query_map(rusqlite::params![id_str], |row| row.get::<_, String>(0))?
    .collect::<rusqlite::Result<Vec<_>>>()?;

  Ok(Some(BookListDoc {
    book_id,
    title: raw.title,
    published_on: decode_date(&raw.published_on)?,
    org_price: raw.price,
    actual_price: raw.new_price.unwrap_or(raw.price),
    promotional_text: raw.promotional_text,
    authors_ordered: authors.join(", "),
    reviews_count: raw.reviews_count,
    reviews_average_votes: raw.average_votes,
  }))
}
