//! Encoding and decoding helpers between domain types and SQLite columns.
//!
//! Book ids are stored as hyphenated lowercase UUID strings and dates as
//! `YYYY-MM-DD`. Documents are stored as compact JSON.

use booklist_core::{
  book::{Author, AuthorId, Book, BookId, Promotion, PromotionId, Review, ReviewId},
  document::BookListDoc,
};
use chrono::NaiveDate;

use crate::{Error, Result};

// ─── BookId ──────────────────────────────────────────────────────────────────

pub fn encode_book_id(id: BookId) -> String { id.to_string() }

pub fn decode_book_id(s: &str) -> Result<BookId> { Ok(s.parse()?) }

// ─── NaiveDate ───────────────────────────────────────────────────────────────

const DATE_FORMAT: &str = "%Y-%m-%d";

pub fn encode_date(date: NaiveDate) -> String { date.format(DATE_FORMAT).to_string() }

pub fn decode_date(s: &str) -> Result<NaiveDate> {
  NaiveDate::parse_from_str(s, DATE_FORMAT).map_err(|e| Error::DateParse(format!("{s:?}: {e}")))
}

// ─── Documents ───────────────────────────────────────────────────────────────

pub fn encode_doc(doc: &BookListDoc) -> Result<String> { Ok(serde_json::to_string(doc)?) }

pub fn decode_doc(s: &str) -> Result<BookListDoc> { Ok(serde_json::from_str(s)?) }

// ─── Raw rows ────────────────────────────────────────────────────────────────

/// A `books` row before parsing.
pub struct RawBook {
  pub book_id:      String,
  pub title:        String,
  pub description:  Option<String>,
  pub published_on: String,
  pub publisher:    Option<String>,
  pub price:        f64,
  pub image_url:    Option<String>,
  pub soft_deleted: bool,
}

impl RawBook {
  pub const COLUMNS: &'static str =
    "book_id, title, description, published_on, publisher, price, image_url, soft_deleted";

  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      book_id:      row.get(0)?,
      title:        row.get(1)?,
      description:  row.get(2)?,
      published_on: row.get(3)?,
      publisher:    row.get(4)?,
      price:        row.get(5)?,
      image_url:    row.get(6)?,
      soft_deleted: row.get(7)?,
    })
  }

  pub fn into_book(self) -> Result<Book> {
    Ok(Book {
      book_id:      decode_book_id(&self.book_id)?,
      title:        self.title,
      description:  self.description,
      published_on: decode_date(&self.published_on)?,
      publisher:    self.publisher,
      price:        self.price,
      image_url:    self.image_url,
      soft_deleted: self.soft_deleted,
    })
  }
}

pub fn author_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Author> {
  Ok(Author {
    author_id: AuthorId(row.get(0)?),
    name:      row.get(1)?,
  })
}

/// A `reviews` row before parsing.
pub struct RawReview {
  pub review_id:  i64,
  pub book_id:    String,
  pub num_stars:  u8,
  pub comment:    Option<String>,
  pub voter_name: String,
}

impl RawReview {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      review_id:  row.get(0)?,
      book_id:    row.get(1)?,
      num_stars:  row.get(2)?,
      comment:    row.get(3)?,
      voter_name: row.get(4)?,
    })
  }

  pub fn into_review(self) -> Result<Review> {
    Ok(Review {
      review_id:  ReviewId(self.review_id),
      book_id:    decode_book_id(&self.book_id)?,
      num_stars:  self.num_stars,
      comment:    self.comment,
      voter_name: self.voter_name,
    })
  }
}

/// A `promotions` row before parsing.
pub struct RawPromotion {
  pub promotion_id:     i64,
  pub book_id:          String,
  pub new_price:        f64,
  pub promotional_text: String,
}

impl RawPromotion {
  pub fn from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Self> {
    Ok(Self {
      promotion_id:     row.get(0)?,
      book_id:          row.get(1)?,
      new_price:        row.get(2)?,
      promotional_text: row.get(3)?,
    })
  }

  pub fn into_promotion(self) -> Result<Promotion> {
    Ok(Promotion {
      promotion_id:     PromotionId(self.promotion_id),
      book_id:          decode_book_id(&self.book_id)?,
      new_price:        self.new_price,
      promotional_text: self.promotional_text,
    })
  }
}
