//! The normalized book aggregate: books, their authors, reviews and
//! promotions.

use std::{fmt, str::FromStr};

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{Error, Result};

// ─── Identifiers ─────────────────────────────────────────────────────────────

/// Identity of a book aggregate. Assigned at creation, never reused.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct BookId(Uuid);

impl BookId {
  /// A fresh random identifier.
  pub fn generate() -> Self { Self(Uuid::new_v4()) }

  pub fn from_uuid(id: Uuid) -> Self { Self(id) }

  pub fn as_uuid(&self) -> Uuid { self.0 }
}

impl fmt::Display for BookId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    self.0.hyphenated().fmt(f)
  }
}

impl FromStr for BookId {
  type Err = uuid::Error;

  fn from_str(s: &str) -> Result<Self, Self::Err> { Ok(Self(Uuid::parse_str(s)?)) }
}

/// Row id of an author.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AuthorId(pub i64);

/// Row id of a review.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct ReviewId(pub i64);

/// Row id of a promotion.
#[derive(
  Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct PromotionId(pub i64);

impl fmt::Display for AuthorId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for ReviewId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

impl fmt::Display for PromotionId {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result { self.0.fmt(f) }
}

// ─── Entities ────────────────────────────────────────────────────────────────

/// The aggregate root.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Book {
  pub book_id:      BookId,
  pub title:        String,
  pub description:  Option<String>,
  pub published_on: NaiveDate,
  pub publisher:    Option<String>,
  pub price:        f64,
  pub image_url:    Option<String>,
  /// Hidden from every read path while set; propagates like a hard delete.
  pub soft_deleted: bool,
}

/// An author. One author may be linked to many books.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
  pub author_id: AuthorId,
  pub name:      String,
}

/// The join row between a book and one of its authors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct BookAuthor {
  pub book_id:   BookId,
  pub author_id: AuthorId,
  /// Position of the author in the book's author list, starting at 0.
  pub order:     u8,
}

/// A reader's review of a book.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Review {
  pub review_id:  ReviewId,
  pub book_id:    BookId,
  pub num_stars:  u8,
  pub comment:    Option<String>,
  pub voter_name: String,
}

impl Review {
  pub const MAX_STARS: u8 = 5;

  /// Reject star counts outside `0..=5`.
  pub fn validate_stars(num_stars: u8) -> Result<u8> {
    if num_stars > Self::MAX_STARS {
      return Err(Error::InvalidStars(num_stars));
    }
    Ok(num_stars)
  }
}

/// A temporary price override. A book has at most one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Promotion {
  pub promotion_id:     PromotionId,
  pub book_id:          BookId,
  pub new_price:        f64,
  pub promotional_text: String,
}

// ─── NewBook ─────────────────────────────────────────────────────────────────

/// Input for creating a book. Authors are given by name, in display order;
/// the store reuses an existing author with the same name.
#[derive(Debug, Clone)]
pub struct NewBook {
  pub title:        String,
  pub description:  Option<String>,
  pub published_on: NaiveDate,
  pub publisher:    Option<String>,
  pub price:        f64,
  pub image_url:    Option<String>,
  pub authors:      Vec<String>,
}

impl NewBook {
  /// Convenience constructor with all optional fields left empty.
  pub fn new(
    title: impl Into<String>,
    published_on: NaiveDate,
    price: f64,
    authors: impl IntoIterator<Item = impl Into<String>>,
  ) -> Self {
    Self {
      title: title.into(),
      description: None,
      published_on,
      publisher: None,
      price,
      image_url: None,
      authors: authors.into_iter().map(Into::into).collect(),
    }
  }
}
