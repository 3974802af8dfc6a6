//! The denormalized book-list document.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::book::BookId;

/// Read-optimized summary of one book, keyed by the same id as the book.
///
/// Never edited in place: it is rebuilt from the normalized aggregate
/// whenever that aggregate changes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookListDoc {
  pub book_id:               BookId,
  pub title:                 String,
  pub published_on:          NaiveDate,
  /// List price before any promotion.
  pub org_price:             f64,
  /// Promotion price when one is active, otherwise the list price.
  pub actual_price:          f64,
  pub promotional_text:      Option<String>,
  /// Author names in link order, joined with `", "`.
  pub authors_ordered:       String,
  pub reviews_count:         u32,
  /// `None` when the book has no reviews.
  pub reviews_average_votes: Option<f64>,
}

impl BookListDoc {
  /// Author names in link order.
  pub fn authors(&self) -> impl Iterator<Item = &str> {
    self.authors_ordered.split(", ").filter(|name| !name.is_empty())
  }

  /// True when a promotion is lowering the price.
  pub fn is_promoted(&self) -> bool { self.promotional_text.is_some() }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn doc(authors: &str) -> BookListDoc {
    BookListDoc {
      book_id:               BookId::generate(),
      title:                 "Refactoring".into(),
      published_on:          NaiveDate::from_ymd_opt(1999, 7, 8).unwrap(),
      org_price:             40.0,
      actual_price:          40.0,
      promotional_text:      None,
      authors_ordered:       authors.into(),
      reviews_count:         0,
      reviews_average_votes: None,
    }
  }

  #[test]
  fn authors_without_names_is_empty() {
    assert_eq!(doc("").authors().count(), 0);
    assert_eq!(doc("Martin Fowler").authors().collect::<Vec<_>>(), ["Martin Fowler"]);
  }

  #[test]
  fn serializes_with_iso_dates_and_plain_ids() {
    let d = doc("Martin Fowler, Kent Beck");
    let json = serde_json::to_value(&d).unwrap();

    assert_eq!(json["published_on"], "1999-07-08");
    assert_eq!(json["book_id"], d.book_id.to_string());
    assert!(json["reviews_average_votes"].is_null());

    let back: BookListDoc = serde_json::from_value(json).unwrap();
    assert_eq!(back, d);
  }
}
