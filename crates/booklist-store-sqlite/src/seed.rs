//! Canned data for demos and tests.

use booklist_core::book::{BookId, NewBook};
use chrono::NaiveDate;

use crate::{Result, Session};

fn date(year: i32, month: u32, day: u32) -> NaiveDate {
  NaiveDate::from_ymd_opt(year, month, day).unwrap_or_default()
}

/// Add the four demo books. The last one has two five-star reviews and a
/// promotion. Returns the book ids in insertion order.
pub fn seed_four_books(session: &mut Session<'_>) -> Result<Vec<BookId>> {
  let refactoring = session.add_book(NewBook {
    description: Some("Improving the design of existing code".into()),
    ..NewBook::new("Refactoring", date(1999, 7, 8), 40.0, ["Martin Fowler"])
  })?;
  let patterns = session.add_book(NewBook {
    description: Some("Written in direct response to the stiff challenges".into()),
    ..NewBook::new(
      "Patterns of Enterprise Application Architecture",
      date(2002, 11, 15),
      53.0,
      ["Martin Fowler"],
    )
  })?;
  let ddd = session.add_book(NewBook {
    description: Some("Linking business needs to software design".into()),
    ..NewBook::new("Domain-Driven Design", date(2003, 8, 30), 56.0, ["Eric Evans"])
  })?;
  let quantum = session.add_book(NewBook {
    description: Some("Entangled quantum networking".into()),
    publisher: Some("Future Published".into()),
    ..NewBook::new("Quantum Networking", date(2057, 1, 1), 220.0, ["Future Person"])
  })?;

  session.add_review(
    quantum,
    5,
    Some("I look forward to reading this book, if I am still alive!"),
    "Jon P Smith",
  )?;
  session.add_review(
    quantum,
    5,
    Some("I write this book if I was still alive!"),
    "Albert Einstein",
  )?;
  session.add_promotion(quantum, 219.0, "Save $1 if you order 40 years ahead!")?;

  Ok(vec![refactoring, patterns, ddd, quantum])
}

/// A single-author book titled "Test Book".
pub fn dummy_book_one_author() -> NewBook {
  NewBook::new("Test Book", date(2015, 1, 1), 10.0, ["Test Author"])
}

/// `count` books, each with its own author plus "CommonAuthor".
pub fn dummy_books(count: usize) -> Vec<NewBook> {
  (0..count)
    .map(|i| {
      let day = u32::try_from(i % 28).unwrap_or_default() + 1;
      NewBook::new(
        format!("Book{i:04} Title"),
        date(2010, 1, day),
        f64::from(u32::try_from(i % 100).unwrap_or_default()) + 10.0,
        [format!("Author{i:04}"), "CommonAuthor".to_string()],
      )
    })
    .collect()
}
