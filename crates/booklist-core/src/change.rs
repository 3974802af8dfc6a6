//! Change detection: tracked entities in, one change per affected book out.
//!
//! Each tracked entity is classified by its role relative to a book, then the
//! results are merged into a map keyed by book id. `Added` and `Deleted` are
//! terminal for a key, so a child edit bundled into the same commit never
//! turns a created or removed book into a plain refresh.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  book::BookId,
  tracking::{EntityRef, MutationKind, TrackedEntity},
};

// ─── Operation ───────────────────────────────────────────────────────────────

/// What must happen to a book's document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BookOperation {
  Added,
  Modified,
  Deleted,
}

impl BookOperation {
  /// `Deleted` > `Added` > `Modified`. A refresh never overrides either
  /// terminal operation.
  fn precedence(self) -> u8 {
    match self {
      Self::Modified => 0,
      Self::Added => 1,
      Self::Deleted => 2,
    }
  }
}

impl fmt::Display for BookOperation {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(match self {
      Self::Added => "added",
      Self::Modified => "modified",
      Self::Deleted => "deleted",
    })
  }
}

/// The operation a book's own mutation implies. A soft delete arrives as a
/// field assignment and is reclassified as a deletion.
impl TryFrom<MutationKind> for BookOperation {
  type Error = Error;

  fn try_from(kind: MutationKind) -> Result<Self> {
    match kind {
      MutationKind::Added => Ok(Self::Added),
      MutationKind::Modified { soft_deleted: true } => Ok(Self::Deleted),
      MutationKind::Modified { soft_deleted: false } => Ok(Self::Modified),
      MutationKind::Deleted => Ok(Self::Deleted),
      MutationKind::Unchanged => Err(Error::Unclassifiable(kind)),
    }
  }
}

/// One detector output row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct BookChange {
  pub book_id:   BookId,
  pub operation: BookOperation,
}

impl BookChange {
  pub fn new(book_id: BookId, operation: BookOperation) -> Self {
    Self { book_id, operation }
  }
}

// ─── Merge ───────────────────────────────────────────────────────────────────

/// Combine a newly classified operation with whatever is already recorded
/// for the same book.
///
/// A terminal operation is never replaced by `Modified`. Should two terminal
/// operations meet, `Deleted` wins, which keeps the merge commutative.
pub fn merge(existing: Option<BookOperation>, incoming: BookOperation) -> BookOperation {
  match existing {
    Some(existing) if existing.precedence() >= incoming.precedence() => existing,
    _ => incoming,
  }
}

// ─── Detection ───────────────────────────────────────────────────────────────

/// Derive the deduplicated list of book changes for one commit.
///
/// The result holds at most one change per book and is sorted by book id; it
/// does not depend on the order of `tracked`. An empty input gives an empty
/// list. `Unchanged` entries are skipped before classification, so for a
/// well-formed log this never returns [`Error::Unclassifiable`]; that error
/// only surfaces through [`BookOperation::try_from`].
pub fn find_book_changes<'a, I>(tracked: I) -> Result<Vec<BookChange>>
where
  I: IntoIterator<Item = &'a TrackedEntity>,
{
  let mut changes: BTreeMap<BookId, BookOperation> = BTreeMap::new();

  for entry in tracked {
    for (book_id, operation) in classify(entry)? {
      changes
        .entry(book_id)
        .and_modify(|existing| *existing = merge(Some(*existing), operation))
        .or_insert(operation);
    }
  }

  Ok(
    changes
      .into_iter()
      .map(|(book_id, operation)| BookChange { book_id, operation })
      .collect(),
  )
}

/// The books an entity's mutation touches, and how.
fn classify(entry: &TrackedEntity) -> Result<Vec<(BookId, BookOperation)>> {
  if entry.kind == MutationKind::Unchanged {
    return Ok(vec![]);
  }

  let touched = match &entry.entity {
    EntityRef::Book { book_id } => vec![(*book_id, BookOperation::try_from(entry.kind)?)],

    // Children and links only ever refresh the book they belong to.
    EntityRef::Review { book_id, .. }
    | EntityRef::Promotion { book_id, .. }
    | EntityRef::AuthorLink { book_id, .. } => vec![(*book_id, BookOperation::Modified)],

    EntityRef::Author { linked_books, .. } => linked_books
      .iter()
      .map(|book_id| (*book_id, BookOperation::Modified))
      .collect(),

    EntityRef::Unrelated { .. } => vec![],
  };

  Ok(touched)
}
