//! The mutation-intent log a unit of work fills in as it writes.
//!
//! Every write to a book-related row is recorded here as an explicit
//! `(entity, kind)` pair. The log keeps one entry per entity identity and
//! folds repeated writes to the same entity into a single net intent, so the
//! detector sees exactly what the commit will change.

use std::{collections::BTreeMap, fmt};

use serde::{Deserialize, Serialize};

use crate::{
  Error, Result,
  book::{AuthorId, BookId, PromotionId, ReviewId},
};

// ─── Mutation kind ───────────────────────────────────────────────────────────

/// What the unit of work is doing to an entity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum MutationKind {
  Unchanged,
  Added,
  /// A field assignment. `soft_deleted` carries the entity's soft-delete flag
  /// as it stands after the write; only books read it.
  Modified { soft_deleted: bool },
  Deleted,
}

impl MutationKind {
  /// A plain field update.
  pub const MODIFIED: Self = Self::Modified { soft_deleted: false };
}

// ─── Entity reference ────────────────────────────────────────────────────────

/// A tracked entity together with the navigation data the detector needs to
/// find the book(s) it belongs to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "snake_case")]
pub enum EntityRef {
  Book {
    book_id: BookId,
  },
  Review {
    review_id: ReviewId,
    book_id:   BookId,
  },
  Promotion {
    promotion_id: PromotionId,
    book_id:      BookId,
  },
  AuthorLink {
    book_id:   BookId,
    author_id: AuthorId,
    order:     u8,
  },
  Author {
    author_id:    AuthorId,
    /// Every book linked to this author when the write was recorded.
    linked_books: Vec<BookId>,
  },
  /// A row in the primary store that no book depends on.
  Unrelated {
    kind: String,
    key:  String,
  },
}

impl EntityRef {
  /// The identity this entity is tracked under.
  pub fn key(&self) -> EntityKey {
    match self {
      Self::Book { book_id } => EntityKey::Book(*book_id),
      Self::Review { review_id, .. } => EntityKey::Review(*review_id),
      Self::Promotion { promotion_id, .. } => EntityKey::Promotion(*promotion_id),
      Self::AuthorLink { book_id, author_id, .. } => {
        EntityKey::AuthorLink(*book_id, *author_id)
      }
      Self::Author { author_id, .. } => EntityKey::Author(*author_id),
      Self::Unrelated { kind, key } => EntityKey::Unrelated(kind.clone(), key.clone()),
    }
  }

  /// Fold a later reference to the same entity into this one.
  fn absorb(&mut self, newer: EntityRef) {
    match (self, newer) {
      (
        Self::Author { linked_books, .. },
        Self::Author { linked_books: more, .. },
      ) => {
        linked_books.extend(more);
        linked_books.sort();
        linked_books.dedup();
      }
      (this, newer) => *this = newer,
    }
  }
}

/// Identity of a tracked entity.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
  Book(BookId),
  Review(ReviewId),
  Promotion(PromotionId),
  AuthorLink(BookId, AuthorId),
  Author(AuthorId),
  Unrelated(String, String),
}

impl fmt::Display for EntityKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      Self::Book(id) => write!(f, "book {id}"),
      Self::Review(id) => write!(f, "review {id}"),
      Self::Promotion(id) => write!(f, "promotion {id}"),
      Self::AuthorLink(book, author) => write!(f, "author link {book}/{author}"),
      Self::Author(id) => write!(f, "author {id}"),
      Self::Unrelated(kind, key) => write!(f, "{kind} {key}"),
    }
  }
}

/// One row of a tracked-entity snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackedEntity {
  pub entity: EntityRef,
  pub kind:   MutationKind,
}

impl TrackedEntity {
  pub fn new(entity: EntityRef, kind: MutationKind) -> Self { Self { entity, kind } }
}

// ─── Change log ──────────────────────────────────────────────────────────────

/// Registry from entity identity to its net pending mutation.
#[derive(Debug, Clone, Default)]
pub struct ChangeLog {
  entries: BTreeMap<EntityKey, TrackedEntity>,
}

enum Transition {
  Keep(MutationKind),
  /// Added then deleted: the row never reaches the store.
  Drop,
  Invalid,
}

fn transition(from: MutationKind, to: MutationKind) -> Transition {
  use MutationKind::*;
  match (from, to) {
    (from, Unchanged) => Transition::Keep(from),
    (Unchanged, to) => Transition::Keep(to),
    (Added, Modified { .. }) => Transition::Keep(Added),
    (Added, Deleted) => Transition::Drop,
    (Modified { .. }, to @ Modified { .. }) => Transition::Keep(to),
    (Modified { .. }, Deleted) => Transition::Keep(Deleted),
    // The row is replaced by a new one under the same key.
    (Deleted, Added) => Transition::Keep(MutationKind::MODIFIED),
    (Added, Added) | (Modified { .. }, Added) => Transition::Invalid,
    (Deleted, Modified { .. }) | (Deleted, Deleted) => Transition::Invalid,
  }
}

impl ChangeLog {
  pub fn new() -> Self { Self::default() }

  /// Record a write. Repeated writes to one entity collapse into its net
  /// effect; a sequence that cannot happen to a real row is an error.
  pub fn record(&mut self, entity: EntityRef, kind: MutationKind) -> Result<()> {
    let key = entity.key();
    let from = match self.entries.get(&key) {
      Some(existing) => existing.kind,
      None => {
        self.entries.insert(key, TrackedEntity::new(entity, kind));
        return Ok(());
      }
    };

    match transition(from, kind) {
      Transition::Keep(kind) => {
        if let Some(existing) = self.entries.get_mut(&key) {
          existing.kind = kind;
          existing.entity.absorb(entity);
        }
        Ok(())
      }
      Transition::Drop => {
        self.entries.remove(&key);
        Ok(())
      }
      Transition::Invalid => Err(Error::InvalidTransition { entity: key, from, to: kind }),
    }
  }

  /// Net pending mutation for an entity, if it is tracked.
  pub fn get(&self, key: &EntityKey) -> Option<&TrackedEntity> { self.entries.get(key) }

  /// Tracked entities in key order.
  pub fn entries(&self) -> impl Iterator<Item = &TrackedEntity> { self.entries.values() }

  /// Copy of the tracked set, independent of later writes.
  pub fn snapshot(&self) -> Vec<TrackedEntity> { self.entries().cloned().collect() }

  pub fn len(&self) -> usize { self.entries.len() }

  pub fn is_empty(&self) -> bool { self.entries.is_empty() }
}
