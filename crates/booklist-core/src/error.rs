//! Error types for `booklist-core`.

use thiserror::Error;

use crate::{book::BookId, tracking::{EntityKey, MutationKind}};

#[derive(Debug, Error)]
pub enum Error {
  #[error("{entity} cannot move from {from:?} to {to:?} within one unit of work")]
  InvalidTransition {
    entity: EntityKey,
    from:   MutationKind,
    to:     MutationKind,
  },

  /// A tracked mutation has no book operation. Always an upstream bug.
  #[error("mutation kind {0:?} does not map to a book operation")]
  Unclassifiable(MutationKind),

  #[error("review stars must be between 0 and 5, got {0}")]
  InvalidStars(u8),

  #[error("a document already exists for book {0}")]
  DuplicateDocument(BookId),

  #[error("no document exists for book {0}")]
  DocumentNotFound(BookId),

  #[error("document store lock poisoned")]
  Poisoned,

  #[error("projection error: {0}")]
  Projection(#[source] Box<dyn std::error::Error + Send + Sync>),

  #[error("document store error: {0}")]
  DocumentStore(#[source] Box<dyn std::error::Error + Send + Sync>),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
