//! SQL schemas for the primary store and the book-list document store.

/// Normalized book aggregate. Children cascade with their book.
pub const SCHEMA: &str = "
PRAGMA foreign_keys = ON;

CREATE TABLE IF NOT EXISTS books (
    book_id       TEXT PRIMARY KEY,
    title         TEXT NOT NULL,
    description   TEXT,
    published_on  TEXT NOT NULL,      -- YYYY-MM-DD
    publisher     TEXT,
    price         REAL NOT NULL,
    image_url     TEXT,
    soft_deleted  INTEGER NOT NULL DEFAULT 0
);

CREATE TABLE IF NOT EXISTS authors (
    author_id  INTEGER PRIMARY KEY AUTOINCREMENT,
    name       TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS book_authors (
    book_id    TEXT    NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    author_id  INTEGER NOT NULL REFERENCES authors(author_id),
    ord        INTEGER NOT NULL,  -- display position, 0-based
    PRIMARY KEY (book_id, author_id)
);

CREATE TABLE IF NOT EXISTS reviews (
    review_id   INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id     TEXT    NOT NULL REFERENCES books(book_id) ON DELETE CASCADE,
    num_stars   INTEGER NOT NULL CHECK (num_stars BETWEEN 0 AND 5),
    comment     TEXT,
    voter_name  TEXT    NOT NULL
);

-- At most one promotion per book.
CREATE TABLE IF NOT EXISTS promotions (
    promotion_id      INTEGER PRIMARY KEY AUTOINCREMENT,
    book_id           TEXT NOT NULL UNIQUE REFERENCES books(book_id) ON DELETE CASCADE,
    new_price         REAL NOT NULL,
    promotional_text  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS book_authors_author_idx ON book_authors(author_id);
CREATE INDEX IF NOT EXISTS reviews_book_idx        ON reviews(book_id);
CREATE INDEX IF NOT EXISTS authors_name_idx        ON authors(name);

PRAGMA user_version = 1;
";

/// One JSON document per visible book.
pub const DOCUMENT_SCHEMA: &str = "
PRAGMA journal_mode = WAL;

CREATE TABLE IF NOT EXISTS book_list (
    book_id   TEXT PRIMARY KEY,
    title     TEXT NOT NULL,
    doc_json  TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS book_list_title_idx ON book_list(title);

PRAGMA user_version = 1;
";
