//! booklist command-line binary.
//!
//! Reads `booklist.toml` (or the path given with `--config`) plus
//! `BOOKLIST_*` environment variables, opens the SQL book store and, when
//! `nosql_path` is set, the book-list document store. Every mutating command
//! is one unit of work whose changes are pushed into the book list on save.

use std::path::{Path, PathBuf};

use anyhow::Context as _;
use booklist_core::{
  book::{BookId, NewBook},
  document::BookListDoc,
  store::BookProjector,
};
use booklist_store_sqlite::{Session, SqlBookStore, SqliteDocumentStore, seed::seed_four_books};
use chrono::NaiveDate;
use clap::{Parser, Subcommand};
use serde::Deserialize;
use tracing::{info, level_filters::LevelFilter};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(author, version, about = "Book list maintenance")]
struct Cli {
  /// Path to the TOML configuration file.
  #[arg(short, long, default_value = "booklist.toml")]
  config: PathBuf,

  #[command(subcommand)]
  command: Command,
}

#[derive(Subcommand)]
enum Command {
  /// Add the four demo books.
  Seed,
  /// Print the book list.
  List,
  /// Add a book, creating authors that do not exist yet.
  AddBook {
    title:        String,
    /// YYYY-MM-DD
    published_on: NaiveDate,
    price:        f64,
    #[arg(required = true)]
    authors:      Vec<String>,
  },
  /// Permanently delete a book with its reviews and promotion.
  DeleteBook { id: BookId },
  /// Hide a book from the list, or show it again with `--restore`.
  SoftDelete {
    id:      BookId,
    #[arg(long)]
    restore: bool,
  },
  /// Rename an author, refreshing every book they are listed on.
  RenameAuthor { name: String, new_name: String },
  AddReview {
    id:      BookId,
    stars:   u8,
    voter:   String,
    #[arg(long)]
    comment: Option<String>,
  },
}

/// Settings layered from the config file and the environment.
#[derive(Debug, Clone, Deserialize)]
struct CliConfig {
  /// The normalized SQL store.
  sql_path:   PathBuf,
  /// The book-list document store. Unset means changes are not synced.
  #[serde(default)]
  nosql_path: Option<PathBuf>,
}

impl CliConfig {
  fn load(path: &Path) -> anyhow::Result<Self> {
    config::Config::builder()
      .set_default("sql_path", "booklist.db")?
      .add_source(config::File::from(path).required(false))
      .add_source(config::Environment::with_prefix("BOOKLIST"))
      .build()
      .context("failed to read config file")?
      .try_deserialize()
      .context("failed to deserialise CliConfig")
  }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
  tracing_subscriber::fmt()
    .with_env_filter(
      EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy(),
    )
    .init();

  let cli = Cli::parse();
  let cfg = CliConfig::load(&cli.config)?;

  let sql_path = expand_tilde(&cfg.sql_path);
  let mut store = SqlBookStore::open(&sql_path)
    .with_context(|| format!("failed to open book store at {sql_path:?}"))?;

  let documents = match &cfg.nosql_path {
    Some(path) => {
      let path = expand_tilde(path);
      let documents = SqliteDocumentStore::open(&path)
        .await
        .with_context(|| format!("failed to open book list at {path:?}"))?;
      Some(documents)
    }
    None => {
      info!("nosql_path not set, book list will not be updated");
      None
    }
  };

  match cli.command {
    Command::Seed => {
      let mut session = store.begin()?;
      seed_four_books(&mut session).context("failed to seed books")?;
      save(session, documents.as_ref()).await?;
    }
    Command::List => match &documents {
      Some(documents) => {
        for doc in documents.all().await? {
          print_doc(&doc);
        }
      }
      None => {
        for book_id in store.list_book_ids()? {
          if let Some(doc) = store.project_book(book_id)? {
            print_doc(&doc);
          }
        }
      }
    },
    Command::AddBook { title, published_on, price, authors } => {
      let mut session = store.begin()?;
      let book_id = session.add_book(NewBook::new(title, published_on, price, authors))?;
      println!("{book_id}");
      save(session, documents.as_ref()).await?;
    }
    Command::DeleteBook { id } => {
      let mut session = store.begin()?;
      session.remove_book(id)?;
      save(session, documents.as_ref()).await?;
    }
    Command::SoftDelete { id, restore } => {
      let mut session = store.begin()?;
      session.set_soft_deleted(id, !restore)?;
      save(session, documents.as_ref()).await?;
    }
    Command::RenameAuthor { name, new_name } => {
      let author = store
        .find_author_by_name(&name)?
        .with_context(|| format!("no author named {name:?}"))?;
      let mut session = store.begin()?;
      session.rename_author(author.author_id, &new_name)?;
      save(session, documents.as_ref()).await?;
    }
    Command::AddReview { id, stars, voter, comment } => {
      let mut session = store.begin()?;
      session.add_review(id, stars, comment.as_deref(), &voter)?;
      save(session, documents.as_ref()).await?;
    }
  }

  Ok(())
}

/// Commit a session and print the book changes it produced.
async fn save(session: Session<'_>, documents: Option<&SqliteDocumentStore>) -> anyhow::Result<()> {
  let report = session
    .save_changes_async(documents)
    .await
    .context("failed to save changes")?;

  for change in &report.changes {
    println!("{:<8} {}", change.operation, change.book_id);
  }
  Ok(())
}

fn print_doc(doc: &BookListDoc) {
  let votes = doc
    .reviews_average_votes
    .map(|avg| format!("{avg:.1}"))
    .unwrap_or_else(|| "-".into());
  println!(
    "{}  {} by {}  ${:.2}  ({} reviews, avg {votes})",
    doc.book_id, doc.title, doc.authors_ordered, doc.actual_price, doc.reviews_count,
  );
  if let Some(text) = &doc.promotional_text {
    println!("    {text}");
  }
}

/// Expand a leading `~` to the user's home directory.
fn expand_tilde(path: &Path) -> PathBuf {
  let s = path.to_string_lossy();
  if let Some(rest) = s.strip_prefix("~/")
    && let Ok(home) = std::env::var("HOME")
  {
    return PathBuf::from(home).join(rest);
  }
  path.to_path_buf()
}

#[cfg(test)]
mod tests {
  use super::*;

  #[test]
  fn missing_config_file_falls_back_to_defaults() {
    let path = std::env::temp_dir().join(format!("booklist-{}.toml", uuid::Uuid::new_v4()));
    let cfg = CliConfig::load(&path).unwrap();
    assert_eq!(cfg.sql_path, PathBuf::from("booklist.db"));
    assert!(cfg.nosql_path.is_none());
  }

  #[test]
  fn config_file_sets_both_stores() {
    let path = std::env::temp_dir().join(format!("booklist-{}.toml", uuid::Uuid::new_v4()));
    std::fs::write(&path, "sql_path = \"books.db\"\nnosql_path = \"list.db\"\n").unwrap();

    let cfg = CliConfig::load(&path).unwrap();
    std::fs::remove_file(&path).ok();

    assert_eq!(cfg.sql_path, PathBuf::from("books.db"));
    assert_eq!(cfg.nosql_path, Some(PathBuf::from("list.db")));
  }

  #[test]
  fn tilde_is_expanded_only_at_the_start() {
    assert_eq!(expand_tilde(Path::new("/tmp/x.db")), PathBuf::from("/tmp/x.db"));
    assert_eq!(expand_tilde(Path::new("a/~/b")), PathBuf::from("a/~/b"));
  }

  #[test]
  fn commands_parse() {
    let cli = Cli::try_parse_from([
      "booklist",
      "soft-delete",
      "--restore",
      "67e55044-10b1-426f-9247-bb680e5fe0c8",
    ])
    .unwrap();
    assert!(matches!(cli.command, Command::SoftDelete { restore: true, .. }));

    let cli =
      Cli::try_parse_from(["booklist", "add-book", "Dune", "1965-08-01", "9.99", "Frank Herbert"])
        .unwrap();
    assert!(matches!(cli.command, Command::AddBook { ref authors, .. } if authors.len() == 1));

    assert!(Cli::try_parse_from(["booklist", "delete-book", "not-a-uuid"]).is_err());
  }
}
