//! Pasta bowl: directory-backed storage for pastes.
//!
//! A pasta is a small metadata record (id, owner token, name, MIME type,
//! expiry) plus a payload of arbitrary bytes. The bowl keeps one directory
//! per pasta under a configured root and hands out streaming handles for the
//! payload. It is the storage layer only: expiry is recorded but never
//! enforced, and tokens are stored but never checked.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use std::io::{Read, Write};
//! use pastabowl::{Bowl, BowlConfig, Pasta, PastaStore};
//!
//! // Create from environment (reads PASTABOWL_PATH)
//! let config = BowlConfig::from_env().unwrap();
//! let bowl = Bowl::new(config).unwrap();
//!
//! // Or at a specific path
//! let bowl = Bowl::at_path("/srv/pasta/bowl").unwrap();
//!
//! // Insert: id and token are generated and written back into `pasta`
//! let mut pasta = Pasta::new("notes.txt", "text/plain");
//! bowl.insert_pasta(&mut pasta).unwrap();
//! println!("Stored as {} (token {})", pasta.id, pasta.token);
//!
//! // Stream the payload in; close() publishes it
//! let mut writer = bowl.pasta_writer(&pasta.id).unwrap();
//! writer.write_all(b"Hello, World!").unwrap();
//! writer.close().unwrap();
//!
//! // And back out
//! let mut body = String::new();
//! bowl.pasta_reader(&pasta.id).unwrap().read_to_string(&mut body).unwrap();
//!
//! // Missing pastas come back empty rather than as an error
//! assert!(!bowl.get_pasta("nope").unwrap().is_found());
//! ```
//!
//! # Configuration
//!
//! Environment variables:
//! - `PASTABOWL_PATH`: Root directory (default: `~/.pastabowl/pastas`)
//! - `PASTABOWL_READONLY`: Set to "true" for read-only mode
//! - `PASTABOWL_ID_LENGTH` / `PASTABOWL_TOKEN_LENGTH`: Generated lengths
//!
//! # Concurrency
//!
//! All operations are blocking filesystem calls with no internal locking:
//! - Generated ids are claimed with an atomic `create_dir`, so concurrent
//!   inserts never share one
//! - Deletes rename the pasta away before removing it
//! - Payloads are published by rename when a writer is closed, so readers
//!   see the old payload or the new one, never a mix

pub mod config;
pub mod error;
pub mod ident;
pub mod pasta;
pub mod store;
pub mod stream;

// Re-exports for convenience
pub use config::BowlConfig;
pub use error::{BowlError, Result};
pub use ident::{generate_id, generate_token, is_valid_id};
pub use pasta::Pasta;
pub use store::{Bowl, PastaStore};
pub use stream::{PastaReader, PastaWriter};
