//! Bowl: Filesystem-backed pasta storage.
//!
//! Implements the PastaStore trait with one directory per pasta.
//!
//! Layout:
//! ```text
//! {base_path}/
//! ├── Xk3p9QaB/
//! │   ├── pasta.json     # {id, token, name, mime, expire_date}
//! │   └── data           # raw payload bytes
//! ├── 7hTz2mWc/
//! │   ├── pasta.json
//! │   └── data
//! └── .trash-{uuid}/     # a pasta mid-deletion
//! ```
//!
//! Known limitation: insert is not transactional. If writing `pasta.json`
//! fails, the freshly created directory is left behind without metadata;
//! lookups and listings treat such a directory as absent, but its id stays
//! claimed, so inserting it again as a supplied id fails with
//! `DuplicateIdentifier`. An in-flight insert looks the same to a concurrent
//! listing.
//!
//! Leftover `.trash-*` directories (a delete whose removal failed) are swept
//! when a writable Bowl is opened. Abandoned `data.*.tmp` files from a crashed
//! writer are not swept, since another process may still be writing them.

use std::fs::{self, File};
use std::io::{self, Write};
use std::path::PathBuf;

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::BowlConfig;
use crate::error::{BowlError, IoContext, Result};
use crate::ident::{generate_id, generate_token, is_valid_id, MAX_ID_LENGTH};
use crate::pasta::{Pasta, METADATA_FILE, PAYLOAD_FILE};
use crate::stream::{sync_dir, PastaReader, PastaWriter};

/// How many generated ids to try before giving up on an insert.
pub const MAX_ID_ATTEMPTS: usize = 64;

const TRASH_PREFIX: &str = ".trash-";

/// Trait for pasta storage backends.
///
/// Operations are synchronous and take `&self`; implementations are shared
/// across threads without external locking.
pub trait PastaStore: Send + Sync {
    /// Persist a new pasta.
    ///
    /// An empty `id` or `token` is filled in with a generated value, and the
    /// caller sees the final values through `pasta`. A supplied `id` that is
    /// already taken fails with [`BowlError::DuplicateIdentifier`].
    fn insert_pasta(&self, pasta: &mut Pasta) -> Result<()>;

    /// Look up a pasta, returning `Ok(None)` if it doesn't exist.
    fn fetch_pasta(&self, id: &str) -> Result<Option<Pasta>>;

    /// Look up a pasta, returning `Pasta::default()` (empty `id`) if it
    /// doesn't exist.
    fn get_pasta(&self, id: &str) -> Result<Pasta> {
        Ok(self.fetch_pasta(id)?.unwrap_or_default())
    }

    /// Remove a pasta's metadata and payload. Removing a missing pasta is not
    /// an error.
    fn delete_pasta(&self, id: &str) -> Result<()>;

    /// Metadata of every stored pasta, in no particular order.
    fn list_pastas(&self) -> Result<Vec<Pasta>>;

    /// Open a writer that replaces the pasta's payload once closed.
    fn pasta_writer(&self, id: &str) -> Result<PastaWriter>;

    /// Open a reader over the pasta's committed payload.
    fn pasta_reader(&self, id: &str) -> Result<PastaReader>;
}

/// Filesystem-based pasta store.
#[derive(Debug, Clone)]
pub struct Bowl {
    config: BowlConfig,
}

impl Bowl {
    /// Create a new Bowl with the given configuration.
    ///
    /// Creates the root directory if it doesn't exist (unless in read-only
    /// mode).
    pub fn new(config: BowlConfig) -> Result<Self> {
        if config.id_length == 0 || config.token_length == 0 {
            return Err(BowlError::InvalidConfig(
                "id_length and token_length must be at least 1",
            ));
        }
        // Longer ids would be written but never found again.
        if config.id_length > MAX_ID_LENGTH {
            return Err(BowlError::InvalidConfig(
                "id_length must not exceed 128 characters",
            ));
        }

        if !config.read_only {
            fs::create_dir_all(&config.base_path).with_context(|| {
                format!(
                    "failed to create bowl directory {}",
                    config.base_path.display()
                )
            })?;
        }

        let bowl = Self { config };
        if !bowl.config.read_only {
            bowl.sweep_trash()?;
        }
        Ok(bowl)
    }

    /// Remove tombstones left behind by deletes that failed halfway.
    ///
    /// Returns the number of tombstones removed. A tombstone that another
    /// process removes first is not an error.
    pub fn sweep_trash(&self) -> Result<usize> {
        self.ensure_writable()?;

        let entries = fs::read_dir(&self.config.base_path)
            .context("failed to list bowl directory")?;

        let mut swept = 0;
        for entry in entries {
            let entry = entry.context("failed to list bowl directory")?;
            let is_trash = entry
                .file_name()
                .to_str()
                .is_some_and(|n| n.starts_with(TRASH_PREFIX));
            if !is_trash {
                continue;
            }

            match fs::remove_dir_all(entry.path()) {
                Ok(()) => swept += 1,
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => {
                    warn!(path = %entry.path().display(), error = %e, "failed to sweep tombstone");
                }
            }
        }

        if swept > 0 {
            info!(swept, "swept leftover tombstones");
        }
        Ok(swept)
    }

    /// Create a Bowl at a specific path.
    pub fn at_path(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(BowlConfig::with_base_path(path))
    }

    /// Create a read-only Bowl at a specific path.
    pub fn read_only_at(path: impl Into<PathBuf>) -> Result<Self> {
        Self::new(BowlConfig::read_only(path))
    }

    /// Get the configuration.
    pub fn config(&self) -> &BowlConfig {
        &self.config
    }

    /// Check if a pasta exists without decoding its metadata.
    pub fn exists(&self, id: &str) -> bool {
        is_valid_id(id) && self.metadata_path(id).is_file()
    }

    /// Size of the committed payload, or `None` if the pasta doesn't exist.
    pub fn payload_size(&self, id: &str) -> Result<Option<u64>> {
        if !self.exists(id) {
            return Ok(None);
        }
        match fs::metadata(self.payload_path(id)) {
            Ok(meta) => Ok(Some(meta.len())),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(BowlError::io(format!("failed to stat payload for pasta {id}"), e)),
        }
    }

    fn metadata_path(&self, id: &str) -> PathBuf {
        self.config.pasta_dir(id).join(METADATA_FILE)
    }

    fn payload_path(&self, id: &str) -> PathBuf {
        self.config.pasta_dir(id).join(PAYLOAD_FILE)
    }

    fn ensure_writable(&self) -> Result<()> {
        if self.config.read_only {
            return Err(BowlError::ReadOnly);
        }
        Ok(())
    }

    /// Claim a directory for `pasta`, generating an id if it has none.
    ///
    /// `create_dir` fails if the directory exists, so a successful call is
    /// the uniqueness check.
    fn claim_dir(&self, pasta: &mut Pasta) -> Result<()> {
        if !pasta.id.is_empty() {
            if !is_valid_id(&pasta.id) {
                return Err(BowlError::InvalidIdentifier(pasta.id.clone()));
            }
            return match fs::create_dir(self.config.pasta_dir(&pasta.id)) {
                Ok(()) => Ok(()),
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    Err(BowlError::DuplicateIdentifier(pasta.id.clone()))
                }
                Err(e) => Err(BowlError::io(
                    format!("failed to create directory for pasta {}", pasta.id),
                    e,
                )),
            };
        }

        for attempt in 1..=MAX_ID_ATTEMPTS {
            let candidate = generate_id(self.config.id_length);
            match fs::create_dir(self.config.pasta_dir(&candidate)) {
                Ok(()) => {
                    pasta.id = candidate;
                    return Ok(());
                }
                Err(e) if e.kind() == io::ErrorKind::AlreadyExists => {
                    debug!(id = %candidate, attempt, "generated pasta id taken, resampling");
                }
                Err(e) => {
                    return Err(BowlError::io(
                        format!("failed to create directory for pasta {candidate}"),
                        e,
                    ))
                }
            }
        }

        Err(BowlError::IdSpaceExhausted {
            attempts: MAX_ID_ATTEMPTS,
        })
    }

    /// Write metadata via a temp file + rename so readers never see a
    /// partial record.
    fn write_metadata(&self, pasta: &Pasta) -> Result<()> {
        let dir = self.config.pasta_dir(&pasta.id);
        let bytes = pasta.encode().map_err(|e| BowlError::CorruptRecord {
            id: pasta.id.clone(),
            source: e,
        })?;

        let temp_path = dir.join(format!("{METADATA_FILE}.tmp"));
        let mut file = File::create(&temp_path)
            .with_context(|| format!("failed to create metadata for pasta {}", pasta.id))?;
        file.write_all(&bytes)
            .and_then(|()| file.sync_all())
            .with_context(|| format!("failed to write metadata for pasta {}", pasta.id))?;
        drop(file);

        fs::rename(&temp_path, dir.join(METADATA_FILE))
            .with_context(|| format!("failed to write metadata for pasta {}", pasta.id))?;
        sync_dir(&dir)
    }
}

impl PastaStore for Bowl {
    fn insert_pasta(&self, pasta: &mut Pasta) -> Result<()> {
        self.ensure_writable()?;

        self.claim_dir(pasta)?;
        if pasta.token.is_empty() {
            pasta.token = generate_token(self.config.token_length);
        }

        self.write_metadata(pasta)?;
        File::create(self.payload_path(&pasta.id))
            .and_then(|file| file.sync_all())
            .with_context(|| format!("failed to create payload for pasta {}", pasta.id))?;
        sync_dir(&self.config.pasta_dir(&pasta.id))?;
        sync_dir(&self.config.base_path)?;

        info!(id = %pasta.id, mime = %pasta.mime, expire_date = pasta.expire_date, "pasta inserted");
        Ok(())
    }

    fn fetch_pasta(&self, id: &str) -> Result<Option<Pasta>> {
        if !is_valid_id(id) {
            debug!(id, "lookup with invalid pasta id");
            return Ok(None);
        }

        let bytes = match fs::read(self.metadata_path(id)) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => {
                return Err(BowlError::io(
                    format!("failed to read metadata for pasta {id}"),
                    e,
                ))
            }
        };

        let pasta = Pasta::decode(&bytes).map_err(|e| BowlError::CorruptRecord {
            id: id.to_string(),
            source: e,
        })?;
        Ok(Some(pasta))
    }

    fn delete_pasta(&self, id: &str) -> Result<()> {
        self.ensure_writable()?;

        if !is_valid_id(id) {
            debug!(id, "delete with invalid pasta id, nothing to do");
            return Ok(());
        }

        // Rename first so concurrent readers see the pasta whole or not at all.
        let trash = self
            .config
            .base_path
            .join(format!("{TRASH_PREFIX}{}", Uuid::new_v4().simple()));
        match fs::rename(self.config.pasta_dir(id), &trash) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                debug!(id, "delete of missing pasta");
                return Ok(());
            }
            Err(e) => return Err(BowlError::io(format!("failed to delete pasta {id}"), e)),
        }
        sync_dir(&self.config.base_path)?;

        // A concurrent sweep_trash may already have removed the tombstone.
        match fs::remove_dir_all(&trash) {
            Ok(()) => {}
            Err(e) if e.kind() == io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(BowlError::io(
                    format!("failed to remove files of deleted pasta {id}"),
                    e,
                ))
            }
        }

        info!(id, "pasta deleted");
        Ok(())
    }

    fn list_pastas(&self) -> Result<Vec<Pasta>> {
        let entries = match fs::read_dir(&self.config.base_path) {
            Ok(entries) => entries,
            // A read-only bowl whose root was never created is simply empty.
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(BowlError::io("failed to list bowl directory", e)),
        };

        let mut pastas = Vec::new();
        for entry in entries {
            let entry = entry.context("failed to list bowl directory")?;
            if !entry.file_type().is_ok_and(|t| t.is_dir()) {
                continue;
            }
            let name = entry.file_name();
            let Some(id) = name.to_str().filter(|n| is_valid_id(n)) else {
                continue;
            };

            // Vanished (concurrent delete) or half-inserted entries are skipped.
            match self.fetch_pasta(id)? {
                Some(pasta) => pastas.push(pasta),
                None => debug!(id, "skipping bowl entry without metadata"),
            }
        }

        debug!(count = pastas.len(), "listed pastas");
        Ok(pastas)
    }

    fn pasta_writer(&self, id: &str) -> Result<PastaWriter> {
        self.ensure_writable()?;
        if !is_valid_id(id) {
            return Err(BowlError::InvalidIdentifier(id.to_string()));
        }
        PastaWriter::create(id, &self.config.pasta_dir(id))
    }

    fn pasta_reader(&self, id: &str) -> Result<PastaReader> {
        if !is_valid_id(id) {
            return Err(BowlError::InvalidIdentifier(id.to_string()));
        }
        PastaReader::open(id, &self.config.pasta_dir(id))
    }
}
