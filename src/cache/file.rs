//! Directory-backed credential cache with one JSON file per identity.

// std
#[cfg(unix)] use std::os::unix::fs::{DirBuilderExt, OpenOptionsExt};
use std::{
	fs::{self, DirBuilder, File, OpenOptions},
	io::{ErrorKind, Write},
	path::{Path, PathBuf},
};
// self
use crate::{
	_prelude::*,
	auth::{ClientIdentity, Credential},
	cache::{CacheError, CacheFuture, TokenCache},
};

const CACHE_DIR_NAME: &str = "graph-broker";
#[cfg(unix)]
const DIR_MODE: u32 = 0o700;
#[cfg(unix)]
const FILE_MODE: u32 = 0o600;

/// Persists each credential to `<dir>/<identity fingerprint>.json`.
///
/// On Unix the directory is created `0700` and entries are written `0600`, since they hold
/// refresh tokens.
///
/// Writes go to a temporary sibling first and are renamed into place, so a crash never
/// leaves a truncated entry behind.
#[derive(Clone, Debug)]
pub struct FileCache {
	dir: PathBuf,
}
impl FileCache {
	/// Uses `dir` as the cache directory; it is created on first save.
	pub fn new(dir: impl Into<PathBuf>) -> Self {
		Self { dir: dir.into() }
	}

	/// Uses the platform's per-user cache directory.
	pub fn in_user_cache_dir() -> Result<Self, CacheError> {
		let base = dirs::cache_dir().ok_or_else(|| CacheError::Backend {
			message: "Per-user cache directory is unavailable on this platform".into(),
		})?;

		Ok(Self::new(base.join(CACHE_DIR_NAME)))
	}

	/// Directory holding the cache entries.
	pub fn dir(&self) -> &Path {
		&self.dir
	}

	fn entry_path(&self, identity: &ClientIdentity) -> PathBuf {
		self.dir.join(format!("{}.json", identity.fingerprint()))
	}

	fn read_entry(path: &Path) -> Result<Credential, CacheError> {
		let bytes = match fs::read(path) {
			Ok(bytes) => bytes,
			Err(e) if e.kind() == ErrorKind::NotFound => return Err(CacheError::NotFound),
			Err(e) =>
				return Err(CacheError::Backend {
					message: format!("Failed to read {}: {e}", path.display()),
				}),
		};

		serde_json::from_slice(&bytes).map_err(|e| CacheError::Serialization {
			message: format!("Failed to parse {}: {e}", path.display()),
		})
	}

	fn write_entry(&self, path: &Path, credential: &Credential) -> Result<(), CacheError> {
		create_private_dir(&self.dir).map_err(|e| CacheError::Backend {
			message: format!("Failed to create cache directory {}: {e}", self.dir.display()),
		})?;

		let serialized = serde_json::to_vec(credential).map_err(|e| CacheError::Serialization {
			message: format!("Failed to serialize credential: {e}"),
		})?;
		let tmp_path = path.with_extension("tmp");

		{
			let mut file = create_private_file(&tmp_path).map_err(|e| CacheError::Backend {
				message: format!("Failed to create {}: {e}", tmp_path.display()),
			})?;

			file.write_all(&serialized).map_err(|e| CacheError::Backend {
				message: format!("Failed to write {}: {e}", tmp_path.display()),
			})?;
			file.sync_all().map_err(|e| CacheError::Backend {
				message: format!("Failed to sync {}: {e}", tmp_path.display()),
			})?;
		}

		fs::rename(&tmp_path, path).map_err(|e| CacheError::Backend {
			message: format!("Failed to replace {}: {e}", path.display()),
		})
	}
}
impl TokenCache for FileCache {
	fn load<'a>(&'a self, identity: &'a ClientIdentity) -> CacheFuture<'a, Credential> {
		Box::pin(async move { Self::read_entry(&self.entry_path(identity)) })
	}

	fn save<'a>(
		&'a self,
		identity: &'a ClientIdentity,
		credential: &'a Credential,
	) -> CacheFuture<'a, ()> {
		Box::pin(async move { self.write_entry(&self.entry_path(identity), credential) })
	}
}

fn create_private_dir(dir: &Path) -> std::io::Result<()> {
	let mut builder = DirBuilder::new();

	builder.recursive(true);

	#[cfg(unix)]
	builder.mode(DIR_MODE);

	builder.create(dir)
}

fn create_private_file(path: &Path) -> std::io::Result<File> {
	let mut options = OpenOptions::new();

	options.write(true).create(true).truncate(true);

	#[cfg(unix)]
	options.mode(FILE_MODE);

	options.open(path)
}
