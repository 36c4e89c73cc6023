// ABOUTME: Credential cache seam and its file-backed implementation
// ABOUTME: OAuth1 and OAuth2 are separate owner-only JSON documents, loaded and stored independently
//
// SPDX-License-Identifier: MIT OR Apache-2.0
// Copyright (c) 2025 Pierre Fitness Intelligence

use std::fs::{self, OpenOptions};
use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};

use fitbridge_core::constants::files;
use fitbridge_core::errors::connect::{ConnectError, ConnectResult};
use fitbridge_core::models::{OAuth1Credential, OAuth2Credential};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

/// Persistence for the two credential documents.
///
/// A missing document loads as `None`. Storing one document never touches
/// the other.
pub trait CredentialCache: Send {
    /// Load the `OAuth1` document
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read.
    fn load_oauth1(&self) -> ConnectResult<Option<OAuth1Credential>>;

    /// Load the `OAuth2` document
    ///
    /// # Errors
    ///
    /// Returns an error when the document exists but cannot be read.
    fn load_oauth2(&self) -> ConnectResult<Option<OAuth2Credential>>;

    /// Replace the `OAuth1` document
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    fn store_oauth1(&self, credential: &OAuth1Credential) -> ConnectResult<()>;

    /// Replace the `OAuth2` document
    ///
    /// # Errors
    ///
    /// Returns an error when the document cannot be written.
    fn store_oauth2(&self, credential: &OAuth2Credential) -> ConnectResult<()>;
}

/// Cache storing `oauth1_token.json` and `oauth2_token.json` in one directory
#[derive(Debug, Clone)]
pub struct FileCredentialCache {
    dir: PathBuf,
}

impl FileCredentialCache {
    /// Cache rooted at `dir`; the directory is created on first store
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Directory holding the documents
    #[must_use]
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn load<T: DeserializeOwned>(&self, name: &str) -> ConnectResult<Option<T>> {
        let path = self.dir.join(name);
        let bytes = match fs::read(&path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(ConnectError::io(format!("reading {}", path.display()), e)),
        };
        let value = serde_json::from_slice(&bytes)
            .map_err(|e| ConnectError::cache(format!("{}: {e}", path.display())))?;
        Ok(Some(value))
    }

    fn store<T: Serialize>(&self, name: &str, value: &T) -> ConnectResult<()> {
        self.ensure_dir()?;
        let bytes = serde_json::to_vec_pretty(value)
            .map_err(|e| ConnectError::cache(format!("serializing {name}: {e}")))?;

        let path = self.dir.join(name);
        let staging = self.dir.join(format!("{name}.tmp"));
        write_private(&staging, &bytes)
            .map_err(|e| ConnectError::io(format!("writing {}", staging.display()), e))?;
        fs::rename(&staging, &path)
            .map_err(|e| ConnectError::io(format!("replacing {}", path.display()), e))?;
        debug!(path = %path.display(), "Stored credential document");
        Ok(())
    }

    fn ensure_dir(&self) -> ConnectResult<()> {
        fs::create_dir_all(&self.dir)
            .map_err(|e| ConnectError::io(format!("creating {}", self.dir.display()), e))?;
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            fs::set_permissions(&self.dir, fs::Permissions::from_mode(0o700))
                .map_err(|e| ConnectError::io(format!("securing {}", self.dir.display()), e))?;
        }
        Ok(())
    }
}

fn write_private(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let mut options = OpenOptions::new();
    options.write(true).create(true).truncate(true);
    #[cfg(unix)]
    {
        use std::os::unix::fs::OpenOptionsExt;
        options.mode(0o600);
    }
    let mut file = options.open(path)?;
    file.write_all(bytes)?;
    file.sync_all()?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        fs::set_permissions(path, fs::Permissions::from_mode(0o600))?;
    }
    Ok(())
}

impl CredentialCache for FileCredentialCache {
    fn load_oauth1(&self) -> ConnectResult<Option<OAuth1Credential>> {
        self.load(files::OAUTH1_FILE)
    }

    fn load_oauth2(&self) -> ConnectResult<Option<OAuth2Credential>> {
        self.load(files::OAUTH2_FILE)
    }

    fn store_oauth1(&self, credential: &OAuth1Credential) -> ConnectResult<()> {
        self.store(files::OAUTH1_FILE, credential)
    }

    fn store_oauth2(&self, credential: &OAuth2Credential) -> ConnectResult<()> {
        self.store(files::OAUTH2_FILE, credential)
    }
}
