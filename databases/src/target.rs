//! Connection targets
//!
//! File-based engines locate their database through a directory, a base
//! filename and an extension. Server-based engines use host, port, database
//! name and credentials.

use crate::error::{DatabaseError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};

/// Extension appended when none is given
pub const DEFAULT_EXTENSION: &str = ".db";

/// On-disk location of a file-based database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileTarget {
    directory: PathBuf,
    filename: String,
    extension: String,
}

impl FileTarget {
    /// Target `<directory>/<filename>.db`
    pub fn new<P: AsRef<Path>>(directory: P, filename: &str) -> Result<Self> {
        Self::with_extension(directory, filename, DEFAULT_EXTENSION)
    }

    /// Target `<directory>/<filename><extension>`
    ///
    /// A missing leading dot is added to `extension`; an empty extension
    /// leaves the filename bare. A filename that already ends in the
    /// extension is not doubled.
    pub fn with_extension<P: AsRef<Path>>(
        directory: P,
        filename: &str,
        extension: &str,
    ) -> Result<Self> {
        let directory = directory.as_ref();
        if directory.as_os_str().is_empty() {
            return Err(DatabaseError::InvalidTarget(
                "directory cannot be empty".to_string(),
            ));
        }

        let extension = match extension.trim() {
            "" => String::new(),
            ext if ext.starts_with('.') => ext.to_string(),
            ext => format!(".{ext}"),
        };

        let filename = filename.trim();
        let filename = if extension.is_empty() {
            filename
        } else {
            filename.strip_suffix(extension.as_str()).unwrap_or(filename)
        };

        if filename.is_empty() {
            return Err(DatabaseError::InvalidTarget(
                "filename cannot be empty".to_string(),
            ));
        }
        if filename.contains(['/', '\\']) {
            return Err(DatabaseError::InvalidTarget(format!(
                "filename cannot contain path separators: {filename}"
            )));
        }

        Ok(Self {
            directory: directory.to_path_buf(),
            filename: filename.to_string(),
            extension,
        })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn filename(&self) -> &str {
        &self.filename
    }

    pub fn extension(&self) -> &str {
        &self.extension
    }

    /// Absolute path of the database file
    pub fn path(&self) -> io::Result<PathBuf> {
        let file = self
            .directory
            .join(format!("{}{}", self.filename, self.extension));
        if file.is_absolute() {
            Ok(file)
        } else {
            Ok(std::env::current_dir()?.join(file))
        }
    }

    /// Create the directory if needed and return the absolute file path
    pub fn prepare(&self) -> io::Result<PathBuf> {
        let path = self.path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        Ok(path)
    }
}

/// Username and password for server engines
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Credentials {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: password.into(),
        }
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .finish()
    }
}

/// Network location of a server-based database
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerTarget {
    host: String,
    port: u16,
    database: String,
    credentials: Credentials,
}

impl ServerTarget {
    pub fn new(host: &str, port: u16, database: &str, credentials: Credentials) -> Result<Self> {
        let host = host.trim();
        if host.is_empty() {
            return Err(DatabaseError::InvalidTarget(
                "host cannot be empty".to_string(),
            ));
        }
        if port == 0 {
            return Err(DatabaseError::InvalidTarget(
                "port must be greater than 0".to_string(),
            ));
        }
        let database = database.trim();
        if database.is_empty() {
            return Err(DatabaseError::InvalidTarget(
                "database name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            host: host.to_string(),
            port,
            database: database.to_string(),
            credentials,
        })
    }

    pub fn host(&self) -> &str {
        &self.host
    }

    pub fn port(&self) -> u16 {
        self.port
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn credentials(&self) -> &Credentials {
        &self.credentials
    }

    /// `<scheme>://<host>:<port>/<database>`, bracketing IPv6 hosts
    pub fn descriptor(&self, scheme: &str) -> String {
        if self.host.contains(':') && !self.host.starts_with('[') {
            format!("{scheme}://[{}]:{}/{}", self.host, self.port, self.database)
        } else {
            format!("{scheme}://{}:{}/{}", self.host, self.port, self.database)
        }
    }
}
