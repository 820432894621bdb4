//! Resource loading.
//!
//! Templates and bootstrap scripts are addressed by location strings
//! (`classpath:app/render.js`, `file:/srv/templates/index.html`, or a plain
//! relative path resolved against the classpath roots) and resolved through a
//! [`ResourceLoader`].

pub mod loader;
pub mod search_path;

use std::fs;
use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use encoding_rs::Encoding;
use url::Url;

pub use loader::{DefaultResourceLoader, InMemoryResourceLoader};
pub use search_path::SearchPathResourceLoader;

pub const CLASSPATH_PREFIX: &str = "classpath:";
pub const FILE_PREFIX: &str = "file:";

/// Resolves location strings to resources.
pub trait ResourceLoader: Send + Sync {
    /// Resolve a single location. Never fails; absence is reported through
    /// [`Resource::exists`].
    fn get_resource(&self, location: &str) -> Resource;

    /// Resolve a pattern to every matching resource.
    fn get_resources(&self, pattern: &str) -> io::Result<Vec<Resource>> {
        let resource = self.get_resource(pattern);
        Ok(if resource.exists() { vec![resource] } else { Vec::new() })
    }
}

#[derive(Debug, Clone)]
enum ResourceKind {
    File(PathBuf),
    Memory(Arc<[u8]>),
    Missing,
}

/// Handle to a resolved (or unresolvable) resource.
#[derive(Debug, Clone)]
pub struct Resource {
    location: String,
    kind: ResourceKind,
}

impl Resource {
    pub fn file(location: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            location: location.into(),
            kind: ResourceKind::File(path.into()),
        }
    }

    pub fn memory(location: impl Into<String>, content: Arc<[u8]>) -> Self {
        Self {
            location: location.into(),
            kind: ResourceKind::Memory(content),
        }
    }

    pub fn missing(location: impl Into<String>) -> Self {
        Self {
            location: location.into(),
            kind: ResourceKind::Missing,
        }
    }

    /// Location string this resource was requested by.
    pub fn location(&self) -> &str {
        &self.location
    }

    pub fn exists(&self) -> bool {
        match &self.kind {
            ResourceKind::File(path) => path.exists(),
            ResourceKind::Memory(_) => true,
            ResourceKind::Missing => false,
        }
    }

    pub fn path(&self) -> Option<&std::path::Path> {
        match &self.kind {
            ResourceKind::File(path) => Some(path),
            _ => None,
        }
    }

    pub fn read_bytes(&self) -> io::Result<Vec<u8>> {
        match &self.kind {
            ResourceKind::File(path) => fs::read(path),
            ResourceKind::Memory(content) => Ok(content.to_vec()),
            ResourceKind::Missing => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Resource {} not found", self.location),
            )),
        }
    }

    /// Read the whole resource, decoding it with `charset`.
    pub fn read_to_string(&self, charset: &'static Encoding) -> io::Result<String> {
        let bytes = self.read_bytes()?;
        let (text, _, _) = charset.decode(&bytes);
        Ok(text.into_owned())
    }

    /// Absolute `file:` URL of a filesystem resource. Directories get a
    /// trailing slash so relative locations can be joined onto them.
    pub fn url(&self) -> Option<Url> {
        let ResourceKind::File(path) = &self.kind else {
            return None;
        };
        let absolute = fs::canonicalize(path).ok()?;
        if absolute.is_dir() {
            Url::from_directory_path(&absolute).ok()
        } else {
            Url::from_file_path(&absolute).ok()
        }
    }
}

/// Location with any `classpath:` prefix and leading slashes removed.
pub(crate) fn classpath_relative(location: &str) -> &str {
    location
        .strip_prefix(CLASSPATH_PREFIX)
        .unwrap_or(location)
        .trim_start_matches('/')
}
