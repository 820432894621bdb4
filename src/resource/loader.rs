use std::collections::HashMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::{classpath_relative, Resource, ResourceLoader, FILE_PREFIX};

/// Loader over a list of classpath root directories.
///
/// - `file:<path>` resolves to that filesystem path.
/// - `classpath:<rel>` and plain `<rel>` resolve against the roots in order;
///   the first root containing `<rel>` wins.
#[derive(Debug, Clone)]
pub struct DefaultResourceLoader {
    classpath: Vec<PathBuf>,
}

impl DefaultResourceLoader {
    pub fn new<I, P>(classpath: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: Into<PathBuf>,
    {
        Self {
            classpath: classpath.into_iter().map(Into::into).collect(),
        }
    }

    /// Loader whose only classpath root is the current working directory.
    pub fn from_current_dir() -> io::Result<Self> {
        Ok(Self::new([std::env::current_dir()?]))
    }

    pub fn classpath(&self) -> &[PathBuf] {
        &self.classpath
    }
}

impl ResourceLoader for DefaultResourceLoader {
    fn get_resource(&self, location: &str) -> Resource {
        if let Some(path) = location.strip_prefix(FILE_PREFIX) {
            return Resource::file(location, path);
        }
        let relative = classpath_relative(location);
        self.classpath
            .iter()
            .map(|root| root.join(relative))
            .find(|candidate| candidate.exists())
            .map(|candidate| Resource::file(location, candidate))
            .unwrap_or_else(|| Resource::missing(location))
    }

    fn get_resources(&self, pattern: &str) -> io::Result<Vec<Resource>> {
        if let Some(path) = pattern.strip_prefix(FILE_PREFIX) {
            return Ok(existing(Path::new(path))?
                .then(|| Resource::file(pattern, path))
                .into_iter()
                .collect());
        }
        let relative = classpath_relative(pattern);
        let mut resources = Vec::new();
        for root in &self.classpath {
            let candidate = root.join(relative);
            if existing(&candidate)? {
                resources.push(Resource::file(pattern, candidate));
            }
        }
        Ok(resources)
    }
}

/// Existence check that reports I/O failures other than absence.
fn existing(path: &Path) -> io::Result<bool> {
    match fs::metadata(path) {
        Ok(_) => Ok(true),
        Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
        Err(e) => Err(e),
    }
}

/// Loader over resources held in memory, e.g. embedded with `include_str!`.
#[derive(Debug, Clone, Default)]
pub struct InMemoryResourceLoader {
    resources: HashMap<String, Arc<[u8]>>,
}

impl InMemoryResourceLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_resource(mut self, location: &str, content: impl AsRef<[u8]>) -> Self {
        self.insert(location, content);
        self
    }

    pub fn insert(&mut self, location: &str, content: impl AsRef<[u8]>) {
        self.resources.insert(
            classpath_relative(location).to_string(),
            Arc::from(content.as_ref()),
        );
    }
}

impl ResourceLoader for InMemoryResourceLoader {
    fn get_resource(&self, location: &str) -> Resource {
        match self.resources.get(classpath_relative(location)) {
            Some(content) => Resource::memory(location, content.clone()),
            None => Resource::missing(location),
        }
    }
}
