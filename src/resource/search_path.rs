use std::io;
use std::path::PathBuf;
use std::sync::Arc;

use url::Url;

use super::{classpath_relative, Resource, ResourceLoader, FILE_PREFIX};
use crate::error::{ViewError, ViewResult};

/// Loader that consults its parent first, then each search-path root.
pub struct SearchPathResourceLoader {
    roots: Vec<Url>,
    parent: Arc<dyn ResourceLoader>,
}

impl SearchPathResourceLoader {
    pub fn new(roots: Vec<Url>, parent: Arc<dyn ResourceLoader>) -> Self {
        Self { roots, parent }
    }

    /// Build a loader for a comma-separated search path.
    ///
    /// Each entry is resolved through `parent`; the URLs of the resources
    /// that exist become the roots. When nothing is found the parent is
    /// returned unchanged.
    pub fn assemble(
        parent: Arc<dyn ResourceLoader>,
        search_path: &str,
    ) -> ViewResult<Arc<dyn ResourceLoader>> {
        let mut roots = Vec::new();
        for pattern in search_path.split(',').map(str::trim).filter(|p| !p.is_empty()) {
            let resources = parent.get_resources(pattern).map_err(|e| {
                ViewError::config(format!("Cannot create resource loader: {}", e))
            })?;
            roots.extend(
                resources
                    .iter()
                    .filter(|resource| resource.exists())
                    .filter_map(Resource::url),
            );
        }

        if roots.is_empty() {
            tracing::debug!(search_path, "No search path roots found, using ambient loader");
            return Ok(parent);
        }
        tracing::debug!(search_path, roots = roots.len(), "Assembled search path loader");
        Ok(Arc::new(Self::new(roots, parent)))
    }

    pub fn roots(&self) -> &[Url] {
        &self.roots
    }

    /// Existing files named `relative` under each root, in root order.
    ///
    /// Names are joined as paths so `#` and `?` stay part of the file name.
    fn candidates<'a>(&'a self, relative: &'a str) -> impl Iterator<Item = PathBuf> + 'a {
        self.roots
            .iter()
            .filter_map(|root| root.to_file_path().ok())
            .map(move |dir| dir.join(relative))
            .filter(|path| path.exists())
    }

    fn resolve_in_roots(&self, location: &str) -> Option<Resource> {
        self.candidates(classpath_relative(location))
            .next()
            .map(|path| Resource::file(location, path))
    }
}

impl ResourceLoader for SearchPathResourceLoader {
    fn get_resource(&self, location: &str) -> Resource {
        let resource = self.parent.get_resource(location);
        if resource.exists() || location.starts_with(FILE_PREFIX) {
            return resource;
        }
        self.resolve_in_roots(location).unwrap_or(resource)
    }

    fn get_resources(&self, pattern: &str) -> io::Result<Vec<Resource>> {
        let mut resources = self.parent.get_resources(pattern)?;
        if !pattern.starts_with(FILE_PREFIX) {
            resources.extend(
                self.candidates(classpath_relative(pattern))
                    .map(|path| Resource::file(pattern, path)),
            );
        }
        Ok(resources)
    }
}
