//! Classification of container children
use crate::error::MsgError;
use crate::handles::Handle;
use crate::provider::{ContainerProvider, ElementInfo, ElementKind};
use std::collections::BTreeMap;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// A cataloged child element
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogEntry {
    /// Element name
    pub name: String,
    /// Element kind (never [`ElementKind::Other`])
    pub kind: ElementKind,
    /// Element size
    pub size: u64,
}

/// The direct children of a container, split by kind and keyed by name
#[derive(Debug, Clone, Default)]
pub struct ElementCatalog {
    path: String,
    streams: BTreeMap<String, CatalogEntry>,
    containers: BTreeMap<String, CatalogEntry>,
}

impl ElementCatalog {
    /// Enumerates the children of `container` once
    ///
    /// `path` is only used to give errors and logs some context
    pub fn build<P: ContainerProvider>(
        container: &Handle<P>,
        path: &str,
    ) -> Result<Self, MsgError> {
        let children = container
            .session()
            .with_provider(|p| p.enumerate_children(container.id()))
            .map_err(|e| MsgError::read(path, e))?;
        Ok(Self::from_elements(path, children))
    }

    /// Builds a catalog from a list of elements
    pub fn from_elements<I: IntoIterator<Item = ElementInfo>>(path: &str, elements: I) -> Self {
        let mut catalog = Self {
            path: path.to_string(),
            ..Self::default()
        };
        for e in elements {
            let map = match e.kind {
                ElementKind::Stream => &mut catalog.streams,
                ElementKind::SubContainer => &mut catalog.containers,
                ElementKind::Other => {
                    debug!("Ignoring element {}{} of unknown kind", path, e.name);
                    continue;
                }
            };
            map.insert(
                e.name.clone(),
                CatalogEntry {
                    name: e.name,
                    kind: e.kind,
                    size: e.size,
                },
            );
        }
        catalog
    }

    /// The container path
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Child streams, by name
    pub fn streams(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.values()
    }

    /// Child containers, by name
    pub fn sub_containers(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.containers.values()
    }

    /// Looks up a child stream
    pub fn stream(&self, name: &str) -> Option<&CatalogEntry> {
        self.streams.get(name)
    }

    /// Looks up a child container
    pub fn sub_container(&self, name: &str) -> Option<&CatalogEntry> {
        self.containers.get(name)
    }

    /// Streams and containers, streams first
    pub fn entries(&self) -> impl Iterator<Item = &CatalogEntry> {
        self.streams.values().chain(self.containers.values())
    }
}
