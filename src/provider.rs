//! Hierarchical container access
//!
//! The message engine never touches the compound file layout directly: every
//! stream and storage is reached through a [`ContainerProvider`], which hands
//! out opaque [`HandleId`]s
use std::fmt;
use std::io;

/// An opaque handle issued by a [`ContainerProvider`]
///
/// A handle designates either a container (storage) or a stream
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct HandleId(pub u64);

impl fmt::Display for HandleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// The kind of a container child
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ElementKind {
    /// A data stream
    Stream,
    /// A nested container (storage)
    SubContainer,
    /// Anything else (e.g. a property set the provider does not classify)
    Other,
}

/// A direct child of a container, as reported by the provider
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ElementInfo {
    /// The element name
    pub name: String,
    /// The element kind
    pub kind: ElementKind,
    /// The element size in bytes (0 for containers)
    pub size: u64,
}

/// A transactional hierarchical store, in the style of OLE structured storage
///
/// All handles returned by the provider must eventually be given back via
/// [`release`](Self::release); the [`Session`](crate::Session) makes sure this
/// happens exactly once per handle
pub trait ContainerProvider {
    /// Opens a byte blob as a read-only container
    fn open(&mut self, data: &[u8]) -> io::Result<HandleId>;
    /// Lists the direct children of a container
    fn enumerate_children(&mut self, container: HandleId) -> io::Result<Vec<ElementInfo>>;
    /// Opens the named child stream
    fn open_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId>;
    /// Reads the whole content of a stream
    fn read_all(&mut self, stream: HandleId) -> io::Result<Vec<u8>>;
    /// Opens the named child container
    fn open_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId>;
    /// Creates a new, empty, writable container
    fn create_container(&mut self) -> io::Result<HandleId>;
    /// Creates a named child container
    fn create_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId>;
    /// Copies every descendant of `src` into `dst`
    fn copy_subtree(&mut self, src: HandleId, dst: HandleId) -> io::Result<()>;
    /// Makes pending writes durable
    fn commit(&mut self, container: HandleId) -> io::Result<()>;
    /// Creates (or truncates) a named child stream
    fn create_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId>;
    /// Replaces the content of a stream
    fn write_all(&mut self, stream: HandleId, data: &[u8]) -> io::Result<()>;
    /// Removes a named child (and all its descendants)
    fn delete_element(&mut self, container: HandleId, name: &str) -> io::Result<()>;
    /// Produces an independent top-level copy of a container
    fn clone_subtree(&mut self, container: HandleId) -> io::Result<HandleId>;
    /// Returns the serialized bytes of a top-level container
    fn backing_bytes(&mut self, container: HandleId) -> io::Result<Vec<u8>>;
    /// Gives a handle back to the provider
    fn release(&mut self, handle: HandleId) -> io::Result<()>;
}
