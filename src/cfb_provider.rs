//! [`ContainerProvider`] backed by in-memory compound files
use crate::provider::{ContainerProvider, ElementInfo, ElementKind, HandleId};
use cfb::{CompoundFile, Version};
use std::collections::HashMap;
use std::io::{self, Cursor, Read, Write};
use std::path::{Path, PathBuf};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};
use uuid::Uuid;

type Document = CompoundFile<Cursor<Vec<u8>>>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum NodeKind {
    Storage,
    Stream,
}

#[derive(Debug)]
struct Node {
    doc: u64,
    path: PathBuf,
    kind: NodeKind,
}

/// A detached copy of a storage's contents
struct Snapshot {
    clsid: Uuid,
    state_bits: u32,
    entries: Vec<SnapshotEntry>,
}

enum SnapshotEntry {
    Storage {
        path: PathBuf,
        clsid: Uuid,
        state_bits: u32,
    },
    Stream {
        path: PathBuf,
        data: Vec<u8>,
        state_bits: u32,
    },
}

/// A provider which keeps every compound file in memory
///
/// Opened documents are copied and never written back; created documents
/// live until their last handle is released
#[derive(Default)]
pub struct CfbProvider {
    docs: HashMap<u64, Document>,
    nodes: HashMap<HandleId, Node>,
    next_doc: u64,
    next_handle: u64,
}

impl CfbProvider {
    /// Creates an empty provider
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents currently held
    pub fn documents(&self) -> usize {
        self.docs.len()
    }

    fn insert_doc(&mut self, doc: Document) -> u64 {
        let id = self.next_doc;
        self.next_doc += 1;
        self.docs.insert(id, doc);
        id
    }

    fn issue(&mut self, doc: u64, path: PathBuf, kind: NodeKind) -> HandleId {
        let id = HandleId(self.next_handle);
        self.next_handle += 1;
        self.nodes.insert(id, Node { doc, path, kind });
        id
    }

    fn node(&self, handle: HandleId, kind: NodeKind) -> io::Result<(u64, PathBuf)> {
        match self.nodes.get(&handle) {
            Some(node) if node.kind == kind => Ok((node.doc, node.path.clone())),
            Some(_) => Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Handle {handle} has the wrong kind (expected {kind:?})"),
            )),
            None => Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Unknown handle {handle}"),
            )),
        }
    }

    fn doc_mut(&mut self, doc: u64) -> io::Result<&mut Document> {
        self.docs
            .get_mut(&doc)
            .ok_or_else(|| io::Error::new(io::ErrorKind::NotFound, "Document already released"))
    }

    fn child_path(&self, container: HandleId, name: &str) -> io::Result<(u64, PathBuf)> {
        let (doc, path) = self.node(container, NodeKind::Storage)?;
        Ok((doc, path.join(name)))
    }

    fn snapshot(&mut self, container: HandleId) -> io::Result<Snapshot> {
        let (doc, path) = self.node(container, NodeKind::Storage)?;
        let doc = self.doc_mut(doc)?;
        let root = doc.entry(&path)?;
        let mut snapshot = Snapshot {
            clsid: *root.clsid(),
            state_bits: root.state_bits(),
            entries: Vec::new(),
        };
        snapshot_storage(doc, &path, Path::new(""), &mut snapshot.entries)?;
        Ok(snapshot)
    }

    /// Writes a snapshot into a container, which takes the CLSID of the source
    fn restore(&mut self, container: HandleId, snapshot: Snapshot) -> io::Result<()> {
        let (doc, base) = self.node(container, NodeKind::Storage)?;
        let doc = self.doc_mut(doc)?;
        doc.set_storage_clsid(&base, snapshot.clsid)?;
        doc.set_state_bits(&base, snapshot.state_bits)?;
        for entry in snapshot.entries {
            match entry {
                SnapshotEntry::Storage {
                    path,
                    clsid,
                    state_bits,
                } => {
                    let path = base.join(path);
                    if !doc.is_storage(&path) {
                        doc.create_storage(&path)?;
                    }
                    doc.set_storage_clsid(&path, clsid)?;
                    doc.set_state_bits(&path, state_bits)?;
                }
                SnapshotEntry::Stream {
                    path,
                    data,
                    state_bits,
                } => {
                    let path = base.join(path);
                    let mut stream = doc.create_stream(&path)?;
                    stream.write_all(&data)?;
                    stream.flush()?;
                    doc.set_state_bits(&path, state_bits)?;
                }
            }
        }
        Ok(())
    }
}

fn snapshot_storage(
    doc: &mut Document,
    path: &Path,
    rel: &Path,
    out: &mut Vec<SnapshotEntry>,
) -> io::Result<()> {
    let children: Vec<cfb::Entry> = doc.read_storage(path)?.collect();
    for entry in children {
        let src = path.join(entry.name());
        let dst = rel.join(entry.name());
        if entry.is_storage() {
            out.push(SnapshotEntry::Storage {
                path: dst.clone(),
                clsid: *entry.clsid(),
                state_bits: entry.state_bits(),
            });
            snapshot_storage(doc, &src, &dst, out)?;
        } else if entry.is_stream() {
            let mut data = Vec::new();
            doc.open_stream(&src)?.read_to_end(&mut data)?;
            out.push(SnapshotEntry::Stream {
                path: dst,
                data,
                state_bits: entry.state_bits(),
            });
        }
    }
    Ok(())
}

impl ContainerProvider for CfbProvider {
    fn open(&mut self, data: &[u8]) -> io::Result<HandleId> {
        let doc = CompoundFile::open(Cursor::new(data.to_vec()))?;
        let doc = self.insert_doc(doc);
        Ok(self.issue(doc, PathBuf::from("/"), NodeKind::Storage))
    }

    fn enumerate_children(&mut self, container: HandleId) -> io::Result<Vec<ElementInfo>> {
        let (doc, path) = self.node(container, NodeKind::Storage)?;
        let doc = self.doc_mut(doc)?;
        Ok(doc
            .read_storage(&path)?
            .map(|e| ElementInfo {
                name: e.name().to_string(),
                kind: if e.is_stream() {
                    ElementKind::Stream
                } else if e.is_storage() {
                    ElementKind::SubContainer
                } else {
                    ElementKind::Other
                },
                size: e.len(),
            })
            .collect())
    }

    fn open_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let (doc, path) = self.child_path(container, name)?;
        if !self.doc_mut(doc)?.is_stream(&path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No stream at {}", path.display()),
            ));
        }
        Ok(self.issue(doc, path, NodeKind::Stream))
    }

    fn read_all(&mut self, stream: HandleId) -> io::Result<Vec<u8>> {
        let (doc, path) = self.node(stream, NodeKind::Stream)?;
        let mut data = Vec::new();
        self.doc_mut(doc)?
            .open_stream(&path)?
            .read_to_end(&mut data)?;
        Ok(data)
    }

    fn open_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let (doc, path) = self.child_path(container, name)?;
        if !self.doc_mut(doc)?.is_storage(&path) {
            return Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("No storage at {}", path.display()),
            ));
        }
        Ok(self.issue(doc, path, NodeKind::Storage))
    }

    fn create_container(&mut self) -> io::Result<HandleId> {
        let doc = CompoundFile::create_with_version(Version::V3, Cursor::new(Vec::new()))?;
        let doc = self.insert_doc(doc);
        Ok(self.issue(doc, PathBuf::from("/"), NodeKind::Storage))
    }

    fn create_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let (doc, path) = self.child_path(container, name)?;
        self.doc_mut(doc)?.create_storage(&path)?;
        Ok(self.issue(doc, path, NodeKind::Storage))
    }

    fn copy_subtree(&mut self, src: HandleId, dst: HandleId) -> io::Result<()> {
        let snapshot = self.snapshot(src)?;
        self.restore(dst, snapshot)
    }

    fn commit(&mut self, container: HandleId) -> io::Result<()> {
        let (doc, _) = self.node(container, NodeKind::Storage)?;
        self.doc_mut(doc)?.flush()
    }

    fn create_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let (doc, path) = self.child_path(container, name)?;
        self.doc_mut(doc)?.create_stream(&path)?.flush()?;
        Ok(self.issue(doc, path, NodeKind::Stream))
    }

    fn write_all(&mut self, stream: HandleId, data: &[u8]) -> io::Result<()> {
        let (doc, path) = self.node(stream, NodeKind::Stream)?;
        let mut stream = self.doc_mut(doc)?.create_stream(&path)?;
        stream.write_all(data)?;
        stream.flush()
    }

    fn delete_element(&mut self, container: HandleId, name: &str) -> io::Result<()> {
        let (doc, path) = self.child_path(container, name)?;
        let doc = self.doc_mut(doc)?;
        if doc.is_storage(&path) {
            doc.remove_storage_all(&path)
        } else if doc.is_stream(&path) {
            doc.remove_stream(&path)
        } else {
            Err(io::Error::new(
                io::ErrorKind::NotFound,
                format!("Nothing to delete at {}", path.display()),
            ))
        }
    }

    fn clone_subtree(&mut self, container: HandleId) -> io::Result<HandleId> {
        let snapshot = self.snapshot(container)?;
        let clone = self.create_container()?;
        if let Err(e) = self.restore(clone, snapshot) {
            self.release(clone)?;
            return Err(e);
        }
        Ok(clone)
    }

    fn backing_bytes(&mut self, container: HandleId) -> io::Result<Vec<u8>> {
        let (doc_id, path) = self.node(container, NodeKind::Storage)?;
        if path != Path::new("/") {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Backing bytes are only available for top-level containers",
            ));
        }
        let mut doc = self.docs.remove(&doc_id).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, "Document already released")
        })?;
        doc.flush()?;
        let data = doc.into_inner().into_inner();
        let reopened = CompoundFile::open(Cursor::new(data.clone()))?;
        self.docs.insert(doc_id, reopened);
        Ok(data)
    }

    fn release(&mut self, handle: HandleId) -> io::Result<()> {
        let node = self.nodes.remove(&handle).ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("Unknown handle {handle}"))
        })?;
        if !self.nodes.values().any(|n| n.doc == node.doc) {
            debug!("Dropping document {}", node.doc);
            self.docs.remove(&node.doc);
        }
        Ok(())
    }
}
