//! Round-trip serialization of a message into a standalone document
use crate::props::nameid::NAMEID_STORAGE;
use crate::props::PROPERTY_TABLE;
use crate::provider::ContainerProvider;
use crate::{Message, MsgError};
use std::io::{self, Write};
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Offset at which the embedded table header ends
const EMBEDDED_HEADER: usize = 24;
/// Bytes the top-level header adds to the embedded one
const HEADER_PADDING: usize = 8;

/// Turns an embedded message property table into a top-level one
///
/// The first 24 bytes are kept, 8 zero bytes are inserted and the records
/// follow unchanged
pub fn promote_property_table(table: &[u8]) -> Result<Vec<u8>, io::Error> {
    if table.len() < EMBEDDED_HEADER {
        return Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Property table is {} bytes long, shorter than its header",
                table.len()
            ),
        ));
    }
    let mut out = Vec::with_capacity(table.len() + HEADER_PADDING);
    out.extend_from_slice(&table[..EMBEDDED_HEADER]);
    out.extend_from_slice(&[0u8; HEADER_PADDING]);
    out.extend_from_slice(&table[EMBEDDED_HEADER..]);
    Ok(out)
}

impl<P: ContainerProvider> Message<P> {
    /// Serializes the message as a standalone document
    ///
    /// Works for any message of the tree: embedded messages get the named
    /// property map of their top-level ancestor and a top-level property table
    #[instrument(level = "debug", skip(self), fields(path = self.path()))]
    pub fn save(&self) -> Result<Vec<u8>, MsgError> {
        self.save_inner().map_err(MsgError::SaveFailed)
    }

    /// Serializes the message into a writer
    ///
    /// Nothing is written unless the whole document was produced
    pub fn save_to<W: Write>(&self, mut w: W) -> Result<(), MsgError> {
        let data = self.save()?;
        w.write_all(&data).map_err(MsgError::SaveFailed)?;
        w.flush().map_err(MsgError::SaveFailed)
    }

    fn save_inner(&self) -> Result<Vec<u8>, io::Error> {
        let lineage = self.lineage();
        let src = &lineage.handle;
        let session = src.session();
        let dst = session.acquire(|p| p.create_container())?;
        session.with_provider(|p| {
            p.copy_subtree(src.id(), dst.id())?;
            p.commit(dst.id())
        })?;

        if !self.is_root() {
            if lineage.catalog.sub_container(NAMEID_STORAGE).is_some() {
                debug!("Replacing the named property map of {}", self.path());
                session.with_provider(|p| p.delete_element(dst.id(), NAMEID_STORAGE))?;
            }
            let nameid = dst.create_sub_container(NAMEID_STORAGE)?;
            let root = lineage.root();
            if root.catalog.sub_container(NAMEID_STORAGE).is_some() {
                let root_nameid = root.handle.open_sub_container(NAMEID_STORAGE)?;
                session.with_provider(|p| p.copy_subtree(root_nameid.id(), nameid.id()))?;
            } else {
                debug!("No named property map to copy from {}", root.catalog.path());
            }
            drop(nameid);

            let table = match self.properties().table() {
                Some(table) => promote_property_table(table)?,
                None => {
                    return Err(io::Error::new(
                        io::ErrorKind::InvalidData,
                        "Embedded message has no property table",
                    ));
                }
            };
            session.with_provider(|p| p.delete_element(dst.id(), PROPERTY_TABLE))?;
            let stream = dst.create_stream(PROPERTY_TABLE)?;
            session.with_provider(|p| p.write_all(stream.id(), &table))?;
        }

        session.with_provider(|p| {
            p.commit(dst.id())?;
            p.backing_bytes(dst.id())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn promote() {
        let mut table: Vec<u8> = (0u8..24).collect();
        table.extend_from_slice(&[0xaa; 16]);
        let out = promote_property_table(&table).unwrap();
        assert_eq!(out.len(), 48);
        assert_eq!(&out[..24], &table[..24]);
        assert_eq!(&out[24..32], &[0u8; 8]);
        assert_eq!(&out[32..], &[0xaa; 16]);
    }

    #[test]
    fn promote_header_only() {
        let out = promote_property_table(&[1u8; 24]).unwrap();
        assert_eq!(out, [[1u8; 24].as_slice(), &[0u8; 8]].concat());
    }

    #[test]
    fn promote_short() {
        assert!(promote_property_table(&[0u8; 23]).is_err());
        assert!(promote_property_table(&[]).is_err());
    }
}
