#![allow(dead_code)]
//! Helpers to build MSG documents in memory
use msgreader::props::nameid::Guid;
use msgreader::props::tags::*;
use msgreader::{CfbProvider, ContainerProvider, ElementInfo, HandleId};
use std::collections::HashMap;
use std::io::{self, Cursor, Write};
use std::path::Path;
use uuid::Uuid;

pub const TOP_LEVEL: usize = 32;
pub const EMBEDDED: usize = 24;
pub const CHILD: usize = 8;

/// Converts a unix timestamp to a FILETIME
pub fn filetime(unix: i64) -> u64 {
    u64::try_from(unix * 10_000_000 + 116444736000000000).unwrap()
}

pub fn utf16(s: &str) -> Vec<u8> {
    let mut out: Vec<u8> = s.encode_utf16().flat_map(|c| c.to_le_bytes()).collect();
    out.extend_from_slice(&[0, 0]);
    out
}

/// A storage under construction
pub struct MsgBuilder {
    header_len: usize,
    records: Vec<u8>,
    streams: Vec<(String, Vec<u8>)>,
    storages: Vec<(String, MsgBuilder)>,
    table: bool,
    clsid: Option<Uuid>,
}

impl MsgBuilder {
    pub fn new(header_len: usize) -> Self {
        Self {
            header_len,
            records: Vec::new(),
            streams: Vec::new(),
            storages: Vec::new(),
            table: true,
            clsid: None,
        }
    }

    pub fn top_level() -> Self {
        Self::new(TOP_LEVEL)
    }

    pub fn embedded() -> Self {
        Self::new(EMBEDDED)
    }

    pub fn child() -> Self {
        Self::new(CHILD)
    }

    /// Omits the property table stream
    pub fn without_table(mut self) -> Self {
        self.table = false;
        self
    }

    /// Tags the storage with a class id
    pub fn clsid(mut self, clsid: Uuid) -> Self {
        self.clsid = Some(clsid);
        self
    }

    pub fn record(mut self, ptype: u16, id: u16, value: u64) -> Self {
        self.records.extend_from_slice(&ptype.to_le_bytes());
        self.records.extend_from_slice(&id.to_le_bytes());
        self.records.extend_from_slice(&6u32.to_le_bytes());
        self.records.extend_from_slice(&value.to_le_bytes());
        self
    }

    pub fn raw_table_bytes(mut self, data: &[u8]) -> Self {
        self.records.extend_from_slice(data);
        self
    }

    pub fn stream(mut self, name: &str, data: &[u8]) -> Self {
        self.streams.push((name.to_string(), data.to_vec()));
        self
    }

    pub fn storage(mut self, name: &str, storage: MsgBuilder) -> Self {
        self.storages.push((name.to_string(), storage));
        self
    }

    fn variable(self, id: u16, ptype: u16, data: Vec<u8>) -> Self {
        let len = data.len() as u64;
        self.stream(&format!("__substg1.0_{id:04X}{ptype:04X}"), &data)
            .record(ptype, id, len)
    }

    pub fn unicode(self, id: u16, value: &str) -> Self {
        self.variable(id, PT_UNICODE, utf16(value))
    }

    pub fn string8(self, id: u16, value: &[u8]) -> Self {
        let mut data = value.to_vec();
        data.push(0);
        self.variable(id, PT_STRING8, data)
    }

    pub fn binary(self, id: u16, value: &[u8]) -> Self {
        self.variable(id, PT_BINARY, value.to_vec())
    }

    /// A multi-valued Unicode property; values are given with their index
    pub fn multi_unicode(mut self, id: u16, values: &[(u32, &str)]) -> Self {
        for (index, value) in values {
            let mut data = utf16(value);
            data.truncate(data.len() - 2);
            self = self.stream(&format!("__substg1.0_{id:04X}101F-{index:08X}"), &data);
        }
        let len = (values.len() * 4) as u64;
        self.stream(&format!("__substg1.0_{id:04X}101F"), &[0u8; 4])
            .record(PT_MV_UNICODE, id, len)
    }

    pub fn long(self, id: u16, value: i32) -> Self {
        self.record(PT_LONG, id, u64::from(value as u32))
    }

    pub fn boolean(self, id: u16, value: bool) -> Self {
        self.record(PT_BOOLEAN, id, u64::from(value))
    }

    pub fn time(self, id: u16, unix: i64) -> Self {
        self.record(PT_SYSTIME, id, filetime(unix))
    }

    pub fn recipient(self, index: u32, recipient: MsgBuilder) -> Self {
        self.storage(&format!("__recip_version1.0_#{index:08X}"), recipient)
    }

    pub fn attachment(self, index: u32, attachment: MsgBuilder) -> Self {
        self.storage(&format!("__attach_version1.0_#{index:08X}"), attachment)
    }

    /// Adds the embedded message object to an attachment
    pub fn embedded_message(self, message: MsgBuilder) -> Self {
        self.long(0x3705, 5)
            .storage("__substg1.0_3701000D", message)
            .record(PT_OBJECT, 0x3701, 0)
    }

    /// Adds the named property map used by the tests
    ///
    /// | property        | id     |
    /// |-----------------|--------|
    /// | FlagRequest     | 0x8000 |
    /// | TaskStatus      | 0x8001 |
    /// | TaskStartDate   | 0x8002 |
    /// | TaskDueDate     | 0x8003 |
    /// | TaskComplete    | 0x8004 |
    /// | Keywords        | 0x8005 |
    pub fn name_map(self) -> Self {
        let guids = [PSETID_COMMON, PSETID_TASK]
            .iter()
            .flat_map(Guid::to_le_bytes)
            .collect::<Vec<u8>>();
        let keywords = utf16("Keywords");
        let keywords = &keywords[..keywords.len() - 2];
        let mut strings = (keywords.len() as u32).to_le_bytes().to_vec();
        strings.extend_from_slice(keywords);
        let entry = |name: u32, guid: u16, is_string: bool, index: u16| {
            let mut out = name.to_le_bytes().to_vec();
            out.extend_from_slice(&((guid << 1) | u16::from(is_string)).to_le_bytes());
            out.extend_from_slice(&index.to_le_bytes());
            out
        };
        let entries = [
            entry(0x8530, 3, false, 0),
            entry(0x8101, 4, false, 1),
            entry(0x8104, 4, false, 2),
            entry(0x8105, 4, false, 3),
            entry(0x811C, 4, false, 4),
            entry(0, 2, true, 5),
        ]
        .concat();
        let map = MsgBuilder::child()
            .without_table()
            .stream("__substg1.0_00020102", &guids)
            .stream("__substg1.0_00030102", &entries)
            .stream("__substg1.0_00040102", &strings);
        self.storage("__nameid_version1.0", map)
    }

    fn table_bytes(&self) -> Vec<u8> {
        let mut table = vec![0u8; self.header_len];
        table.extend_from_slice(&self.records);
        table
    }

    fn write_into(&self, doc: &mut cfb::CompoundFile<Cursor<Vec<u8>>>, path: &Path) {
        if let Some(clsid) = self.clsid {
            doc.set_storage_clsid(path, clsid).unwrap();
        }
        if self.table {
            let mut s = doc.create_stream(path.join("__properties_version1.0")).unwrap();
            s.write_all(&self.table_bytes()).unwrap();
            s.flush().unwrap();
        }
        for (name, data) in &self.streams {
            let mut s = doc.create_stream(path.join(name)).unwrap();
            s.write_all(data).unwrap();
            s.flush().unwrap();
        }
        for (name, storage) in &self.storages {
            let sub = path.join(name);
            doc.create_storage(&sub).unwrap();
            storage.write_into(doc, &sub);
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut doc = cfb::CompoundFile::create(Cursor::new(Vec::new())).unwrap();
        self.write_into(&mut doc, Path::new("/"));
        doc.flush().unwrap();
        doc.into_inner().into_inner()
    }
}

/// A [`CfbProvider`] wrapper which records handle traffic
#[derive(Default)]
pub struct RecordingProvider {
    inner: CfbProvider,
    pub issued: Vec<HandleId>,
    pub releases: HashMap<HandleId, usize>,
    /// Stream reads of elements with this name fail
    pub fail_reads_of: Option<String>,
    stream_names: HashMap<HandleId, String>,
}

impl RecordingProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_reads_of(name: &str) -> Self {
        Self {
            fail_reads_of: Some(name.to_string()),
            ..Self::default()
        }
    }

    fn record(&mut self, r: io::Result<HandleId>) -> io::Result<HandleId> {
        if let Ok(id) = r {
            self.issued.push(id);
        }
        r
    }

    /// Handles issued but never released
    pub fn leaked(&self) -> Vec<HandleId> {
        self.issued
            .iter()
            .filter(|id| !self.releases.contains_key(id))
            .copied()
            .collect()
    }

    /// Handles released more than once
    pub fn double_released(&self) -> Vec<HandleId> {
        self.releases
            .iter()
            .filter(|(_, count)| **count > 1)
            .map(|(id, _)| *id)
            .collect()
    }
}

impl ContainerProvider for RecordingProvider {
    fn open(&mut self, data: &[u8]) -> io::Result<HandleId> {
        let r = self.inner.open(data);
        self.record(r)
    }

    fn enumerate_children(&mut self, container: HandleId) -> io::Result<Vec<ElementInfo>> {
        self.inner.enumerate_children(container)
    }

    fn open_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let r = self.inner.open_stream(container, name);
        if let Ok(id) = r {
            self.stream_names.insert(id, name.to_string());
        }
        self.record(r)
    }

    fn read_all(&mut self, stream: HandleId) -> io::Result<Vec<u8>> {
        if self.fail_reads_of.is_some()
            && self.stream_names.get(&stream) == self.fail_reads_of.as_ref()
        {
            return Err(io::Error::other("injected read failure"));
        }
        self.inner.read_all(stream)
    }

    fn open_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let r = self.inner.open_sub_container(container, name);
        self.record(r)
    }

    fn create_container(&mut self) -> io::Result<HandleId> {
        let r = self.inner.create_container();
        self.record(r)
    }

    fn create_sub_container(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let r = self.inner.create_sub_container(container, name);
        self.record(r)
    }

    fn copy_subtree(&mut self, src: HandleId, dst: HandleId) -> io::Result<()> {
        self.inner.copy_subtree(src, dst)
    }

    fn commit(&mut self, container: HandleId) -> io::Result<()> {
        self.inner.commit(container)
    }

    fn create_stream(&mut self, container: HandleId, name: &str) -> io::Result<HandleId> {
        let r = self.inner.create_stream(container, name);
        self.record(r)
    }

    fn write_all(&mut self, stream: HandleId, data: &[u8]) -> io::Result<()> {
        self.inner.write_all(stream, data)
    }

    fn delete_element(&mut self, container: HandleId, name: &str) -> io::Result<()> {
        self.inner.delete_element(container, name)
    }

    fn clone_subtree(&mut self, container: HandleId) -> io::Result<HandleId> {
        let r = self.inner.clone_subtree(container);
        self.record(r)
    }

    fn backing_bytes(&mut self, container: HandleId) -> io::Result<Vec<u8>> {
        self.inner.backing_bytes(container)
    }

    fn release(&mut self, handle: HandleId) -> io::Result<()> {
        *self.releases.entry(handle).or_default() += 1;
        self.stream_names.remove(&handle);
        self.inner.release(handle)
    }
}

/// A message with one of everything
pub fn sample_message() -> MsgBuilder {
    MsgBuilder::top_level()
        .name_map()
        .unicode(0x001A, "IPM.Note")
        .unicode(0x0037, "Quarterly report")
        .unicode(0x0C1A, "Alice Sender")
        .unicode(0x0C1F, "alice@example.com")
        .unicode(0x1000, "See attached")
        .long(0x3FFD, 1252)
        .recipient(
            0,
            MsgBuilder::child()
                .unicode(0x3001, "Bob")
                .unicode(0x39FE, "bob@example.com")
                .long(0x0C15, 1),
        )
        .recipient(
            1,
            MsgBuilder::child()
                .unicode(0x3001, "Carol")
                .unicode(0x3003, "carol@example.com")
                .long(0x0C15, 2),
        )
        .attachment(
            0,
            MsgBuilder::child()
                .unicode(0x3707, "report.pdf")
                .unicode(0x370E, "application/pdf")
                .binary(0x3701, b"%PDF-1.4 fake")
                .long(0x3705, 1),
        )
        .attachment(
            1,
            MsgBuilder::child().unicode(0x3001, "Fwd: minutes").embedded_message(
                MsgBuilder::embedded()
                    .unicode(0x001A, "IPM.Note")
                    .unicode(0x0037, "Meeting minutes")
                    .unicode(0x0C1A, "Dave")
                    .unicode(0x0C1F, "dave@example.com")
                    .unicode(0x8000, "Follow up")
                    .long(0x1090, 2)
                    .long(0x0017, 2)
                    .recipient(
                        0,
                        MsgBuilder::child()
                            .unicode(0x3001, "Erin")
                            .unicode(0x39FE, "erin@example.com")
                            .long(0x0C15, 3),
                    )
                    .attachment(
                        0,
                        MsgBuilder::child()
                            .unicode(0x3704, "NOTES~1.TXT")
                            .binary(0x3701, b"notes")
                            .long(0x3705, 1),
                    ),
            ),
        )
}
