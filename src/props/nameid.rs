//! Named property mapping
//!
//! Named properties have no fixed id: each document assigns them ids from
//! 0x8000 upwards and records the assignment in the `__nameid_version1.0`
//! storage of the top-level message
use super::PropertyId;
use crate::catalog::ElementCatalog;
use crate::error::MsgError;
use crate::handles::Handle;
use crate::provider::ContainerProvider;
use crate::text::decode_utf16;
use std::fmt;
use std::io;
use std::str::FromStr;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// The name of the named property mapping storage
pub const NAMEID_STORAGE: &str = "__nameid_version1.0";
const GUID_STREAM: &str = "__substg1.0_00020102";
const ENTRY_STREAM: &str = "__substg1.0_00030102";
const STRING_STREAM: &str = "__substg1.0_00040102";

/// A Win32 GUID
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Guid {
    data1: u32,
    data2: u16,
    data3: u16,
    data4: [u8; 8],
}

impl Guid {
    /// Creates a GUID from its fields
    pub const fn from_fields(data1: u32, data2: u16, data3: u16, data4: [u8; 8]) -> Self {
        Self {
            data1,
            data2,
            data3,
            data4,
        }
    }

    /// Creates a GUID from its 16 byte little endian representation
    pub fn from_le_bytes(bytes: &[u8; 16]) -> Self {
        let mut data4 = [0u8; 8];
        data4.copy_from_slice(&bytes[8..16]);
        Self {
            data1: u32::from_le_bytes([bytes[0], bytes[1], bytes[2], bytes[3]]),
            data2: u16::from_le_bytes([bytes[4], bytes[5]]),
            data3: u16::from_le_bytes([bytes[6], bytes[7]]),
            data4,
        }
    }

    /// Returns the 16 byte little endian representation
    pub fn to_le_bytes(&self) -> [u8; 16] {
        let mut out = [0u8; 16];
        out[0..4].copy_from_slice(&self.data1.to_le_bytes());
        out[4..6].copy_from_slice(&self.data2.to_le_bytes());
        out[6..8].copy_from_slice(&self.data3.to_le_bytes());
        out[8..16].copy_from_slice(&self.data4);
        out
    }
}

impl fmt::Display for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{:08x}-{:04x}-{:04x}-{:02x}{:02x}-",
            self.data1, self.data2, self.data3, self.data4[0], self.data4[1]
        )?;
        for b in &self.data4[2..] {
            write!(f, "{b:02x}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Guid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{{{self}}}")
    }
}

impl FromStr for Guid {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim_start_matches('{').trim_end_matches('}');
        let parts: Vec<&str> = s.split('-').collect();
        if parts.len() != 5
            || parts[0].len() != 8
            || parts[1].len() != 4
            || parts[2].len() != 4
            || parts[3].len() != 4
            || parts[4].len() != 12
        {
            return Err(());
        }
        let hex16 = |v: &str| u16::from_str_radix(v, 16).map_err(|_| ());
        let data1 = u32::from_str_radix(parts[0], 16).map_err(|_| ())?;
        let tail = format!("{}{}", parts[3], parts[4]);
        let mut data4 = [0u8; 8];
        for (i, b) in data4.iter_mut().enumerate() {
            *b = u8::from_str_radix(tail.get(i * 2..i * 2 + 2).ok_or(())?, 16).map_err(|_| ())?;
        }
        Ok(Self::from_fields(data1, hex16(parts[1])?, hex16(parts[2])?, data4))
    }
}

/// How a named property is identified within its property set
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NamedKey {
    /// Numeric id (LID)
    Lid(u32),
    /// String name
    Name(&'static str),
}

/// A named property: a property set and a key
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NamedTag {
    /// The property set
    pub guid: Guid,
    /// The key within the set
    pub key: NamedKey,
}

impl NamedTag {
    /// A numeric named property
    pub const fn lid(guid: Guid, lid: u32) -> Self {
        Self {
            guid,
            key: NamedKey::Lid(lid),
        }
    }
}

/// A property name as stored in the map
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PropertyName {
    /// Property number
    Numeric(u32),
    /// Property name
    Named(String),
}

/// A single mapping
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NameIdEntry {
    /// Property name or number
    pub name: PropertyName,
    /// Property set
    pub guid: Option<Guid>,
    /// Index (the property id is 0x8000 + index)
    pub index: u16,
}

impl NameIdEntry {
    /// The property id assigned to this entry
    pub fn property_id(&self) -> PropertyId {
        PropertyId(0x8000u16.wrapping_add(self.index))
    }

    fn matches(&self, tag: &NamedTag) -> bool {
        if self.guid != Some(tag.guid) {
            return false;
        }
        match (&self.name, &tag.key) {
            (PropertyName::Numeric(v), NamedKey::Lid(lid)) => v == lid,
            (PropertyName::Named(s), NamedKey::Name(name)) => s == name,
            _ => false,
        }
    }
}

/// The named property map of a document
#[derive(Debug, Clone, Default)]
pub struct NameIdMap(pub Vec<NameIdEntry>);

impl NameIdMap {
    /// Parses the map from the raw content of its three streams
    pub fn parse(guids: &[u8], entries: &[u8], strings: &[u8]) -> Result<Self, io::Error> {
        let guids: Vec<Guid> = guids
            .chunks_exact(16)
            .filter_map(|c| c.try_into().ok().map(Guid::from_le_bytes))
            .collect();
        let mut map = Vec::with_capacity(entries.len() / 8);
        for rec in entries.chunks_exact(8) {
            let name_id_or_offset = u32::from_le_bytes([rec[0], rec[1], rec[2], rec[3]]);
            let guid_and_kind = u16::from_le_bytes([rec[4], rec[5]]);
            let index = u16::from_le_bytes([rec[6], rec[7]]);
            let guid = match guid_and_kind >> 1 {
                0 => None,
                1 => Some(super::tags::PS_MAPI),
                2 => Some(super::tags::PS_PUBLIC_STRINGS),
                idx => guids.get(usize::from(idx) - 3).copied(),
            };
            let name = if guid_and_kind & 1 == 0 {
                PropertyName::Numeric(name_id_or_offset)
            } else {
                PropertyName::Named(read_name(strings, name_id_or_offset)?)
            };
            map.push(NameIdEntry { name, guid, index });
        }
        Ok(Self(map))
    }

    /// Loads the map from a message container
    ///
    /// A message without the mapping storage gets an empty map
    pub fn load<P: ContainerProvider>(
        container: &Handle<P>,
        catalog: &ElementCatalog,
    ) -> Result<Self, MsgError> {
        let path = format!("{}{NAMEID_STORAGE}/", catalog.path());
        if catalog.sub_container(NAMEID_STORAGE).is_none() {
            debug!("No named property map in {}", catalog.path());
            return Ok(Self::default());
        }
        let storage = container
            .open_sub_container(NAMEID_STORAGE)
            .map_err(|e| MsgError::read(&path, e))?;
        let nameid_catalog = ElementCatalog::build(&storage, &path)?;
        let read = |name: &str| -> Result<Vec<u8>, MsgError> {
            if nameid_catalog.stream(name).is_none() {
                return Ok(Vec::new());
            }
            storage
                .read_stream(name)
                .map_err(|e| MsgError::read(format!("{path}{name}"), e))
        };
        let guids = read(GUID_STREAM)?;
        let entries = read(ENTRY_STREAM)?;
        let strings = read(STRING_STREAM)?;
        Self::parse(&guids, &entries, &strings).map_err(|e| MsgError::read(&path, e))
    }

    /// Returns the property id assigned to a named property
    pub fn lookup(&self, tag: &NamedTag) -> Option<PropertyId> {
        self.0
            .iter()
            .find(|e| e.matches(tag))
            .map(NameIdEntry::property_id)
    }
}

fn read_name(strings: &[u8], offset: u32) -> Result<String, io::Error> {
    let start = usize::try_from(offset).unwrap_or(usize::MAX);
    let len = strings
        .get(start..start.saturating_add(4))
        .map(|b| u32::from_le_bytes([b[0], b[1], b[2], b[3]]))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Named property string offset {offset} out of bounds"),
            )
        })?;
    let data_start = start + 4;
    let data = usize::try_from(len)
        .ok()
        .and_then(|len| strings.get(data_start..data_start.checked_add(len)?))
        .ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::InvalidData,
                format!("Named property string at {offset} is truncated"),
            )
        })?;
    Ok(decode_utf16(data))
}

#[cfg(test)]
mod tests {
    use super::super::tags::*;
    use super::*;

    fn entry(name_or_offset: u32, guid_idx: u16, is_string: bool, index: u16) -> [u8; 8] {
        let mut out = [0u8; 8];
        out[0..4].copy_from_slice(&name_or_offset.to_le_bytes());
        out[4..6].copy_from_slice(&((guid_idx << 1) | u16::from(is_string)).to_le_bytes());
        out[6..8].copy_from_slice(&index.to_le_bytes());
        out
    }

    #[test]
    fn guid_text() {
        let g: Guid = "00062008-0000-0000-C000-000000000046".parse().unwrap();
        assert_eq!(g, PSETID_COMMON);
        assert_eq!(g.to_string(), "00062008-0000-0000-c000-000000000046");
        assert_eq!(Guid::from_le_bytes(&g.to_le_bytes()), g);
        assert!("00062008-0000-0000-C000".parse::<Guid>().is_err());
        assert!("0006200x-0000-0000-C000-000000000046".parse::<Guid>().is_err());
    }

    #[test]
    fn parse_map() {
        let guids = [PSETID_TASK.to_le_bytes(), PSETID_COMMON.to_le_bytes()].concat();
        let name: Vec<u8> = "Keywords"
            .encode_utf16()
            .flat_map(|c| c.to_le_bytes())
            .collect();
        let mut strings = (name.len() as u32).to_le_bytes().to_vec();
        strings.extend_from_slice(&name);
        let entries = [
            entry(0x8101, 3, false, 0),
            entry(0x8530, 4, false, 1),
            entry(0, 2, true, 2),
        ]
        .concat();
        let map = NameIdMap::parse(&guids, &entries, &strings).unwrap();
        assert_eq!(map.0.len(), 3);
        assert_eq!(map.lookup(&TASK_STATUS), Some(PropertyId(0x8000)));
        assert_eq!(map.lookup(&FLAG_REQUEST), Some(PropertyId(0x8001)));
        assert_eq!(map.lookup(&KEYWORDS), Some(PropertyId(0x8002)));
        assert_eq!(map.lookup(&TASK_DUE_DATE), None);
    }

    #[test]
    fn bad_string_offset() {
        let entries = entry(100, 2, true, 0);
        assert!(NameIdMap::parse(&[], &entries, &[0u8; 8]).is_err());
        let entries = entry(0, 2, true, 0);
        assert!(NameIdMap::parse(&[], &entries, &[0xff, 0, 0, 0, 1, 2]).is_err());
    }
}
