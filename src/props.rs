//! Message properties
//!
//! A property lives either in its own stream (or storage) named after its id
//! and type, or as a 16 byte record in the inline property table. The
//! [`Properties`] resolver looks in that order.
//!
//! Intended for internal use but publicly exposed for research purposes and low
//! level operations
pub mod nameid;
pub mod tags;

use crate::catalog::{CatalogEntry, ElementCatalog};
use crate::error::MsgError;
use crate::handles::Handle;
use crate::provider::{ContainerProvider, ElementKind};
use crate::text::{decode_codepage, decode_utf16};
use nameid::{NameIdMap, NamedTag};
use std::fmt;
use std::rc::Rc;
use std::str::FromStr;
use tags::*;
use time::OffsetDateTime;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Name prefix of property streams and storages
pub const SUBSTG_PREFIX: &str = "__substg1.0_";
/// Name of the inline property table stream
pub const PROPERTY_TABLE: &str = "__properties_version1.0";
/// Size of an inline property record
pub const RECORD_SIZE: usize = 16;

/// A 16 bit property identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PropertyId(pub u16);

impl fmt::Display for PropertyId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04X}", self.0)
    }
}

impl FromStr for PropertyId {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse_hex16(s).map(Self).ok_or(())
    }
}

fn parse_hex16(s: &str) -> Option<u16> {
    if s.len() == 4 && s.bytes().all(|b| b.is_ascii_hexdigit()) {
        u16::from_str_radix(s, 16).ok()
    } else {
        None
    }
}

/// Size of the header preceding the inline property records
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TableHeader {
    /// Top-level message: reserved, next ids, counts, reserved
    TopLevel,
    /// Message embedded in an attachment: reserved, next ids, counts
    Embedded,
    /// Recipient and attachment storages: reserved
    Child,
}

impl TableHeader {
    /// Header length in bytes
    pub fn size(self) -> usize {
        match self {
            Self::TopLevel => 32,
            Self::Embedded => 24,
            Self::Child => 8,
        }
    }
}

/// A resolved property value
pub enum PropertyValue<P: ContainerProvider> {
    /// 16 bit integer
    Int16(i16),
    /// 32 bit integer
    Int32(i32),
    /// 64 bit integer
    Int64(i64),
    /// Floating point value
    Float(f64),
    /// Error code
    Error(i32),
    /// Boolean
    Boolean(bool),
    /// Date and time (UTC)
    Time(OffsetDateTime),
    /// Narrow or Unicode string
    String(String),
    /// Binary data (also used for GUIDs)
    Binary(Vec<u8>),
    /// Multi-valued string
    Strings(Vec<String>),
    /// Multi-valued binary
    Binaries(Vec<Vec<u8>>),
    /// Independent copy of a nested storage
    Object(Handle<P>),
}

impl<P: ContainerProvider> PropertyValue<P> {
    /// A short name for the kind of value
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Int16(_) => "int16",
            Self::Int32(_) => "int32",
            Self::Int64(_) => "int64",
            Self::Float(_) => "float",
            Self::Error(_) => "error",
            Self::Boolean(_) => "boolean",
            Self::Time(_) => "datetime",
            Self::String(_) => "string",
            Self::Binary(_) => "binary",
            Self::Strings(_) => "strings",
            Self::Binaries(_) => "binaries",
            Self::Object(_) => "object",
        }
    }
}

impl<P: ContainerProvider> fmt::Debug for PropertyValue<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int16(v) => f.debug_tuple("Int16").field(v).finish(),
            Self::Int32(v) => f.debug_tuple("Int32").field(v).finish(),
            Self::Int64(v) => f.debug_tuple("Int64").field(v).finish(),
            Self::Float(v) => f.debug_tuple("Float").field(v).finish(),
            Self::Error(v) => f.debug_tuple("Error").field(v).finish(),
            Self::Boolean(v) => f.debug_tuple("Boolean").field(v).finish(),
            Self::Time(v) => f.debug_tuple("Time").field(v).finish(),
            Self::String(v) => f.debug_tuple("String").field(v).finish(),
            Self::Binary(v) => f.debug_tuple("Binary").field(v).finish(),
            Self::Strings(v) => f.debug_tuple("Strings").field(v).finish(),
            Self::Binaries(v) => f.debug_tuple("Binaries").field(v).finish(),
            Self::Object(v) => f.debug_tuple("Object").field(v).finish(),
        }
    }
}

/// A raw inline property record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct InlineRecord {
    /// Property type
    pub ptype: u16,
    /// Property id
    pub id: PropertyId,
    /// Property flags
    pub flags: u32,
    /// Raw value
    pub value: [u8; 8],
}

impl InlineRecord {
    fn from_bytes(buf: &[u8; RECORD_SIZE]) -> Self {
        let mut value = [0u8; 8];
        value.copy_from_slice(&buf[8..16]);
        Self {
            ptype: u16::from_le_bytes([buf[0], buf[1]]),
            id: PropertyId(u16::from_le_bytes([buf[2], buf[3]])),
            flags: u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]),
            value,
        }
    }
}

/// Scans an inline property table for the first record with the given id
///
/// With `want` set, records of other types are skipped. Errors describe why
/// the table is malformed
pub fn find_inline_record(
    table: &[u8],
    header_len: usize,
    id: PropertyId,
    want: Option<u16>,
) -> Result<Option<InlineRecord>, String> {
    if table.len() < header_len {
        return Err(format!(
            "table is {} bytes long, shorter than its {header_len} bytes header",
            table.len()
        ));
    }
    let mut offset = header_len;
    while offset < table.len() {
        let rec: &[u8; RECORD_SIZE] = table
            .get(offset..offset + RECORD_SIZE)
            .and_then(|r| r.try_into().ok())
            .ok_or_else(|| format!("truncated record at offset {offset}"))?;
        let rec = InlineRecord::from_bytes(rec);
        if rec.id == id && want.is_none_or(|t| t == rec.ptype) {
            return Ok(Some(rec));
        }
        offset += RECORD_SIZE;
    }
    Ok(None)
}

/// Translates a windows FILETIME to a UTC [datetime](OffsetDateTime)
///
/// Returns None if the date is out of range
pub fn filetime_to_datetime(ftime: u64) -> Option<OffsetDateTime> {
    let ftime = i128::from(ftime).checked_sub(116444736000000000)?;
    OffsetDateTime::from_unix_timestamp_nanos(ftime * 100).ok()
}

/// Decodes the value of an inline record
pub fn decode_inline<P: ContainerProvider>(
    rec: &InlineRecord,
) -> Result<Option<PropertyValue<P>>, MsgError> {
    let v = &rec.value;
    let dword = [v[0], v[1], v[2], v[3]];
    let value = match rec.ptype {
        PT_UNSPECIFIED => return Ok(None),
        PT_I2 => PropertyValue::Int16(i16::from_le_bytes([v[0], v[1]])),
        PT_LONG => PropertyValue::Int32(i32::from_le_bytes(dword)),
        PT_I8 => PropertyValue::Int64(i64::from_le_bytes(*v)),
        PT_FLOAT => PropertyValue::Float(f64::from(f32::from_le_bytes(dword))),
        PT_DOUBLE => PropertyValue::Float(f64::from_le_bytes(*v)),
        PT_ERROR => PropertyValue::Error(i32::from_le_bytes(dword)),
        PT_BOOLEAN => PropertyValue::Boolean(dword != [0u8; 4]),
        PT_SYSTIME => match filetime_to_datetime(u64::from_le_bytes(*v)) {
            Some(t) => PropertyValue::Time(t),
            None => {
                debug!("Property {} holds an out of range time", rec.id);
                return Ok(None);
            }
        },
        ptype if is_variable_length(ptype) => {
            debug!("Property {} (type {ptype:04X}) has no value stream", rec.id);
            return Ok(None);
        }
        ptype => {
            return Err(MsgError::UnsupportedPropertyType { id: rec.id, ptype });
        }
    };
    Ok(Some(value))
}

/// The parts of a property element name
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ElementName {
    /// Property id
    pub id: PropertyId,
    /// Property type
    pub ptype: u16,
    /// Value index of multi-valued properties
    pub index: Option<u32>,
}

/// Splits a `__substg1.0_IIIITTTT[-NNNNNNNN]` name
pub fn parse_element_name(name: &str) -> Option<ElementName> {
    let suffix = name.strip_prefix(SUBSTG_PREFIX)?;
    let id = PropertyId(parse_hex16(suffix.get(0..4)?)?);
    let ptype = parse_hex16(suffix.get(4..8)?)?;
    let index = match suffix.get(8..)? {
        "" => None,
        rest => {
            let idx = rest.strip_prefix('-')?;
            if idx.len() != 8 || !idx.bytes().all(|b| b.is_ascii_hexdigit()) {
                return None;
            }
            Some(u32::from_str_radix(idx, 16).ok()?)
        }
    };
    Some(ElementName { id, ptype, index })
}

/// Property resolver for a single container
pub struct Properties<P: ContainerProvider> {
    handle: Handle<P>,
    catalog: Rc<ElementCatalog>,
    table: Option<Rc<[u8]>>,
    header: TableHeader,
    codepage: u16,
    names: Rc<NameIdMap>,
}

impl<P: ContainerProvider> Clone for Properties<P> {
    fn clone(&self) -> Self {
        Self {
            handle: self.handle.clone(),
            catalog: self.catalog.clone(),
            table: self.table.clone(),
            header: self.header,
            codepage: self.codepage,
            names: self.names.clone(),
        }
    }
}

impl<P: ContainerProvider> Properties<P> {
    /// Creates a resolver over a cataloged container
    ///
    /// The inline property table, if any, is read here
    pub fn new(
        handle: Handle<P>,
        catalog: Rc<ElementCatalog>,
        header: TableHeader,
        names: Rc<NameIdMap>,
    ) -> Result<Self, MsgError> {
        let table = if catalog.stream(PROPERTY_TABLE).is_some() {
            let data = handle
                .read_stream(PROPERTY_TABLE)
                .map_err(|e| MsgError::read(format!("{}{PROPERTY_TABLE}", catalog.path()), e))?;
            Some(Rc::from(data))
        } else {
            debug!("No property table in {}", catalog.path());
            None
        };
        Ok(Self {
            handle,
            catalog,
            table,
            header,
            codepage: 1252,
            names,
        })
    }

    /// Catalogs a container and creates a resolver over it
    pub fn open(
        handle: Handle<P>,
        path: &str,
        header: TableHeader,
        names: Rc<NameIdMap>,
    ) -> Result<Self, MsgError> {
        let catalog = Rc::new(ElementCatalog::build(&handle, path)?);
        Self::new(handle, catalog, header, names)
    }

    /// Sets the code page used for narrow strings
    pub fn with_codepage(mut self, codepage: u16) -> Self {
        self.codepage = codepage;
        self
    }

    /// The container handle
    pub fn handle(&self) -> &Handle<P> {
        &self.handle
    }

    /// The container catalog
    pub fn catalog(&self) -> &ElementCatalog {
        &self.catalog
    }

    /// The container path
    pub fn path(&self) -> &str {
        self.catalog.path()
    }

    /// The inline table header size in use
    pub fn header(&self) -> TableHeader {
        self.header
    }

    /// The code page used for narrow strings
    pub fn codepage(&self) -> u16 {
        self.codepage
    }

    /// The named property map in use
    pub fn names(&self) -> &Rc<NameIdMap> {
        &self.names
    }

    /// The raw inline property table
    pub fn table(&self) -> Option<&[u8]> {
        self.table.as_deref()
    }

    /// Resolves a property
    ///
    /// Returns `Ok(None)` if the property is absent
    pub fn resolve(&self, id: PropertyId) -> Result<Option<PropertyValue<P>>, MsgError> {
        self.resolve_filtered(id, None)
    }

    /// Resolves a property, only considering values of the given type
    pub fn resolve_as(
        &self,
        id: PropertyId,
        ptype: u16,
    ) -> Result<Option<PropertyValue<P>>, MsgError> {
        self.resolve_filtered(id, Some(ptype))
    }

    fn resolve_filtered(
        &self,
        id: PropertyId,
        want: Option<u16>,
    ) -> Result<Option<PropertyValue<P>>, MsgError> {
        if let Some((entry, name)) = self.find_element(id, want) {
            return self.decode_element(entry, name);
        }
        let Some(table) = &self.table else {
            return Ok(None);
        };
        match find_inline_record(table, self.header.size(), id, want) {
            Ok(Some(rec)) => decode_inline(&rec),
            Ok(None) => Ok(None),
            Err(reason) => Err(MsgError::malformed(
                format!("{}{PROPERTY_TABLE}", self.path()),
                reason,
            )),
        }
    }

    /// Finds the element holding a property, plain names first
    fn find_element(
        &self,
        id: PropertyId,
        want: Option<u16>,
    ) -> Option<(&CatalogEntry, ElementName)> {
        let mut indexed = None;
        for entry in self.catalog.entries() {
            let Some(name) = parse_element_name(&entry.name) else {
                continue;
            };
            if name.id != id || want.is_some_and(|t| t != name.ptype) {
                continue;
            }
            if name.index.is_none() {
                return Some((entry, name));
            }
            if indexed.is_none() {
                indexed = Some((entry, name));
            }
        }
        indexed
    }

    fn read_element(&self, name: &str) -> Result<Vec<u8>, MsgError> {
        self.handle
            .read_stream(name)
            .map_err(|e| MsgError::read(format!("{}{name}", self.path()), e))
    }

    fn decode_element(
        &self,
        entry: &CatalogEntry,
        name: ElementName,
    ) -> Result<Option<PropertyValue<P>>, MsgError> {
        let value = match name.ptype {
            PT_UNSPECIFIED => return Ok(None),
            PT_MV_UNICODE | PT_MV_STRING8 | PT_MV_BINARY => {
                self.read_multi(name.id, name.ptype)?
            }
            PT_OBJECT if entry.kind == ElementKind::SubContainer => {
                let path = format!("{}{}", self.path(), entry.name);
                let storage = self
                    .handle
                    .open_sub_container(&entry.name)
                    .map_err(|e| MsgError::read(&path, e))?;
                let clone = storage
                    .clone_subtree()
                    .map_err(|e| MsgError::read(&path, e))?;
                PropertyValue::Object(clone)
            }
            PT_OBJECT | PT_BINARY | PT_CLSID => {
                PropertyValue::Binary(self.read_element(&entry.name)?)
            }
            PT_STRING8 => {
                let data = self.read_element(&entry.name)?;
                PropertyValue::String(decode_codepage(&data, self.codepage))
            }
            PT_UNICODE => PropertyValue::String(decode_utf16(&self.read_element(&entry.name)?)),
            ptype => {
                return Err(MsgError::UnsupportedPropertyType { id: name.id, ptype });
            }
        };
        Ok(Some(value))
    }

    /// Collects every value of a multi-valued property, in index order
    fn read_multi(&self, id: PropertyId, ptype: u16) -> Result<PropertyValue<P>, MsgError> {
        let mut parts: Vec<(u32, &str)> = self
            .catalog
            .streams()
            .filter_map(|e| {
                let name = parse_element_name(&e.name)?;
                if name.id == id && name.ptype == ptype {
                    Some((name.index?, e.name.as_str()))
                } else {
                    None
                }
            })
            .collect();
        parts.sort_by_key(|(index, _)| *index);
        let mut values = Vec::with_capacity(parts.len());
        for (_, name) in parts {
            values.push(self.read_element(name)?);
        }
        Ok(match ptype {
            PT_MV_BINARY => PropertyValue::Binaries(values),
            PT_MV_STRING8 => PropertyValue::Strings(
                values
                    .iter()
                    .map(|v| decode_codepage(v, self.codepage))
                    .collect(),
            ),
            _ => PropertyValue::Strings(values.iter().map(|v| decode_utf16(v)).collect()),
        })
    }

    fn typed<T, F>(
        &self,
        id: PropertyId,
        expected: &'static str,
        pick: F,
    ) -> Result<Option<T>, MsgError>
    where
        F: FnOnce(PropertyValue<P>) -> Result<T, PropertyValue<P>>,
    {
        match self.resolve(id)? {
            None => Ok(None),
            Some(value) => pick(value)
                .map(Some)
                .map_err(|value| MsgError::PropertyTypeMismatch {
                    id,
                    expected,
                    found: value.kind(),
                }),
        }
    }

    /// Resolves a string property
    pub fn string(&self, id: PropertyId) -> Result<Option<String>, MsgError> {
        self.typed(id, "string", |v| match v {
            PropertyValue::String(s) => Ok(s),
            v => Err(v),
        })
    }

    /// Resolves a 16 bit integer property
    pub fn int16(&self, id: PropertyId) -> Result<Option<i16>, MsgError> {
        self.typed(id, "int16", |v| match v {
            PropertyValue::Int16(n) => Ok(n),
            v => Err(v),
        })
    }

    /// Resolves a 32 bit integer property (16 bit values are widened)
    pub fn int32(&self, id: PropertyId) -> Result<Option<i32>, MsgError> {
        self.typed(id, "int32", |v| match v {
            PropertyValue::Int32(n) => Ok(n),
            PropertyValue::Int16(n) => Ok(i32::from(n)),
            v => Err(v),
        })
    }

    /// Resolves a date-time property
    pub fn datetime(&self, id: PropertyId) -> Result<Option<OffsetDateTime>, MsgError> {
        self.typed(id, "datetime", |v| match v {
            PropertyValue::Time(t) => Ok(t),
            v => Err(v),
        })
    }

    /// Resolves a boolean property
    pub fn boolean(&self, id: PropertyId) -> Result<Option<bool>, MsgError> {
        self.typed(id, "boolean", |v| match v {
            PropertyValue::Boolean(b) => Ok(b),
            v => Err(v),
        })
    }

    /// Resolves a binary property
    pub fn bytes(&self, id: PropertyId) -> Result<Option<Vec<u8>>, MsgError> {
        self.typed(id, "binary", |v| match v {
            PropertyValue::Binary(b) => Ok(b),
            v => Err(v),
        })
    }

    /// Resolves a multi-valued string property
    pub fn strings(&self, id: PropertyId) -> Result<Option<Vec<String>>, MsgError> {
        self.typed(id, "strings", |v| match v {
            PropertyValue::Strings(s) => Ok(s),
            v => Err(v),
        })
    }

    /// Resolves an object property into an independent container
    pub fn object(&self, id: PropertyId) -> Result<Option<Handle<P>>, MsgError> {
        self.typed(id, "object", |v| match v {
            PropertyValue::Object(h) => Ok(h),
            v => Err(v),
        })
    }

    /// Returns the id assigned to a named property in this document
    pub fn named_id(&self, tag: &NamedTag) -> Option<PropertyId> {
        self.names.lookup(tag)
    }

    /// Resolves a named property with one of the typed accessors
    ///
    /// ```ignore
    /// let keywords = props.named(&tags::KEYWORDS, Properties::strings)?;
    /// ```
    pub fn named<T, F>(&self, tag: &NamedTag, get: F) -> Result<Option<T>, MsgError>
    where
        F: FnOnce(&Self, PropertyId) -> Result<Option<T>, MsgError>,
    {
        match self.named_id(tag) {
            Some(id) => get(self, id),
            None => Ok(None),
        }
    }
}

impl<P: ContainerProvider> fmt::Debug for Properties<P> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> Result<(), fmt::Error> {
        f.debug_struct("Properties")
            .field("path", &self.path())
            .field("header", &self.header)
            .field("codepage", &self.codepage)
            .field("handle", &self.handle)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cfb_provider::CfbProvider;

    fn record(ptype: u16, id: u16, value: u64) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        out.extend_from_slice(&ptype.to_le_bytes());
        out.extend_from_slice(&id.to_le_bytes());
        out.extend_from_slice(&[6, 0, 0, 0]);
        out.extend_from_slice(&value.to_le_bytes());
        out
    }

    fn decode(ptype: u16, value: u64) -> Result<Option<PropertyValue<CfbProvider>>, MsgError> {
        let table = record(ptype, 0x1234, value);
        let rec = find_inline_record(&table, 0, PropertyId(0x1234), None)
            .unwrap()
            .unwrap();
        decode_inline(&rec)
    }

    #[test]
    fn element_names() {
        assert_eq!(
            parse_element_name("__substg1.0_0037001F"),
            Some(ElementName {
                id: PropertyId(0x0037),
                ptype: PT_UNICODE,
                index: None
            })
        );
        assert_eq!(
            parse_element_name("__substg1.0_8002101F-00000002"),
            Some(ElementName {
                id: PropertyId(0x8002),
                ptype: PT_MV_UNICODE,
                index: Some(2)
            })
        );
        assert_eq!(
            parse_element_name("__substg1.0_3701000d").map(|n| n.ptype),
            Some(PT_OBJECT)
        );
        assert_eq!(parse_element_name("__substg1.0_0037"), None);
        assert_eq!(parse_element_name("__substg1.0_0037001F-2"), None);
        assert_eq!(parse_element_name("__substg1.0_00G7001F"), None);
        assert_eq!(parse_element_name("__properties_version1.0"), None);
    }

    #[test]
    fn property_id_text() {
        assert_eq!(PropertyId(0x3a).to_string(), "003A");
        assert_eq!("0c1f".parse::<PropertyId>(), Ok(PropertyId(0x0C1F)));
        assert!("+c1f".parse::<PropertyId>().is_err());
    }

    #[test]
    fn inline_scan() {
        let mut table = vec![0u8; 24];
        table.extend(record(PT_LONG, 0x0C15, 2));
        table.extend(record(PT_BOOLEAN, 0x0C15, 1));
        table.extend(record(PT_BOOLEAN, 0x7FFE, 1));
        let rec = find_inline_record(&table, 24, PropertyId(0x0C15), None)
            .unwrap()
            .unwrap();
        assert_eq!(rec.ptype, PT_LONG);
        assert_eq!(rec.flags, 6);
        let rec = find_inline_record(&table, 24, PropertyId(0x0C15), Some(PT_BOOLEAN))
            .unwrap()
            .unwrap();
        assert_eq!(rec.ptype, PT_BOOLEAN);
        assert!(find_inline_record(&table, 24, PropertyId(0x0037), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn malformed_tables() {
        assert!(find_inline_record(&[0u8; 20], 24, PropertyId(1), None).is_err());
        let mut table = vec![0u8; 32];
        table.extend(record(PT_LONG, 0x0001, 1));
        table.extend_from_slice(&[0u8; 7]);
        // The match comes before the truncated record
        assert!(find_inline_record(&table, 32, PropertyId(1), None)
            .unwrap()
            .is_some());
        assert!(find_inline_record(&table, 32, PropertyId(2), None).is_err());
        // An empty table with only a header is fine
        assert!(find_inline_record(&[0u8; 32], 32, PropertyId(2), None)
            .unwrap()
            .is_none());
    }

    #[test]
    fn inline_values() {
        assert!(matches!(decode(PT_I2, 0xffff), Ok(Some(PropertyValue::Int16(-1)))));
        assert!(matches!(decode(PT_LONG, 0x1_0000_0003), Ok(Some(PropertyValue::Int32(3)))));
        assert!(matches!(decode(PT_BOOLEAN, 0x100), Ok(Some(PropertyValue::Boolean(true)))));
        assert!(matches!(
            decode(PT_BOOLEAN, 0xff_0000_0000),
            Ok(Some(PropertyValue::Boolean(false)))
        ));
        assert!(matches!(decode(PT_I8, u64::MAX), Ok(Some(PropertyValue::Int64(-1)))));
        assert!(matches!(decode(PT_UNSPECIFIED, 5), Ok(None)));
        assert!(matches!(decode(PT_UNICODE, 12), Ok(None)));
        assert!(matches!(
            decode(0x0007, 0),
            Err(MsgError::UnsupportedPropertyType { ptype: 0x0007, .. })
        ));
    }

    #[test]
    fn filetimes() {
        // 2024-01-02T03:04:05Z
        let ft = (1704164645u64 * 10_000_000) + 116444736000000000;
        let t = match decode(PT_SYSTIME, ft) {
            Ok(Some(PropertyValue::Time(t))) => t,
            other => panic!("unexpected {other:?}"),
        };
        assert_eq!(t.unix_timestamp(), 1704164645);
        assert_eq!(t.offset(), time::UtcOffset::UTC);
        assert!(filetime_to_datetime(0).is_some());
        assert!(filetime_to_datetime(u64::MAX).is_none());
    }
}
