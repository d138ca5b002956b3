//! String decoding helpers
use encoding_rs::Encoding;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

/// Windows code page to encoding map (sorted by code page)
static CPMAP: &[(u16, &str)] = &[
    (866, "ibm866"),
    (874, "windows-874"),
    (932, "shift_jis"),
    (936, "gbk"),
    (949, "euc-kr"),
    (950, "big5"),
    (1200, "utf-16le"),
    (1201, "utf-16be"),
    (1250, "windows-1250"),
    (1251, "windows-1251"),
    (1252, "windows-1252"),
    (1253, "windows-1253"),
    (1254, "windows-1254"),
    (1255, "windows-1255"),
    (1256, "windows-1256"),
    (1257, "windows-1257"),
    (1258, "windows-1258"),
    (10000, "macintosh"),
    (10007, "x-mac-cyrillic"),
    (20127, "windows-1252"),
    (20866, "koi8-r"),
    (20932, "euc-jp"),
    (21866, "koi8-u"),
    (28591, "windows-1252"),
    (28592, "iso-8859-2"),
    (28593, "iso-8859-3"),
    (28594, "iso-8859-4"),
    (28595, "iso-8859-5"),
    (28596, "iso-8859-6"),
    (28597, "iso-8859-7"),
    (28598, "iso-8859-8"),
    (28603, "iso-8859-13"),
    (28605, "iso-8859-15"),
    (50220, "iso-2022-jp"),
    (51932, "euc-jp"),
    (51949, "euc-kr"),
    (54936, "gb18030"),
    (65001, "utf-8"),
];

/// Returns the encoding for a Windows code page
///
/// Unknown code pages fall back to Windows-1252
pub fn encoding_for_codepage(cp: u16) -> &'static Encoding {
    CPMAP
        .binary_search_by_key(&cp, |&(k, _)| k)
        .ok()
        .and_then(|i| Encoding::for_label(CPMAP[i].1.as_bytes()))
        .unwrap_or_else(|| {
            debug!("Unknown code page {cp}, using windows-1252");
            encoding_rs::WINDOWS_1252
        })
}

/// Decodes a narrow string and strips the trailing NULs
pub fn decode_codepage(data: &[u8], cp: u16) -> String {
    let (s, _, had_errors) = encoding_for_codepage(cp).decode(data);
    if had_errors {
        debug!("Invalid sequences in code page {cp} string");
    }
    strip_nuls(s.into_owned())
}

/// Decodes a UTF-16LE string and strips the trailing NULs
///
/// A stray odd byte at the end is dropped
pub fn decode_utf16(data: &[u8]) -> String {
    let data = &data[..data.len() & !1];
    let (s, had_errors) = encoding_rs::UTF_16LE.decode_without_bom_handling(data);
    if had_errors {
        debug!("Invalid sequences in UTF-16 string");
    }
    strip_nuls(s.into_owned())
}

fn strip_nuls(mut s: String) -> String {
    let len = s.trim_end_matches('\0').len();
    s.truncate(len);
    s
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cpmap_sorted() {
        let keys: Vec<u16> = CPMAP.iter().map(|(k, _)| *k).collect();
        let mut sorted = keys.clone();
        sorted.sort();
        sorted.dedup();
        assert_eq!(keys, sorted, "CPMAP is not sorted or has duplicates");
        for (_, label) in CPMAP.iter() {
            assert!(Encoding::for_label(label.as_bytes()).is_some(), "{label}");
        }
    }

    #[test]
    fn utf16() {
        assert_eq!(decode_utf16(b"h\0i\0\0\0"), "hi");
        assert_eq!(decode_utf16(b""), "");
        // lone trailing byte
        assert_eq!(decode_utf16(b"a\0b"), "a");
        assert_eq!(decode_utf16(b"a\0\0\0b"), "a");
        assert_eq!(decode_utf16(b"\xd8"), "");
    }

    #[test]
    fn codepages() {
        assert_eq!(decode_codepage(b"caf\xe9\0", 1252), "café");
        assert_eq!(decode_codepage(b"\xcf\xf0\xe8", 1251), "При");
        assert_eq!(decode_codepage(b"x\xc3\xa9", 65001), "xé");
        assert_eq!(decode_codepage(b"caf\xe9", 4242), "café");
    }
}
