//! Compressed RTF ([MS-OXRTFCP]) and the RTF conversion seam
use std::io;
#[allow(unused_imports)]
use tracing::{debug, error, info, instrument, warn};

static DICT_INIT: &[u8; 207] =
    b"{\\rtf1\\ansi\\mac\\deff0\\deftab720{\\fonttbl;}{\\f0\\fnil \\froman \\fswiss \\fmodern \\fscript \\fdecor MS Sans SerifSymbolArialTimes New RomanCourier{\\colortbl\\red0\\green0\\blue0\r\n\\par \\pard\\plain\\f0\\fs20\\b\\i\\u\\tab\\tx";

const DICT_SIZE: usize = 4096;
const HEADER_SIZE: usize = 16;
const COMPRESSED: u32 = 0x75465a4c; // "LZFu"
const UNCOMPRESSED: u32 = 0x414c454d; // "MELA"

const fn crc_table() -> [u32; 256] {
    let mut table = [0u32; 256];
    let mut i = 0;
    while i < 256 {
        let mut crc = i as u32;
        let mut bit = 0;
        while bit < 8 {
            crc = if crc & 1 != 0 {
                (crc >> 1) ^ 0xedb88320
            } else {
                crc >> 1
            };
            bit += 1;
        }
        table[i] = crc;
        i += 1;
    }
    table
}

static CRC_LUT: [u32; 256] = crc_table();

/// The [MS-OXRTFCP] checksum (CRC32 without pre and post conditioning)
pub fn crc32(data: &[u8]) -> u32 {
    data.iter().fold(0u32, |crc, b| {
        CRC_LUT[usize::from(crc as u8 ^ *b)] ^ (crc >> 8)
    })
}

/// A decompressed RTF payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecompressedRtf {
    /// The RTF text
    pub data: Vec<u8>,
    /// Whether the stored checksum matched
    pub crc_ok: bool,
}

fn invalid(msg: &str) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg.to_string())
}

/// Decompresses a `PR_RTF_COMPRESSED` stream
pub fn decompress(stream: &[u8]) -> Result<DecompressedRtf, io::Error> {
    let header: &[u8; HEADER_SIZE] = stream
        .get(0..HEADER_SIZE)
        .and_then(|h| h.try_into().ok())
        .ok_or_else(|| invalid("Truncated CompressedRtf header"))?;
    let dword = |i: usize| {
        u32::from_le_bytes([header[i], header[i + 1], header[i + 2], header[i + 3]])
    };
    let compsz = usize::try_from(dword(0)).unwrap_or(usize::MAX);
    let rawsz = usize::try_from(dword(4)).unwrap_or(usize::MAX);
    let comp_type = dword(8);
    let ref_crc = dword(12);
    let body = &stream[HEADER_SIZE..];
    match comp_type {
        UNCOMPRESSED => {
            // Readers may take everything up to the end regardless of RAWSIZE
            Ok(DecompressedRtf {
                data: body.to_vec(),
                crc_ok: ref_crc == 0,
            })
        }
        COMPRESSED => {
            // COMPSIZE counts the 12 header bytes following it
            let avail = compsz.saturating_sub(HEADER_SIZE - 4).min(body.len());
            if avail < compsz.saturating_sub(HEADER_SIZE - 4) {
                warn!("CompressedRtf stream shorter than its declared size");
            }
            let body = &body[..avail];
            let data = lzfu(body, rawsz)?;
            Ok(DecompressedRtf {
                data,
                crc_ok: crc32(body) == ref_crc,
            })
        }
        _ => Err(invalid("Invalid compression type value")),
    }
}

fn lzfu(mut input: &[u8], rawsz: usize) -> Result<Vec<u8>, io::Error> {
    let mut dict = [0u8; DICT_SIZE];
    dict[..DICT_INIT.len()].copy_from_slice(DICT_INIT);
    let mut wr = DICT_INIT.len();
    let mut out = Vec::with_capacity(rawsz.min(1 << 20));
    'outer: while let Some((&control, rest)) = input.split_first() {
        input = rest;
        for bit in 0..8 {
            if control & (1 << bit) == 0 {
                let Some((&lit, rest)) = input.split_first() else {
                    break 'outer;
                };
                input = rest;
                out.push(lit);
                dict[wr] = lit;
                wr = (wr + 1) % DICT_SIZE;
            } else {
                let Some((dictref, rest)) = input.split_first_chunk::<2>() else {
                    return Err(invalid("Truncated CompressedRtf stream"));
                };
                input = rest;
                let dictref = u16::from_be_bytes(*dictref);
                let mut rd = usize::from(dictref >> 4);
                if rd == wr {
                    // End marker
                    break 'outer;
                }
                let len = usize::from(dictref & 0xf) + 2;
                for _ in 0..len {
                    let b = dict[rd];
                    rd = (rd + 1) % DICT_SIZE;
                    out.push(b);
                    dict[wr] = b;
                    wr = (wr + 1) % DICT_SIZE;
                }
            }
        }
    }
    if out.len() > rawsz {
        out.truncate(rawsz);
    }
    Ok(out)
}

/// RTF handling needed to produce message bodies
pub trait RtfConverter {
    /// Turns a `PR_RTF_COMPRESSED` stream into RTF text
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, io::Error>;
    /// Extracts the HTML encapsulated in an RTF document, if any
    fn html_from_rtf(&self, rtf: &[u8]) -> Option<String>;
}

/// The default [`RtfConverter`]
///
/// Decompresses with [`decompress`]; HTML extraction is not available
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultRtfConverter;

impl RtfConverter for DefaultRtfConverter {
    fn decompress(&self, compressed: &[u8]) -> Result<Vec<u8>, io::Error> {
        let rtf = decompress(compressed)?;
        if !rtf.crc_ok {
            warn!("CompressedRtf checksum mismatch");
        }
        Ok(rtf.data)
    }

    fn html_from_rtf(&self, _rtf: &[u8]) -> Option<String> {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crc() {
        let buf = b"\x03\x00\x0a\x00\x72\x63\x70\x67\x31\x32\x35\x42\x32\x0a\xf3\x20\x68\x65\x6c\x09\x00\x20\x62\x77\x05\xb0\x6c\x64\x7d\x0a\x80\x0f\xa0";
        assert_eq!(crc32(buf), 0xA7C7C5F1);
        assert_eq!(CRC_LUT[1], 0x77073096);
        assert_eq!(CRC_LUT[255], 0x2d02ef8d);
    }

    fn assert_decomp(comp: &[u8], reference: &[u8]) -> Result<(), io::Error> {
        let rtf = decompress(comp)?;
        assert_eq!(&rtf.data, reference);
        assert!(rtf.crc_ok);
        Ok(())
    }

    #[test]
    fn test_decomp_1() -> Result<(), io::Error> {
        assert_decomp(
            b"\x2d\x00\x00\x00\x2b\x00\x00\x00\x4c\x5a\x46\x75\xf1\xc5\xc7\xa7\x03\x00\x0a\x00\x72\x63\x70\x67\x31\x32\x35\x42\x32\x0a\xf3\x20\x68\x65\x6c\x09\x00\x20\x62\x77\x05\xb0\x6c\x64\x7d\x0a\x80\x0f\xa0",
            b"{\\rtf1\\ansi\\ansicpg1252\\pard hello world}\r\n",
        )
    }

    #[test]
    fn test_decomp_2() -> Result<(), io::Error> {
        assert_decomp(
            b"\x1a\x00\x00\x00\x1c\x00\x00\x00\x4c\x5a\x46\x75\xe2\xd4\x4b\x51\x41\x00\x04\x20\x57\x58\x59\x5a\x0d\x6e\x7d\x01\x0e\xb0",
            b"{\\rtf1 WXYZWXYZWXYZWXYZWXYZ}",
        )
    }

    #[test]
    fn uncompressed() -> Result<(), io::Error> {
        let mut stream = Vec::new();
        stream.extend_from_slice(&17u32.to_le_bytes());
        stream.extend_from_slice(&5u32.to_le_bytes());
        stream.extend_from_slice(&UNCOMPRESSED.to_le_bytes());
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.extend_from_slice(b"{\\rtf1 plain}");
        assert_decomp(&stream, b"{\\rtf1 plain}")
    }

    #[test]
    fn bad_streams() {
        assert!(decompress(b"short").is_err());
        let mut stream = vec![0u8; 8];
        stream.extend_from_slice(b"ABCD");
        stream.extend_from_slice(&[0u8; 4]);
        assert!(decompress(&stream).is_err());
        // Reference to the dictionary cut short
        let mut stream = Vec::new();
        stream.extend_from_slice(&14u32.to_le_bytes());
        stream.extend_from_slice(&10u32.to_le_bytes());
        stream.extend_from_slice(&COMPRESSED.to_le_bytes());
        stream.extend_from_slice(&0u32.to_le_bytes());
        stream.extend_from_slice(&[0x01, 0x00]);
        assert!(decompress(&stream).is_err());
    }
}
