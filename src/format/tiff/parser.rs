//! TIFF header and IFD parsing.
//!
//! ## Classic TIFF (8-byte header)
//! ```text
//! Bytes 0-1: Byte order ("II" little-endian, "MM" big-endian)
//! Bytes 2-3: Version (42)
//! Bytes 4-7: Offset to first IFD
//! ```
//!
//! ## BigTIFF (16-byte header)
//! ```text
//! Bytes 0-1: Byte order
//! Bytes 2-3: Version (43)
//! Bytes 4-5: Offset byte size (must be 8)
//! Bytes 6-7: Reserved
//! Bytes 8-15: Offset to first IFD
//! ```

use bytes::Bytes;

use crate::error::TiffError;
use crate::io::RangeReader;

/// Size of classic TIFF header in bytes
pub const TIFF_HEADER_SIZE: usize = 8;

/// Size of BigTIFF header in bytes
pub const BIGTIFF_HEADER_SIZE: usize = 16;

/// Upper bound on the IFD chain length, guards against offset loops.
const MAX_IFDS: usize = 128;

// Tag IDs used by the pyramid reader.
pub const TAG_IMAGE_WIDTH: u16 = 256;
pub const TAG_IMAGE_LENGTH: u16 = 257;
pub const TAG_COMPRESSION: u16 = 259;
pub const TAG_IMAGE_DESCRIPTION: u16 = 270;
pub const TAG_TILE_WIDTH: u16 = 322;
pub const TAG_TILE_LENGTH: u16 = 323;
pub const TAG_TILE_OFFSETS: u16 = 324;
pub const TAG_TILE_BYTE_COUNTS: u16 = 325;
pub const TAG_JPEG_TABLES: u16 = 347;

/// Compression value for JPEG ("new style").
pub const COMPRESSION_JPEG: u16 = 7;

// =============================================================================
// ByteOrder
// =============================================================================

/// Byte order (endianness) of a TIFF file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ByteOrder {
    /// Little-endian ("II" = Intel)
    LittleEndian,
    /// Big-endian ("MM" = Motorola)
    BigEndian,
}

impl ByteOrder {
    #[inline]
    pub fn read_u16(self, bytes: &[u8]) -> u16 {
        let raw = [bytes[0], bytes[1]];
        match self {
            ByteOrder::LittleEndian => u16::from_le_bytes(raw),
            ByteOrder::BigEndian => u16::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u32(self, bytes: &[u8]) -> u32 {
        let raw = [bytes[0], bytes[1], bytes[2], bytes[3]];
        match self {
            ByteOrder::LittleEndian => u32::from_le_bytes(raw),
            ByteOrder::BigEndian => u32::from_be_bytes(raw),
        }
    }

    #[inline]
    pub fn read_u64(self, bytes: &[u8]) -> u64 {
        let mut raw = [0u8; 8];
        raw.copy_from_slice(&bytes[..8]);
        match self {
            ByteOrder::LittleEndian => u64::from_le_bytes(raw),
            ByteOrder::BigEndian => u64::from_be_bytes(raw),
        }
    }
}

// =============================================================================
// TiffHeader
// =============================================================================

/// Parsed TIFF file header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TiffHeader {
    pub byte_order: ByteOrder,
    pub is_bigtiff: bool,
    pub first_ifd_offset: u64,
}

impl TiffHeader {
    /// Parse a TIFF header from the first bytes of a file.
    ///
    /// `bytes` should hold 16 bytes when available so BigTIFF headers can be
    /// read; `file_size` bounds the first IFD offset.
    pub fn parse(bytes: &[u8], file_size: u64) -> Result<Self, TiffError> {
        if bytes.len() < TIFF_HEADER_SIZE {
            return Err(TiffError::FileTooSmall {
                required: TIFF_HEADER_SIZE as u64,
                actual: bytes.len() as u64,
            });
        }

        let byte_order = match &bytes[0..2] {
            b"II" => ByteOrder::LittleEndian,
            b"MM" => ByteOrder::BigEndian,
            _ => return Err(TiffError::InvalidMagic(u16::from_le_bytes([bytes[0], bytes[1]]))),
        };

        let (is_bigtiff, first_ifd_offset) = match byte_order.read_u16(&bytes[2..4]) {
            42 => (false, byte_order.read_u32(&bytes[4..8]) as u64),
            43 => {
                if bytes.len() < BIGTIFF_HEADER_SIZE {
                    return Err(TiffError::FileTooSmall {
                        required: BIGTIFF_HEADER_SIZE as u64,
                        actual: bytes.len() as u64,
                    });
                }
                let offset_size = byte_order.read_u16(&bytes[4..6]);
                if offset_size != 8 {
                    return Err(TiffError::InvalidBigTiffOffsetSize(offset_size));
                }
                (true, byte_order.read_u64(&bytes[8..16]))
            }
            version => return Err(TiffError::InvalidVersion(version)),
        };

        if first_ifd_offset >= file_size {
            return Err(TiffError::InvalidIfdOffset(first_ifd_offset));
        }

        Ok(TiffHeader {
            byte_order,
            is_bigtiff,
            first_ifd_offset,
        })
    }

    /// Size of one IFD entry: 12 bytes classic, 20 bytes BigTIFF.
    #[inline]
    pub const fn entry_size(&self) -> usize {
        if self.is_bigtiff {
            20
        } else {
            12
        }
    }

    /// Size of the entry count (and of the next-IFD offset) field.
    #[inline]
    const fn count_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            2
        }
    }

    /// Size of the value/offset field, which is also the inline threshold.
    #[inline]
    pub const fn value_field_size(&self) -> usize {
        if self.is_bigtiff {
            8
        } else {
            4
        }
    }
}

// =============================================================================
// IFD entries
// =============================================================================

/// Size in bytes of a single value of a TIFF field type.
///
/// Only the types that occur in pyramid metadata are recognized.
pub fn field_type_size(field_type: u16) -> Option<usize> {
    match field_type {
        1 | 2 | 6 | 7 => Some(1), // BYTE, ASCII, SBYTE, UNDEFINED
        3 => Some(2),             // SHORT
        4 => Some(4),             // LONG
        16 => Some(8),            // LONG8
        _ => None,
    }
}

/// One entry of an Image File Directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IfdEntry {
    pub tag: u16,
    pub field_type: u16,
    pub count: u64,
    /// Raw value/offset field (4 bytes classic, 8 bytes BigTIFF)
    pub value_field: Vec<u8>,
}

impl IfdEntry {
    /// Total size of the value in bytes, if the field type is known.
    pub fn byte_len(&self) -> Option<u64> {
        field_type_size(self.field_type).map(|size| size as u64 * self.count)
    }

    /// Single unsigned value stored inline (SHORT, LONG or LONG8, count 1).
    pub fn inline_uint(&self, byte_order: ByteOrder) -> Option<u64> {
        if self.count != 1 {
            return None;
        }
        match self.field_type {
            3 => Some(byte_order.read_u16(&self.value_field) as u64),
            4 => Some(byte_order.read_u32(&self.value_field) as u64),
            16 if self.value_field.len() == 8 => Some(byte_order.read_u64(&self.value_field)),
            _ => None,
        }
    }

    /// Read the raw bytes of this entry's value, inline or at its offset.
    pub async fn read_value<R: RangeReader>(
        &self,
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Bytes, TiffError> {
        let len = self.byte_len().ok_or_else(|| TiffError::InvalidTagValue {
            tag: "field type",
            message: format!("unknown field type {} on tag {}", self.field_type, self.tag),
        })?;

        if len <= header.value_field_size() as u64 {
            return Ok(Bytes::copy_from_slice(&self.value_field[..len as usize]));
        }

        let offset = if header.is_bigtiff {
            header.byte_order.read_u64(&self.value_field)
        } else {
            header.byte_order.read_u32(&self.value_field) as u64
        };
        Ok(reader.read_exact_at(offset, len as usize).await?)
    }

    /// Read this entry as an array of unsigned integers.
    pub async fn read_uints<R: RangeReader>(
        &self,
        reader: &R,
        header: &TiffHeader,
    ) -> Result<Vec<u64>, TiffError> {
        let bytes = self.read_value(reader, header).await?;
        let order = header.byte_order;

        let values = match self.field_type {
            3 => bytes.chunks_exact(2).map(|c| order.read_u16(c) as u64).collect(),
            4 => bytes.chunks_exact(4).map(|c| order.read_u32(c) as u64).collect(),
            16 => bytes.chunks_exact(8).map(|c| order.read_u64(c)).collect(),
            other => {
                return Err(TiffError::InvalidTagValue {
                    tag: "integer array",
                    message: format!("tag {} has non-integer type {}", self.tag, other),
                })
            }
        };
        Ok(values)
    }
}

// =============================================================================
// Ifd
// =============================================================================

/// A parsed Image File Directory.
#[derive(Debug, Clone)]
pub struct Ifd {
    pub entries: Vec<IfdEntry>,
    pub next_ifd_offset: u64,
}

impl Ifd {
    /// Parse an IFD from bytes starting at its entry count.
    pub fn parse(bytes: &[u8], header: &TiffHeader) -> Result<Self, TiffError> {
        let order = header.byte_order;
        let count_size = header.count_size();
        let entry_size = header.entry_size();

        let short = |required: usize| TiffError::FileTooSmall {
            required: required as u64,
            actual: bytes.len() as u64,
        };

        if bytes.len() < count_size {
            return Err(short(count_size));
        }
        let entry_count = if header.is_bigtiff {
            order.read_u64(bytes) as usize
        } else {
            order.read_u16(bytes) as usize
        };

        let required = count_size + entry_count * entry_size + count_size.max(4);
        if bytes.len() < required {
            return Err(short(required));
        }

        let mut entries = Vec::with_capacity(entry_count);
        for i in 0..entry_count {
            let raw = &bytes[count_size + i * entry_size..count_size + (i + 1) * entry_size];
            let (count, value_field) = if header.is_bigtiff {
                (order.read_u64(&raw[4..12]), raw[12..20].to_vec())
            } else {
                (order.read_u32(&raw[4..8]) as u64, raw[8..12].to_vec())
            };
            entries.push(IfdEntry {
                tag: order.read_u16(&raw[0..2]),
                field_type: order.read_u16(&raw[2..4]),
                count,
                value_field,
            });
        }

        let next = &bytes[count_size + entry_count * entry_size..];
        let next_ifd_offset = if header.is_bigtiff {
            order.read_u64(next)
        } else {
            order.read_u32(next) as u64
        };

        Ok(Ifd {
            entries,
            next_ifd_offset,
        })
    }

    /// Find an entry by tag ID.
    pub fn get(&self, tag: u16) -> Option<&IfdEntry> {
        self.entries.iter().find(|e| e.tag == tag)
    }

    /// Read a scalar unsigned tag that must be stored inline.
    pub fn uint(&self, tag: u16, byte_order: ByteOrder) -> Option<u64> {
        self.get(tag)?.inline_uint(byte_order)
    }
}

/// Read the header and every IFD of the chain.
pub async fn read_ifd_chain<R: RangeReader>(
    reader: &R,
) -> Result<(TiffHeader, Vec<Ifd>), TiffError> {
    let head_len = (BIGTIFF_HEADER_SIZE as u64).min(reader.size()) as usize;
    let head = reader.read_exact_at(0, head_len).await?;
    let header = TiffHeader::parse(&head, reader.size())?;

    let mut ifds = Vec::new();
    let mut offset = header.first_ifd_offset;
    while offset != 0 && ifds.len() < MAX_IFDS {
        if offset >= reader.size() {
            return Err(TiffError::InvalidIfdOffset(offset));
        }

        let count_bytes = reader.read_exact_at(offset, header.count_size()).await?;
        let entry_count = if header.is_bigtiff {
            header.byte_order.read_u64(&count_bytes)
        } else {
            header.byte_order.read_u16(&count_bytes) as u64
        };

        let ifd_len = header.count_size() as u64
            + entry_count * header.entry_size() as u64
            + header.count_size().max(4) as u64;
        let ifd_len = ifd_len.min(reader.size() - offset) as usize;
        let ifd = Ifd::parse(&reader.read_exact_at(offset, ifd_len).await?, &header)?;

        offset = ifd.next_ifd_offset;
        ifds.push(ifd);
    }

    Ok((header, ifds))
}
