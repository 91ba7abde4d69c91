//! Abbreviated JPEG stream handling.
//!
//! Aperio SVS files store each tile as an abbreviated JPEG stream: the
//! quantization (DQT) and Huffman (DHT) tables live once in the level's
//! `JPEGTables` tag instead of in every tile. Before decoding, the tables are
//! spliced in front of the tile's scan: `SOI + tables + scan + EOI`.

use bytes::{Bytes, BytesMut};

/// Start Of Image marker
pub const SOI: [u8; 2] = [0xFF, 0xD8];

/// End Of Image marker
pub const EOI: [u8; 2] = [0xFF, 0xD9];

const DQT: u8 = 0xDB;
const DHT: u8 = 0xC4;
const SOS: u8 = 0xDA;

/// Whether a stream defines its own tables before the first scan.
///
/// Walks the marker segments after SOI and stops at SOS. Data that does not
/// start with SOI is reported as self-contained so it is passed through.
pub fn has_tables(data: &[u8]) -> bool {
    if data.len() < 4 || data[0..2] != SOI {
        return true;
    }

    let mut pos = 2;
    while pos + 3 < data.len() {
        if data[pos] != 0xFF {
            pos += 1;
            continue;
        }
        match data[pos + 1] {
            DQT | DHT => return true,
            SOS => return false,
            // Fill bytes and standalone markers carry no length
            0xFF | 0x00 | 0xD0..=0xD9 => pos += 2,
            _ => {
                let length = u16::from_be_bytes([data[pos + 2], data[pos + 3]]) as usize;
                pos += 2 + length;
            }
        }
    }

    false
}

/// Splice `JPEGTables` into an abbreviated tile stream.
pub fn merge_jpeg_tables(tables: &[u8], tile: &[u8]) -> Bytes {
    if tables.is_empty() {
        return Bytes::copy_from_slice(tile);
    }

    let tables = tables.strip_suffix(&EOI).unwrap_or(tables);
    let tile = tile.strip_prefix(&SOI).unwrap_or(tile);

    let mut merged = BytesMut::with_capacity(tables.len() + tile.len());
    merged.extend_from_slice(tables);
    merged.extend_from_slice(tile);
    merged.freeze()
}

/// Return a decodable JPEG stream for a stored tile.
pub fn prepare_tile_jpeg(tables: Option<&[u8]>, tile: &[u8]) -> Bytes {
    match tables {
        Some(tables) if !has_tables(tile) => merge_jpeg_tables(tables, tile),
        _ => Bytes::copy_from_slice(tile),
    }
}
