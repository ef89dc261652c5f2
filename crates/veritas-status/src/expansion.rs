//! Status List Expansion.
//!
//! Turns the base64 encoded, compressed list of a fetched status list
//! document into a flat byte buffer. The algorithm is selected by the
//! status list specification the document declares. A stream that fails
//! to decompress is always an error and never an empty (all clear) list.

use std::io::Read;

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use flate2::read::GzDecoder;
use flate2::{Decompress, FlushDecompress, Status};

use crate::entry::{BitOrder, StatusListType};
use crate::error::StatusError;
use crate::reader::read_status;

/// Upper bound on an expanded list (16 MiB, 134M one-bit entries).
pub const MAX_EXPANDED_LEN: usize = 16 * 1024 * 1024;

const LENIENT: GeneralPurposeConfig = GeneralPurposeConfig::new()
    .with_encode_padding(false)
    .with_decode_padding_mode(DecodePaddingMode::Indifferent);

const URL_SAFE_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::URL_SAFE, LENIENT);
const STANDARD_LENIENT: GeneralPurpose = GeneralPurpose::new(&alphabet::STANDARD, LENIENT);

/// Compression wrapped around an encoded list.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    /// zlib stream, or a bare DEFLATE stream when no zlib header is present.
    Zlib,
    Gzip,
}

impl Compression {
    pub fn for_list(list_type: StatusListType) -> Self {
        match list_type {
            StatusListType::RevocationList2020 | StatusListType::TokenStatusList => Self::Zlib,
            StatusListType::StatusList2021 | StatusListType::BitstringStatusList => Self::Gzip,
        }
    }
}

/// A decompressed status list ready for lookups.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExpandedStatusList {
    pub bytes: Vec<u8>,
    /// Bits per entry.
    pub status_size: u8,
    pub order: BitOrder,
}

impl ExpandedStatusList {
    pub fn new(bytes: Vec<u8>, status_size: u8, order: BitOrder) -> Self {
        Self {
            bytes,
            status_size,
            order,
        }
    }

    /// Read the status value stored at `index`.
    pub fn read(&self, index: u64) -> Result<u64, StatusError> {
        read_status(&self.bytes, index, self.status_size, self.order)
    }

    /// Number of entries the list holds.
    pub fn capacity(&self) -> u64 {
        (self.bytes.len() as u64 * 8) / u64::from(self.status_size.max(1))
    }
}

/// Decode and decompress the encoded list of a document of `list_type`.
pub fn expand(list_type: StatusListType, encoded: &str) -> Result<Vec<u8>, StatusError> {
    let encoded = encoded.trim();
    // Multibase prefix `u` marks base64url without padding.
    let encoded = match list_type {
        StatusListType::StatusList2021 | StatusListType::BitstringStatusList => {
            encoded.strip_prefix('u').unwrap_or(encoded)
        }
        _ => encoded,
    };

    let compressed = decode_base64(encoded)?;
    let expanded = decompress(Compression::for_list(list_type), &compressed)?;
    tracing::debug!(
        list_type = %list_type,
        compressed = compressed.len(),
        expanded = expanded.len(),
        "expanded status list"
    );
    Ok(expanded)
}

/// Decompress `input`; output larger than [`MAX_EXPANDED_LEN`] is rejected.
pub fn decompress(compression: Compression, input: &[u8]) -> Result<Vec<u8>, StatusError> {
    match compression {
        Compression::Gzip => gunzip(input),
        Compression::Zlib => inflate(input, has_zlib_header(input)),
    }
}

/// Base64 in either alphabet, padded or not.
pub fn decode_base64(encoded: &str) -> Result<Vec<u8>, StatusError> {
    let engine = if encoded.contains(['+', '/']) {
        &STANDARD_LENIENT
    } else {
        &URL_SAFE_LENIENT
    };
    engine
        .decode(encoded)
        .map_err(|e| StatusError::ExpansionFailure(format!("invalid base64: {}", e)))
}

fn has_zlib_header(input: &[u8]) -> bool {
    match input {
        [cmf, flg, ..] => cmf & 0x0f == 8 && ((u16::from(*cmf) << 8) | u16::from(*flg)) % 31 == 0,
        _ => false,
    }
}

fn gunzip(input: &[u8]) -> Result<Vec<u8>, StatusError> {
    let mut out = Vec::new();
    GzDecoder::new(input)
        .take(MAX_EXPANDED_LEN as u64 + 1)
        .read_to_end(&mut out)
        .map_err(|e| StatusError::ExpansionFailure(format!("gzip: {}", e)))?;
    if out.len() > MAX_EXPANDED_LEN {
        return Err(too_large());
    }
    Ok(out)
}

/// Inflate a zlib (or bare DEFLATE) stream, requiring it to end properly.
fn inflate(input: &[u8], zlib_header: bool) -> Result<Vec<u8>, StatusError> {
    let mut inflater = Decompress::new(zlib_header);
    let mut out = Vec::with_capacity(input.len().saturating_mul(4).clamp(64, MAX_EXPANDED_LEN));

    loop {
        let consumed = inflater.total_in() as usize;
        let status = inflater
            .decompress_vec(&input[consumed..], &mut out, FlushDecompress::Finish)
            .map_err(|e| StatusError::ExpansionFailure(format!("deflate: {}", e)))?;

        match status {
            Status::StreamEnd if out.len() <= MAX_EXPANDED_LEN => return Ok(out),
            Status::StreamEnd => return Err(too_large()),
            Status::Ok | Status::BufError if out.len() == out.capacity() => {
                if out.len() >= MAX_EXPANDED_LEN {
                    return Err(too_large());
                }
                let grow = out.capacity().min(MAX_EXPANDED_LEN - out.len()).max(64);
                out.reserve(grow);
            }
            Status::Ok | Status::BufError => {
                return Err(StatusError::ExpansionFailure(
                    "deflate: stream truncated".into(),
                ))
            }
        }
    }
}

fn too_large() -> StatusError {
    StatusError::ExpansionFailure(format!(
        "expanded list exceeds {} bytes",
        MAX_EXPANDED_LEN
    ))
}
