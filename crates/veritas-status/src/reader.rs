//! Status Value Reader.
//!
//! Reads the `status_size` bits of entry `index` from an expanded list.
//! Bounds are never clamped: an index beyond the list is an error.

use crate::entry::BitOrder;
use crate::error::StatusError;

/// Widest status value the reader can return.
pub const MAX_STATUS_SIZE: u8 = 64;

/// Read the status value of `index` from `bytes`.
///
/// With [`BitOrder::MsbFirst`] entry `i` starts at bit `i * status_size`
/// counted from the most significant bit of byte 0, and the value is read
/// MSB-first. With [`BitOrder::LsbFirst`] bits are counted from the least
/// significant bit of each byte and the first bit read is the value's
/// least significant bit.
pub fn read_status(
    bytes: &[u8],
    index: u64,
    status_size: u8,
    order: BitOrder,
) -> Result<u64, StatusError> {
    if status_size == 0 || status_size > MAX_STATUS_SIZE {
        return Err(StatusError::InvalidStatusSize(status_size));
    }

    let out_of_range = || StatusError::IndexOutOfRange {
        index,
        status_size,
        length: bytes.len(),
    };

    let start = index
        .checked_mul(u64::from(status_size))
        .ok_or_else(out_of_range)?;
    let last = start
        .checked_add(u64::from(status_size) - 1)
        .ok_or_else(out_of_range)?;
    if last / 8 >= bytes.len() as u64 {
        return Err(out_of_range());
    }

    let mut value = 0u64;
    for offset in 0..u64::from(status_size) {
        let position = start + offset;
        let byte = bytes[(position / 8) as usize];
        let bit_offset = (position % 8) as u32;
        match order {
            BitOrder::MsbFirst => {
                let bit = (byte >> (7 - bit_offset)) & 1;
                value = (value << 1) | u64::from(bit);
            }
            BitOrder::LsbFirst => {
                let bit = (byte >> bit_offset) & 1;
                value |= u64::from(bit) << offset;
            }
        }
    }
    Ok(value)
}
