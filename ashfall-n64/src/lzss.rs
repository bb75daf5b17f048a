//! LZSS decoder (Jaguar Doom scheme, as used by Doom 64 and PSX Doom)
//!
//! The compressed data is a stream of "codes". A control byte prefixes each
//! group of up to 8 codes, one flag bit per code, low bit first. Flag 0 means
//! the next input byte is a literal. Flag 1 means a dictionary pointer into
//! the bytes already written: two bytes holding a 12-bit offset (from the
//! right, 0 = the most recent byte) and a 4-bit length.
//!
//! ```text
//! byte 0: oooooooo    offset bits 11..4
//! byte 1: oooollll    offset bits 3..0, length
//! ```
//!
//! A length field of 0 terminates the stream, so a pointer always copies
//! `length + 1` bytes, giving usable lengths of 2..=16. The copy runs one
//! byte at a time and may overlap the output tail, which is how runs are
//! encoded. There is no decompressed-size header.

use crate::DecodeError;

/// Decode an LZSS stream. Decoding ends at the in-band end marker; input
/// ending before the marker is an error, as is a pointer reaching before
/// the start of the output.
pub fn decode_lzss(input: &[u8]) -> Result<Vec<u8>, DecodeError> {
    let mut out = Vec::new();
    let mut pos = 0usize;

    let mut next = |pos: &mut usize| -> Result<u8, DecodeError> {
        let b = *input.get(*pos).ok_or(DecodeError::TruncatedInput)?;
        *pos += 1;
        Ok(b)
    };

    let mut flags = 0u32;
    let mut flags_left = 0u32;

    loop {
        if flags_left == 0 {
            flags = u32::from(next(&mut pos)?);
            flags_left = 8;
        }
        flags_left -= 1;

        if flags & 1 != 0 {
            // dictionary pointer
            let b0 = next(&mut pos)?;
            let b1 = next(&mut pos)?;
            let offset = (usize::from(b0) << 4) | (usize::from(b1) >> 4);
            let len = usize::from(b1 & 0x0f);

            // length 0 is the end marker, even mid control byte
            if len == 0 {
                return Ok(out);
            }

            let start = out
                .len()
                .checked_sub(offset + 1)
                .ok_or(DecodeError::InvalidBackref)?;

            // byte-at-a-time so the copy may run into bytes it just wrote
            for i in start..start + len + 1 {
                let b = out[i];
                out.push(b);
            }
        } else {
            let b = next(&mut pos)?;
            out.push(b);
        }

        flags >>= 1;
    }
}
