// Copyright (C) Microsoft Corporation. All rights reserved.

//! Base64 block codec (`EVP_EncodeBlock` / `EVP_DecodeBlock`).

use crate::buffer::BoundedWriter;
use crate::error::require;
use crate::error::require_capacity;
use crate::error::ModelResult;
use crate::error::ReturnCode;
use crate::oracle::site;
use crate::provider::Provider;

/// Bytes produced by decoding `n` base64 characters.
pub const fn decoded_len(n: usize) -> usize {
    3 * (n / 4)
}

/// Characters produced by encoding `n` bytes, excluding the terminator.
pub const fn encoded_len(n: usize) -> usize {
    let full = 4 * (n / 3);
    if n % 3 == 0 {
        full
    } else {
        full + 4
    }
}

/// Decode a block of base64 text
///
/// # Argument
/// * `out` - Output buffer; must hold `3 * (input.len() / 4)` bytes
/// * `input` - Base64 text; its length must be a multiple of 4
///
/// # Return
/// The input length on success, -1 on a decode failure, 0 for empty input
pub fn decode_block(provider: &Provider, out: &mut [u8], input: &[u8]) -> ModelResult<i32> {
    const OP: &str = "decode_block";
    let n = input.len();
    if n == 0 {
        return Ok(0);
    }
    require(n % 4 == 0, OP, "input length is not a multiple of 4")?;

    let len = decoded_len(n);
    let writer = BoundedWriter::new(OP, out, len)?;
    if !provider.succeeds(site::DECODE_BLOCK) {
        tracing::debug!(n, "{OP}: decode failure");
        return Ok(ReturnCode::ERROR.get());
    }

    writer.write_unconstrained(provider, site::DECODE_BLOCK_OUTPUT, len)?;
    Ok(n as i32)
}

/// Encode a block of bytes as NUL-terminated base64 text
///
/// # Argument
/// * `out` - Output buffer; must hold the encoded length plus the
///   terminator, which is at least one byte
/// * `input` - Bytes to encode
///
/// # Return
/// The encoded length, not counting the terminator
pub fn encode_block(provider: &Provider, out: &mut [u8], input: &[u8]) -> ModelResult<usize> {
    const OP: &str = "encode_block";
    let len = encoded_len(input.len());
    require_capacity(OP, len + 1, out.len())?;

    let (text, terminator) = out.split_at_mut(len);
    BoundedWriter::new(OP, text, len)?.write_unconstrained(
        provider,
        site::ENCODE_BLOCK_OUTPUT,
        len,
    )?;
    terminator[0] = 0;
    Ok(len)
}
