//! Signed-data reconstruction.
//!
//! ```text
//! signed_data = u32 total_size            (includes itself)
//!               u64 file_size
//!               u32 hash_algorithm
//!               u8  log2_block_size
//!               LP  salt
//!               LP  root_hash
//!               LP  apk_digest
//!               LP  certificate
//!               LP  additional_data
//!               LP  public_key
//!               u32 signature_algorithm_id
//! ```
//!
//! `LP` is a little-endian `u32` length followed by the bytes. The signature
//! itself is never part of the signed data.

use crate::error::{V4Error, V4Result};
use crate::types::{HashingInfo, SigningInfo};
use crate::wire;

/// Rebuild the exact bytes a v4 signer signed.
///
/// `file_size` is the size of the package on disk as seen by the caller, not a
/// value from the signature record; it binds the signature to that size.
pub fn signed_data(
    file_size: u64,
    hashing_info: &HashingInfo,
    signing_info: &SigningInfo,
) -> V4Result<Vec<u8>> {
    let len = 4
        + 8
        + 4
        + 1
        + wire::bytes_size(&hashing_info.salt)
        + wire::bytes_size(&hashing_info.root_hash)
        + wire::bytes_size(&signing_info.apk_digest)
        + wire::bytes_size(&signing_info.certificate)
        + wire::bytes_size(&signing_info.additional_data)
        + wire::bytes_size(&signing_info.public_key)
        + 4;
    let total = u32::try_from(len).map_err(|_| V4Error::SignedDataTooLarge { len })?;

    let mut out = Vec::with_capacity(len);
    wire::put_u32(&mut out, total);
    wire::put_u64(&mut out, file_size);
    wire::put_u32(&mut out, hashing_info.hash_algorithm);
    out.push(hashing_info.log2_block_size);
    wire::put_bytes(&mut out, &hashing_info.salt);
    wire::put_bytes(&mut out, &hashing_info.root_hash);
    wire::put_bytes(&mut out, &signing_info.apk_digest);
    wire::put_bytes(&mut out, &signing_info.certificate);
    wire::put_bytes(&mut out, &signing_info.additional_data);
    wire::put_bytes(&mut out, &signing_info.public_key);
    wire::put_u32(&mut out, signing_info.signature_algorithm_id);
    debug_assert_eq!(out.len(), len);
    Ok(out)
}
