//! Verifier for detached APK Signature Scheme v4 signatures.
//!
//! A v4 signature lives outside the package (usually as `<package>.idsig`)
//! and commits to the package through a Merkle root hash, the package file
//! size and a digest taken from the older in-package signing scheme. This
//! crate provides:
//!
//! - Bounded little-endian decoding of the signature envelope and its records
//! - Signer selection by external block id (default signer or a per-scheme block)
//! - Signed-data reconstruction and RSA / ECDSA signature checks
//! - Certificate decoding and certificate/public-key consistency checks
//! - Pluggable signature byte sources (sidecar files, in-memory, closures)
//!
//! Verification either yields a fully trusted [`VerifiedSigner`] or an error
//! classified as [`ErrorKind::NotFound`] or [`ErrorKind::Security`]. Checking
//! the root hash against the package content is the caller's job.
//!
//! # Supported Keys
//!
//! RSA keys up to 16384 bits, and ECDSA keys on NIST P-256 or P-384. Records
//! signed with any other curve (P-521 included) fail with
//! [`V4Error::InvalidPublicKey`].
//!
//! # Quick Start
//!
//! ```no_run
//! use std::path::Path;
//! use idsig_verify::{SchemeV4Verifier, SignerSelector, VerifierConfig};
//!
//! # fn example() -> Result<(), idsig_verify::V4Error> {
//! let verifier = SchemeV4Verifier::sidecar(VerifierConfig::from_env());
//! let signer = verifier.verify(Path::new("base.apk"), SignerSelector::Default)?;
//! println!("signed by {}", signer.certificates[0].subject());
//! # Ok(())
//! # }
//! ```
//!
//! # Configuration
//!
//! | Environment Variable | Description |
//! |---------------------|-------------|
//! | `IDSIG_MAX_SIGNATURE_SIZE` | Cap on hashing info + signing infos in bytes (default: 8096) |
//! | `IDSIG_SIDECAR_EXTENSION` | Sidecar file extension (default: `idsig`) |

pub mod algorithms;
pub mod certificate;
pub mod config;
pub mod crypto;
pub mod error;
pub mod signed_data;
pub mod source;
pub mod types;
pub mod verify;
mod wire;

#[cfg(any(test, feature = "testing"))]
pub mod testing;

// Re-export main types
pub use algorithms::{ContentDigestAlgorithm, KeyAlgorithm, SignatureAlgorithm};
pub use certificate::VerbatimCertificate;
pub use config::{VerifierConfig, DEFAULT_SIDECAR_EXTENSION};
pub use error::{DecodeError, ErrorKind, V4Error, V4Result};
pub use signed_data::signed_data;
pub use source::{InMemorySource, SidecarFileSource, SignatureSource};
pub use types::{
    HashingInfo, SignatureEnvelope, SigningInfo, SigningInfoBlock, SigningInfos,
    HASHING_ALGORITHM_SHA256, LOG2_BLOCK_SIZE_4096_BYTES, MAX_SIGNATURE_SIZE, SUPPORTED_VERSIONS,
};
pub use verify::{
    decode_envelope, select_signer, verify_bytes, verify_envelope, verify_signer,
    ContentDigestType, SchemeV4Verifier, SignerSelector, VerifiedSigner, SCHEME_DEFAULT_BLOCK_ID,
    V31_BLOCK_ID, V3_BLOCK_ID,
};
