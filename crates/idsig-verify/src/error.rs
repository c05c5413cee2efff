//! Error types for v4 signature verification.

use std::path::PathBuf;

/// Coarse classification of a verification failure.
///
/// Callers decide policy (fall back to another scheme, reject the install)
/// from this alone; neither kind is recoverable by retrying.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// No signature bytes, or the requested signer block is absent.
    NotFound,
    /// The signature is present but cannot be trusted.
    Security,
}

/// Wire decoding failures. Every variant names the field being read.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DecodeError {
    /// A fixed-size field or a declared length runs past the end of the buffer.
    #[error("{field}: truncated (need {needed} bytes, {remaining} remaining)")]
    Truncated {
        field: &'static str,
        needed: usize,
        remaining: usize,
    },

    /// A declared length exceeds the size allowed for the field.
    #[error("{field}: length {len} exceeds limit of {limit} bytes")]
    TooLong {
        field: &'static str,
        len: usize,
        limit: usize,
    },
}

impl DecodeError {
    /// Name of the field that failed to decode.
    pub fn field(&self) -> &'static str {
        match self {
            Self::Truncated { field, .. } | Self::TooLong { field, .. } => field,
        }
    }
}

/// Verification errors.
#[derive(Debug, thiserror::Error)]
pub enum V4Error {
    /// The byte source returned nothing (or an empty buffer) for the package.
    #[error("v4 signature not found for {path}")]
    SignatureNotFound { path: PathBuf },

    /// Signature bytes were handed over directly but the buffer is empty.
    #[error("v4 signature not found: no signature bytes")]
    EmptySignature,

    /// The byte source failed while fetching signature bytes or the file size.
    #[error("failed to obtain v4 signature for {path}: {source}")]
    Source {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// No signer block matches the requested external block id.
    #[error("no v4 signer block corresponding to block id {block_id:#010x}")]
    SignerBlockNotFound { block_id: u32 },

    /// Envelope version outside the supported set.
    #[error("v4 signature version {version} is not supported")]
    UnsupportedVersion { version: u32 },

    /// Envelope or nested record is malformed.
    #[error("malformed v4 signature: {0}")]
    Decode(#[from] DecodeError),

    /// The selected signer block exists but its record is malformed.
    #[error("failed to read v4 signer block {block_id:#010x}: {source}")]
    SignerBlock {
        block_id: u32,
        #[source]
        source: DecodeError,
    },

    /// Signature algorithm id not in the allow-list.
    #[error("no supported signature algorithm (id {id:#06x})")]
    UnsupportedAlgorithm { id: u32 },

    /// Public key bytes could not be turned into a key of the expected type.
    #[error("failed to reconstruct {algorithm} public key: {reason}")]
    InvalidPublicKey {
        algorithm: &'static str,
        reason: String,
    },

    /// Signature bytes are not a well-formed signature for the algorithm.
    #[error("failed to verify {algorithm} signature: {reason}")]
    MalformedSignature {
        algorithm: &'static str,
        reason: String,
    },

    /// Signature is well-formed but does not verify over the signed data.
    #[error("{algorithm} signature did not verify")]
    SignatureMismatch { algorithm: &'static str },

    /// Certificate bytes are not a DER X.509 certificate.
    #[error("failed to decode certificate: {reason}")]
    InvalidCertificate { reason: String },

    /// The certificate carries a different key than the one that signed.
    #[error("public key mismatch between certificate and signature record")]
    PublicKeyMismatch,

    /// Hashing algorithm id has no digest-type mapping.
    #[error("unsupported hash algorithm: {id}")]
    UnsupportedHashAlgorithm { id: u32 },

    /// Reconstructed signed data does not fit its own u32 size header.
    #[error("signed data too large: {len} bytes")]
    SignedDataTooLarge { len: usize },
}

impl V4Error {
    /// Classify the error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::SignatureNotFound { .. }
            | Self::EmptySignature
            | Self::Source { .. }
            | Self::SignerBlockNotFound { .. } => ErrorKind::NotFound,

            Self::UnsupportedVersion { .. }
            | Self::Decode(_)
            | Self::SignerBlock { .. }
            | Self::UnsupportedAlgorithm { .. }
            | Self::InvalidPublicKey { .. }
            | Self::MalformedSignature { .. }
            | Self::SignatureMismatch { .. }
            | Self::InvalidCertificate { .. }
            | Self::PublicKeyMismatch
            | Self::UnsupportedHashAlgorithm { .. }
            | Self::SignedDataTooLarge { .. } => ErrorKind::Security,
        }
    }

    /// Whether the error means "no signature to check" rather than "bad signature".
    pub fn is_not_found(&self) -> bool {
        self.kind() == ErrorKind::NotFound
    }

    /// Exit code for CLI.
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::NotFound => 2,
            ErrorKind::Security => 4,
        }
    }
}

/// Result type for verification operations.
pub type V4Result<T> = Result<T, V4Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_not_found_kinds() {
        let missing = V4Error::SignatureNotFound {
            path: PathBuf::from("/data/app/base.apk"),
        };
        assert_eq!(missing.kind(), ErrorKind::NotFound);
        assert_eq!(missing.exit_code(), 2);

        assert!(V4Error::EmptySignature.is_not_found());
        assert_eq!(V4Error::EmptySignature.exit_code(), 2);

        let block = V4Error::SignerBlockNotFound { block_id: 3 };
        assert!(block.is_not_found());
        assert_eq!(
            block.to_string(),
            "no v4 signer block corresponding to block id 0x00000003"
        );
    }

    #[test]
    fn test_security_kinds() {
        let errors = [
            V4Error::UnsupportedVersion { version: 3 },
            V4Error::Decode(DecodeError::Truncated {
                field: "salt",
                needed: 4,
                remaining: 1,
            }),
            V4Error::UnsupportedAlgorithm { id: 0x0301 },
            V4Error::PublicKeyMismatch,
            V4Error::UnsupportedHashAlgorithm { id: 2 },
        ];
        for err in errors {
            assert_eq!(err.kind(), ErrorKind::Security, "{err}");
            assert_eq!(err.exit_code(), 4);
        }
    }

    #[test]
    fn test_decode_error_names_field() {
        let err = DecodeError::TooLong {
            field: "signingInfos",
            len: 9000,
            limit: 8096,
        };
        assert_eq!(err.field(), "signingInfos");
        assert_eq!(
            err.to_string(),
            "signingInfos: length 9000 exceeds limit of 8096 bytes"
        );
    }
}
