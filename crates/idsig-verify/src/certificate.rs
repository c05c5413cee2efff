//! Signer certificates kept together with their original DER encoding.

use std::fmt;

use sha2::{Digest, Sha256};
use x509_cert::der::{Decode, Encode};
use x509_cert::Certificate;

use crate::error::{V4Error, V4Result};

/// A decoded X.509 certificate that keeps the exact bytes it was decoded from.
///
/// Identity comparisons are defined over those bytes; the certificate is
/// never re-serialized for them.
#[derive(Clone)]
pub struct VerbatimCertificate {
    der: Box<[u8]>,
    parsed: Certificate,
}

impl VerbatimCertificate {
    /// Decode a DER certificate. Trailing bytes are rejected.
    pub fn from_der(der: &[u8]) -> V4Result<Self> {
        let parsed = Certificate::from_der(der).map_err(|e| V4Error::InvalidCertificate {
            reason: e.to_string(),
        })?;
        Ok(Self {
            der: der.into(),
            parsed,
        })
    }

    /// The original encoding.
    #[must_use]
    pub fn encoded(&self) -> &[u8] {
        &self.der
    }

    #[must_use]
    pub fn certificate(&self) -> &Certificate {
        &self.parsed
    }

    /// DER SubjectPublicKeyInfo of the certified key.
    pub fn public_key_der(&self) -> V4Result<Vec<u8>> {
        self.parsed
            .tbs_certificate
            .subject_public_key_info
            .to_der()
            .map_err(|e| V4Error::InvalidCertificate {
                reason: format!("failed to encode subject public key: {e}"),
            })
    }

    #[must_use]
    pub fn subject(&self) -> String {
        self.parsed.tbs_certificate.subject.to_string()
    }

    #[must_use]
    pub fn issuer(&self) -> String {
        self.parsed.tbs_certificate.issuer.to_string()
    }

    /// Serial number as lowercase hex.
    #[must_use]
    pub fn serial_hex(&self) -> String {
        hex::encode(self.parsed.tbs_certificate.serial_number.as_bytes())
    }

    /// SHA-256 over the original encoding, lowercase hex.
    #[must_use]
    pub fn sha256_fingerprint(&self) -> String {
        hex::encode(Sha256::digest(&self.der))
    }
}

impl PartialEq for VerbatimCertificate {
    fn eq(&self, other: &Self) -> bool {
        self.der == other.der
    }
}

impl Eq for VerbatimCertificate {}

impl fmt::Debug for VerbatimCertificate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "VerbatimCertificate(subject={}, len={})",
            self.subject(),
            self.der.len()
        )
    }
}
