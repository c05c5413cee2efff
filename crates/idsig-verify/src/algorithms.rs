//! Signature algorithm allow-list.
//!
//! Ids are shared with the v2/v3 APK signing blocks. Anything not listed here
//! is rejected; DSA ids are deliberately absent.

use sha2::{Digest, Sha256, Sha512};

use crate::error::V4Error;

/// Supported signature algorithm ids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SignatureAlgorithm {
    RsaPssWithSha256,
    RsaPssWithSha512,
    RsaPkcs1V15WithSha256,
    RsaPkcs1V15WithSha512,
    EcdsaWithSha256,
    EcdsaWithSha512,
    VerityRsaPkcs1V15WithSha256,
    VerityEcdsaWithSha256,
}

/// Key family a signature algorithm expects in `publicKey`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyAlgorithm {
    Rsa,
    Ec,
}

impl KeyAlgorithm {
    pub fn name(self) -> &'static str {
        match self {
            Self::Rsa => "RSA",
            Self::Ec => "EC",
        }
    }
}

/// Message digest applied to the signed data before the key operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDigestAlgorithm {
    Sha256,
    Sha512,
}

impl ContentDigestAlgorithm {
    pub fn digest(self, data: &[u8]) -> Vec<u8> {
        match self {
            Self::Sha256 => Sha256::digest(data).to_vec(),
            Self::Sha512 => Sha512::digest(data).to_vec(),
        }
    }

    pub fn output_len(self) -> usize {
        match self {
            Self::Sha256 => 32,
            Self::Sha512 => 64,
        }
    }
}

/// Padding / encoding parameters beyond the digest.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureParams {
    /// RSASSA-PKCS1-v1_5.
    Pkcs1V15,
    /// RSASSA-PSS with MGF1 over the same digest.
    Pss { salt_len: usize },
    /// DER-encoded ECDSA `(r, s)`.
    EcdsaDer,
}

impl SignatureAlgorithm {
    pub const ALL: [Self; 8] = [
        Self::RsaPssWithSha256,
        Self::RsaPssWithSha512,
        Self::RsaPkcs1V15WithSha256,
        Self::RsaPkcs1V15WithSha512,
        Self::EcdsaWithSha256,
        Self::EcdsaWithSha512,
        Self::VerityRsaPkcs1V15WithSha256,
        Self::VerityEcdsaWithSha256,
    ];

    pub fn id(self) -> u32 {
        match self {
            Self::RsaPssWithSha256 => 0x0101,
            Self::RsaPssWithSha512 => 0x0102,
            Self::RsaPkcs1V15WithSha256 => 0x0103,
            Self::RsaPkcs1V15WithSha512 => 0x0104,
            Self::EcdsaWithSha256 => 0x0201,
            Self::EcdsaWithSha512 => 0x0202,
            Self::VerityRsaPkcs1V15WithSha256 => 0x0421,
            Self::VerityEcdsaWithSha256 => 0x0423,
        }
    }

    pub fn key_algorithm(self) -> KeyAlgorithm {
        match self {
            Self::RsaPssWithSha256
            | Self::RsaPssWithSha512
            | Self::RsaPkcs1V15WithSha256
            | Self::RsaPkcs1V15WithSha512
            | Self::VerityRsaPkcs1V15WithSha256 => KeyAlgorithm::Rsa,
            Self::EcdsaWithSha256 | Self::EcdsaWithSha512 | Self::VerityEcdsaWithSha256 => {
                KeyAlgorithm::Ec
            }
        }
    }

    /// JCA-style name, used in logs and error messages.
    pub fn name(self) -> &'static str {
        match self {
            Self::RsaPssWithSha256 => "SHA256withRSA/PSS",
            Self::RsaPssWithSha512 => "SHA512withRSA/PSS",
            Self::RsaPkcs1V15WithSha256 | Self::VerityRsaPkcs1V15WithSha256 => "SHA256withRSA",
            Self::RsaPkcs1V15WithSha512 => "SHA512withRSA",
            Self::EcdsaWithSha256 | Self::VerityEcdsaWithSha256 => "SHA256withECDSA",
            Self::EcdsaWithSha512 => "SHA512withECDSA",
        }
    }

    pub fn digest_algorithm(self) -> ContentDigestAlgorithm {
        match self {
            Self::RsaPssWithSha256
            | Self::RsaPkcs1V15WithSha256
            | Self::EcdsaWithSha256
            | Self::VerityRsaPkcs1V15WithSha256
            | Self::VerityEcdsaWithSha256 => ContentDigestAlgorithm::Sha256,
            Self::RsaPssWithSha512 | Self::RsaPkcs1V15WithSha512 | Self::EcdsaWithSha512 => {
                ContentDigestAlgorithm::Sha512
            }
        }
    }

    pub fn params(self) -> SignatureParams {
        match self {
            Self::RsaPssWithSha256 | Self::RsaPssWithSha512 => SignatureParams::Pss {
                salt_len: self.digest_algorithm().output_len(),
            },
            Self::RsaPkcs1V15WithSha256
            | Self::RsaPkcs1V15WithSha512
            | Self::VerityRsaPkcs1V15WithSha256 => SignatureParams::Pkcs1V15,
            Self::EcdsaWithSha256 | Self::EcdsaWithSha512 | Self::VerityEcdsaWithSha256 => {
                SignatureParams::EcdsaDer
            }
        }
    }
}

impl TryFrom<u32> for SignatureAlgorithm {
    type Error = V4Error;

    fn try_from(id: u32) -> Result<Self, Self::Error> {
        Self::ALL
            .into_iter()
            .find(|alg| alg.id() == id)
            .ok_or(V4Error::UnsupportedAlgorithm { id })
    }
}

impl std::fmt::Display for SignatureAlgorithm {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}
