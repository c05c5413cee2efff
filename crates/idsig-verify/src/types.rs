//! Decoded v4 signature records.
//!
//! All records are owned copies of the untrusted input. Nothing here is
//! trusted until [`crate::verify`] has checked the signature.

use crate::error::DecodeError;
use crate::wire::{self, Reader};

/// Envelope versions this verifier accepts.
pub const SUPPORTED_VERSIONS: &[u32] = &[2];

/// Hash algorithm id for SHA-256 Merkle trees.
pub const HASHING_ALGORITHM_SHA256: u32 = 1;

/// `log2BlockSize` of 4096-byte Merkle tree blocks.
pub const LOG2_BLOCK_SIZE_4096_BYTES: u8 = 12;

/// Default cap on the combined size of `hashingInfo` and `signingInfos`.
pub const MAX_SIGNATURE_SIZE: usize = 8096;

/// Top-level v4 signature record.
///
/// The two nested records are kept as raw bytes and decoded on demand.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SignatureEnvelope {
    pub version: u32,
    pub hashing_info: Vec<u8>,
    pub signing_infos: Vec<u8>,
}

/// Failure modes of [`SignatureEnvelope::decode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EnvelopeError {
    UnsupportedVersion(u32),
    Decode(DecodeError),
}

impl From<DecodeError> for EnvelopeError {
    fn from(err: DecodeError) -> Self {
        Self::Decode(err)
    }
}

impl SignatureEnvelope {
    /// Decode an envelope.
    ///
    /// The version is checked as soon as it is read; the nested records of an
    /// unsupported version are never looked at. Bytes after `signingInfos`
    /// (a sidecar file carries the Merkle tree there) are ignored.
    pub fn decode(bytes: &[u8], max_signature_size: usize) -> Result<Self, EnvelopeError> {
        let mut r = Reader::new(bytes);
        let version = r.read_u32("version")?;
        if !SUPPORTED_VERSIONS.contains(&version) {
            return Err(EnvelopeError::UnsupportedVersion(version));
        }

        let hashing_info = r.read_bytes_limited("hashingInfo", max_signature_size)?;
        let budget = max_signature_size.saturating_sub(hashing_info.len());
        let signing_infos = r.read_bytes_limited("signingInfos", budget)?;

        Ok(Self {
            version,
            hashing_info: hashing_info.to_vec(),
            signing_infos: signing_infos.to_vec(),
        })
    }

    pub fn is_version_supported(&self) -> bool {
        SUPPORTED_VERSIONS.contains(&self.version)
    }

    pub fn decode_hashing_info(&self) -> Result<HashingInfo, DecodeError> {
        HashingInfo::decode(&self.hashing_info)
    }

    pub fn decode_signing_infos(&self) -> Result<SigningInfos, DecodeError> {
        SigningInfos::decode(&self.signing_infos)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(
            4 + wire::bytes_size(&self.hashing_info) + wire::bytes_size(&self.signing_infos),
        );
        wire::put_u32(&mut out, self.version);
        wire::put_bytes(&mut out, &self.hashing_info);
        wire::put_bytes(&mut out, &self.signing_infos);
        out
    }
}

/// Commitment to the package content (Merkle tree parameters and root).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HashingInfo {
    pub hash_algorithm: u32,
    pub log2_block_size: u8,
    pub salt: Vec<u8>,
    pub root_hash: Vec<u8>,
}

impl HashingInfo {
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        Ok(Self {
            hash_algorithm: r.read_u32("hashAlgorithm")?,
            log2_block_size: r.read_u8("log2BlockSize")?,
            salt: r.read_bytes("salt")?.to_vec(),
            root_hash: r.read_bytes("rootHash")?.to_vec(),
        })
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        wire::put_u32(&mut out, self.hash_algorithm);
        out.push(self.log2_block_size);
        wire::put_bytes(&mut out, &self.salt);
        wire::put_bytes(&mut out, &self.root_hash);
        out
    }
}

/// One signer: certificate, key, algorithm and signature.
#[derive(Clone, PartialEq, Eq)]
pub struct SigningInfo {
    /// Digest from an older signing scheme, carried for cross-scheme matching.
    pub apk_digest: Vec<u8>,
    /// DER X.509 certificate.
    pub certificate: Vec<u8>,
    /// Free-form blob covered by the signature.
    pub additional_data: Vec<u8>,
    /// DER SubjectPublicKeyInfo; must match the certificate's key.
    pub public_key: Vec<u8>,
    pub signature_algorithm_id: u32,
    pub signature: Vec<u8>,
}

impl SigningInfo {
    /// Decode a signer record; trailing bytes are ignored.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        Self::read(&mut Reader::new(bytes))
    }

    fn read(r: &mut Reader<'_>) -> Result<Self, DecodeError> {
        Ok(Self {
            apk_digest: r.read_bytes("apkDigest")?.to_vec(),
            certificate: r.read_bytes("certificate")?.to_vec(),
            additional_data: r.read_bytes("additionalData")?.to_vec(),
            public_key: r.read_bytes("publicKey")?.to_vec(),
            signature_algorithm_id: r.read_u32("signatureAlgorithmId")?,
            signature: r.read_bytes("signature")?.to_vec(),
        })
    }

    /// Advance past one signer record without copying it.
    fn skip(r: &mut Reader<'_>) -> Result<(), DecodeError> {
        for field in ["apkDigest", "certificate", "additionalData", "publicKey"] {
            r.read_bytes(field)?;
        }
        r.read_u32("signatureAlgorithmId")?;
        r.read_bytes("signature")?;
        Ok(())
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = Vec::new();
        wire::put_bytes(&mut out, &self.apk_digest);
        wire::put_bytes(&mut out, &self.certificate);
        wire::put_bytes(&mut out, &self.additional_data);
        wire::put_bytes(&mut out, &self.public_key);
        wire::put_u32(&mut out, self.signature_algorithm_id);
        wire::put_bytes(&mut out, &self.signature);
        out
    }
}

impl std::fmt::Debug for SigningInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SigningInfo")
            .field("apk_digest", &hex::encode(&self.apk_digest))
            .field("certificate_len", &self.certificate.len())
            .field("additional_data_len", &self.additional_data.len())
            .field("public_key_len", &self.public_key.len())
            .field(
                "signature_algorithm_id",
                &format_args!("{:#06x}", self.signature_algorithm_id),
            )
            .field("signature_len", &self.signature.len())
            .finish()
    }
}

/// Signer record bound to another signing scheme's block id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInfoBlock {
    pub block_id: u32,
    pub signing_info: Vec<u8>,
}

/// Default signer plus optional per-scheme signer blocks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SigningInfos {
    /// Encoded default [`SigningInfo`].
    pub default_signing_info: Vec<u8>,
    /// In wire order; ids are expected to be unique.
    pub signing_info_blocks: Vec<SigningInfoBlock>,
}

impl SigningInfos {
    /// Decode the signer list.
    ///
    /// The default signer is only walked to find where it ends; blocks run to
    /// the end of the buffer, so a partial trailing block is an error.
    pub fn decode(bytes: &[u8]) -> Result<Self, DecodeError> {
        let mut r = Reader::new(bytes);
        SigningInfo::skip(&mut r)?;
        let default_signing_info = bytes
            .get(..r.position())
            .map(<[u8]>::to_vec)
            .unwrap_or_default();

        let mut signing_info_blocks = Vec::new();
        while r.has_remaining() {
            let block_id = r.read_u32("signingInfoBlock.blockId")?;
            let signing_info = r.read_bytes("signingInfoBlock.signingInfo")?.to_vec();
            signing_info_blocks.push(SigningInfoBlock {
                block_id,
                signing_info,
            });
        }

        Ok(Self {
            default_signing_info,
            signing_info_blocks,
        })
    }

    pub fn new(default_signer: &SigningInfo) -> Self {
        Self {
            default_signing_info: default_signer.to_bytes(),
            signing_info_blocks: Vec::new(),
        }
    }

    pub fn with_block(mut self, block_id: u32, signer: &SigningInfo) -> Self {
        self.signing_info_blocks.push(SigningInfoBlock {
            block_id,
            signing_info: signer.to_bytes(),
        });
        self
    }

    pub fn decode_default(&self) -> Result<SigningInfo, DecodeError> {
        SigningInfo::decode(&self.default_signing_info)
    }

    /// First block with `block_id`, undecoded.
    pub fn find_block(&self, block_id: u32) -> Option<&SigningInfoBlock> {
        self.signing_info_blocks
            .iter()
            .find(|block| block.block_id == block_id)
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut out = self.default_signing_info.clone();
        for block in &self.signing_info_blocks {
            wire::put_u32(&mut out, block.block_id);
            wire::put_bytes(&mut out, &block.signing_info);
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn signer(tag: u8) -> SigningInfo {
        SigningInfo {
            apk_digest: vec![tag; 32],
            certificate: vec![0x30, tag],
            additional_data: Vec::new(),
            public_key: vec![0x30, 0x01, tag],
            signature_algorithm_id: 0x0201,
            signature: vec![tag; 8],
        }
    }

    fn hashing_info() -> HashingInfo {
        HashingInfo {
            hash_algorithm: HASHING_ALGORITHM_SHA256,
            log2_block_size: LOG2_BLOCK_SIZE_4096_BYTES,
            salt: Vec::new(),
            root_hash: vec![0xab; 32],
        }
    }

    #[test]
    fn test_hashing_info_decode_ignores_trailing_bytes() {
        let mut bytes = hashing_info().to_bytes();
        bytes.extend_from_slice(b"future-field");
        assert_eq!(HashingInfo::decode(&bytes).unwrap(), hashing_info());
    }

    #[test]
    fn test_hashing_info_truncated_root_hash() {
        let bytes = hashing_info().to_bytes();
        let err = HashingInfo::decode(&bytes[..bytes.len() - 1]).unwrap_err();
        assert_eq!(err.field(), "rootHash");
    }

    #[test]
    fn test_signing_info_field_order() {
        let s = signer(7);
        let bytes = s.to_bytes();
        // apkDigest comes first on the wire.
        assert_eq!(&bytes[..4], &32u32.to_le_bytes());
        assert_eq!(&bytes[4..36], &[7u8; 32]);
        assert_eq!(SigningInfo::decode(&bytes).unwrap(), s);
    }

    #[test]
    fn test_signing_info_debug_omits_key_material() {
        let rendered = format!("{:?}", signer(1));
        assert!(rendered.contains("signature_len: 8"));
        assert!(rendered.contains("0x0201"));
    }

    #[test]
    fn test_signing_infos_without_blocks() {
        let infos = SigningInfos::new(&signer(1));
        let decoded = SigningInfos::decode(&infos.to_bytes()).unwrap();
        assert!(decoded.signing_info_blocks.is_empty());
        assert_eq!(decoded.decode_default().unwrap(), signer(1));
    }

    #[test]
    fn test_signing_infos_blocks_preserve_order() {
        let infos = SigningInfos::new(&signer(0))
            .with_block(2, &signer(2))
            .with_block(1, &signer(1));
        let decoded = SigningInfos::decode(&infos.to_bytes()).unwrap();
        let ids: Vec<u32> = decoded
            .signing_info_blocks
            .iter()
            .map(|b| b.block_id)
            .collect();
        assert_eq!(ids, vec![2, 1]);
        assert_eq!(decoded, infos);
    }

    #[test]
    fn test_signing_infos_partial_block_rejected() {
        let mut bytes = SigningInfos::new(&signer(0)).to_bytes();
        bytes.extend_from_slice(&[1, 0]);
        let err = SigningInfos::decode(&bytes).unwrap_err();
        assert_eq!(err.field(), "signingInfoBlock.blockId");
    }

    #[test]
    fn test_signing_infos_blocks_not_decoded_eagerly() {
        // A garbage block body is accepted until somebody selects it.
        let mut infos = SigningInfos::new(&signer(0));
        infos.signing_info_blocks.push(SigningInfoBlock {
            block_id: 9,
            signing_info: vec![0xff; 3],
        });
        let decoded = SigningInfos::decode(&infos.to_bytes()).unwrap();
        let block = decoded.find_block(9).unwrap();
        assert!(SigningInfo::decode(&block.signing_info).is_err());
    }

    #[test]
    fn test_find_block_first_match_wins() {
        let infos = SigningInfos::new(&signer(0))
            .with_block(5, &signer(1))
            .with_block(5, &signer(2));
        let block = infos.find_block(5).unwrap();
        assert_eq!(SigningInfo::decode(&block.signing_info).unwrap(), signer(1));
        assert!(infos.find_block(6).is_none());
    }

    #[test]
    fn test_envelope_roundtrip_with_trailing_tree() {
        let env = SignatureEnvelope {
            version: 2,
            hashing_info: hashing_info().to_bytes(),
            signing_infos: SigningInfos::new(&signer(3)).to_bytes(),
        };
        let mut bytes = env.to_bytes();
        bytes.extend_from_slice(&[0u8; 4096]);
        assert_eq!(
            SignatureEnvelope::decode(&bytes, MAX_SIGNATURE_SIZE).unwrap(),
            env
        );
    }

    #[test]
    fn test_envelope_version_checked_before_fields() {
        // Version 3 followed by a length prefix that runs off the end.
        let mut bytes = 3u32.to_le_bytes().to_vec();
        bytes.extend_from_slice(&u32::MAX.to_le_bytes());
        assert_eq!(
            SignatureEnvelope::decode(&bytes, MAX_SIGNATURE_SIZE),
            Err(EnvelopeError::UnsupportedVersion(3))
        );
    }

    #[test]
    fn test_envelope_size_budget_is_shared() {
        let env = SignatureEnvelope {
            version: 2,
            hashing_info: vec![0u8; 60],
            signing_infos: vec![0u8; 50],
        };
        let bytes = env.to_bytes();
        assert!(SignatureEnvelope::decode(&bytes, 110).is_ok());
        assert_eq!(
            SignatureEnvelope::decode(&bytes, 100),
            Err(EnvelopeError::Decode(DecodeError::TooLong {
                field: "signingInfos",
                len: 50,
                limit: 40
            }))
        );
    }

    #[test]
    fn test_envelope_empty_buffer() {
        assert!(matches!(
            SignatureEnvelope::decode(&[], MAX_SIGNATURE_SIZE),
            Err(EnvelopeError::Decode(DecodeError::Truncated {
                field: "version",
                ..
            }))
        ));
    }
}
