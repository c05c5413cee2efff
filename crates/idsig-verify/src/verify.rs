//! v4 signature verification.
//!
//! Pipeline:
//! 1. Fetch envelope bytes and check the version
//! 2. Decode hashing info and signer list
//! 3. Select the signer for the requested block id
//! 4. Rebuild the signed data from file size + records
//! 5. Verify the signature, then the certificate and its key
//! 6. Map the hash algorithm to a content digest type
//!
//! Every step fails closed. Nothing from the envelope is trusted unless all of
//! them pass.

use std::collections::BTreeMap;
use std::path::Path;

use crate::algorithms::SignatureAlgorithm;
use crate::certificate::VerbatimCertificate;
use crate::config::VerifierConfig;
use crate::crypto::{verify_signature, PublicKey};
use crate::error::{V4Error, V4Result};
use crate::signed_data::signed_data;
use crate::source::{SidecarFileSource, SignatureSource};
use crate::types::{
    EnvelopeError, HashingInfo, SignatureEnvelope, SigningInfo, SigningInfos,
    HASHING_ALGORITHM_SHA256,
};

/// Raw selector value meaning "the record's own default signer".
pub const SCHEME_DEFAULT_BLOCK_ID: u32 = 0xffff_ffff;

/// Block id of the v3 signing block, which the default signer binds to.
pub const V3_BLOCK_ID: u32 = 0xf053_68c0;

/// Block id of the v3.1 signing block.
pub const V31_BLOCK_ID: u32 = 0x1b93_ad61;

/// Which signer inside the record to verify.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SignerSelector {
    #[default]
    Default,
    /// Signer bound to another scheme's signing block.
    BlockId(u32),
}

impl SignerSelector {
    /// Interpret a raw block id; the sentinel and the v3 id mean the default signer.
    pub fn from_raw(block_id: u32) -> Self {
        match block_id {
            SCHEME_DEFAULT_BLOCK_ID | V3_BLOCK_ID => Self::Default,
            other => Self::BlockId(other),
        }
    }

    pub fn to_raw(self) -> u32 {
        match self {
            Self::Default => SCHEME_DEFAULT_BLOCK_ID,
            Self::BlockId(id) => id,
        }
    }
}

impl From<u32> for SignerSelector {
    fn from(block_id: u32) -> Self {
        Self::from_raw(block_id)
    }
}

/// Content digest types of the APK signing block ecosystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContentDigestType {
    /// fs-verity style Merkle tree over 4 KiB chunks, SHA-256.
    VerityChunkedSha256,
}

impl ContentDigestType {
    pub fn id(self) -> u32 {
        match self {
            Self::VerityChunkedSha256 => 3,
        }
    }

    /// Digest type for a `hashingInfo.hashAlgorithm` value.
    pub fn from_hash_algorithm(hash_algorithm: u32) -> V4Result<Self> {
        match hash_algorithm {
            HASHING_ALGORITHM_SHA256 => Ok(Self::VerityChunkedSha256),
            id => Err(V4Error::UnsupportedHashAlgorithm { id }),
        }
    }
}

/// Trusted output of a successful verification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VerifiedSigner {
    /// Signer certificates; exactly one today.
    pub certificates: Vec<VerbatimCertificate>,
    /// Digest from the older scheme this record is bound to.
    pub apk_digest: Vec<u8>,
    /// Digest type id -> root hash, to be enforced against file content.
    pub content_digests: BTreeMap<u32, Vec<u8>>,
}

/// Decode an envelope, mapping version and shape failures to [`V4Error`].
pub fn decode_envelope(bytes: &[u8], config: &VerifierConfig) -> V4Result<SignatureEnvelope> {
    SignatureEnvelope::decode(bytes, config.max_signature_size).map_err(|e| match e {
        EnvelopeError::UnsupportedVersion(version) => V4Error::UnsupportedVersion { version },
        EnvelopeError::Decode(err) => V4Error::Decode(err),
    })
}

/// Verify already-fetched envelope bytes for a package of `file_size` bytes.
///
/// An empty buffer is [`V4Error::EmptySignature`], not a decode failure.
pub fn verify_bytes(
    file_size: u64,
    bytes: &[u8],
    selector: SignerSelector,
    config: &VerifierConfig,
) -> V4Result<VerifiedSigner> {
    if bytes.is_empty() {
        return Err(V4Error::EmptySignature);
    }
    let envelope = decode_envelope(bytes, config)?;
    verify_envelope(file_size, &envelope, selector)
}

/// Verify a decoded envelope for a package of `file_size` bytes.
pub fn verify_envelope(
    file_size: u64,
    envelope: &SignatureEnvelope,
    selector: SignerSelector,
) -> V4Result<VerifiedSigner> {
    if !envelope.is_version_supported() {
        return Err(V4Error::UnsupportedVersion {
            version: envelope.version,
        });
    }

    let hashing_info = envelope.decode_hashing_info()?;
    let signing_infos = envelope.decode_signing_infos()?;
    let signing_info = select_signer(&signing_infos, selector)?;
    tracing::debug!(
        selector = ?selector,
        blocks = signing_infos.signing_info_blocks.len(),
        "selected v4 signer"
    );

    let data = signed_data(file_size, &hashing_info, &signing_info)?;
    let (certificate, apk_digest) = verify_signer(&signing_info, &data)?;

    assemble(certificate, apk_digest, &hashing_info)
}

/// Pick the signer for `selector`.
///
/// The default selector always yields the default signer. A block id is an
/// exact-match scan over the blocks in wire order; the first match wins, and
/// a missing block is never downgraded to the default signer.
pub fn select_signer(infos: &SigningInfos, selector: SignerSelector) -> V4Result<SigningInfo> {
    match selector {
        SignerSelector::Default => Ok(infos.decode_default()?),
        SignerSelector::BlockId(block_id) => {
            let block = infos
                .find_block(block_id)
                .ok_or(V4Error::SignerBlockNotFound { block_id })?;
            SigningInfo::decode(&block.signing_info)
                .map_err(|source| V4Error::SignerBlock { block_id, source })
        }
    }
}

/// Verify one signer over `data`, returning its certificate and apk digest.
pub fn verify_signer(
    signing_info: &SigningInfo,
    data: &[u8],
) -> V4Result<(VerbatimCertificate, Vec<u8>)> {
    let algorithm = SignatureAlgorithm::try_from(signing_info.signature_algorithm_id)?;
    tracing::debug!(algorithm = algorithm.name(), "resolved signature algorithm");

    let key = PublicKey::from_spki_der(algorithm.key_algorithm(), &signing_info.public_key)?;
    verify_signature(algorithm, &key, data, &signing_info.signature)?;
    tracing::debug!(algorithm = algorithm.name(), "v4 signature verified");

    let certificate = VerbatimCertificate::from_der(&signing_info.certificate)?;
    if certificate.public_key_der()? != signing_info.public_key {
        return Err(V4Error::PublicKeyMismatch);
    }

    Ok((certificate, signing_info.apk_digest.clone()))
}

fn assemble(
    certificate: VerbatimCertificate,
    apk_digest: Vec<u8>,
    hashing_info: &HashingInfo,
) -> V4Result<VerifiedSigner> {
    let digest_type = ContentDigestType::from_hash_algorithm(hashing_info.hash_algorithm)?;
    let mut content_digests = BTreeMap::new();
    content_digests.insert(digest_type.id(), hashing_info.root_hash.clone());

    Ok(VerifiedSigner {
        certificates: vec![certificate],
        apk_digest,
        content_digests,
    })
}

/// Verifier bound to a signature source.
#[derive(Debug, Clone)]
pub struct SchemeV4Verifier<S> {
    source: S,
    config: VerifierConfig,
}

impl SchemeV4Verifier<SidecarFileSource> {
    /// Verifier reading sidecar files with the extension from `config`.
    pub fn sidecar(config: VerifierConfig) -> Self {
        let source = SidecarFileSource::new(config.sidecar_extension.clone());
        Self { source, config }
    }
}

impl<S: SignatureSource> SchemeV4Verifier<S> {
    pub fn new(source: S, config: VerifierConfig) -> Self {
        Self { source, config }
    }

    pub fn config(&self) -> &VerifierConfig {
        &self.config
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Fetch and decode the envelope for `path`.
    ///
    /// Missing or empty bytes are [`V4Error::SignatureNotFound`]; an
    /// unsupported version is rejected before the nested records are touched.
    pub fn extract_signature(&self, path: &Path) -> V4Result<SignatureEnvelope> {
        let bytes = self
            .source
            .fetch(path)
            .map_err(|source| V4Error::Source {
                path: path.to_path_buf(),
                source,
            })?
            .filter(|bytes| !bytes.is_empty())
            .ok_or_else(|| V4Error::SignatureNotFound {
                path: path.to_path_buf(),
            })?;
        let envelope = decode_envelope(&bytes, &self.config)?;
        tracing::debug!(
            path = %path.display(),
            version = envelope.version,
            "decoded v4 signature envelope"
        );
        Ok(envelope)
    }

    /// Verify the default signer for `path`.
    pub fn extract_certificates(&self, path: &Path) -> V4Result<VerifiedSigner> {
        self.verify(path, SignerSelector::Default)
    }

    /// Verify the signer selected by `selector` for `path`.
    pub fn verify(&self, path: &Path, selector: SignerSelector) -> V4Result<VerifiedSigner> {
        let result = self.verify_inner(path, selector);
        if let Err(e) = &result {
            tracing::warn!(
                path = %path.display(),
                kind = ?e.kind(),
                error = %e,
                "v4 signature verification failed"
            );
        }
        result
    }

    fn verify_inner(&self, path: &Path, selector: SignerSelector) -> V4Result<VerifiedSigner> {
        let envelope = self.extract_signature(path)?;
        let file_size = self
            .source
            .file_size(path)
            .map_err(|source| V4Error::Source {
                path: path.to_path_buf(),
                source,
            })?;
        verify_envelope(file_size, &envelope, selector)
    }
}
