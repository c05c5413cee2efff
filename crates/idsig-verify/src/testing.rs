//! Fixture builders: signing keys, certificates and signed v4 envelopes.
//!
//! Only compiled for tests or with the `testing` feature. Helpers panic on
//! failure; they are not meant for production signing.

use std::str::FromStr;
use std::sync::OnceLock;
use std::time::Duration;

use p256::ecdsa::signature::hazmat::PrehashSigner;
use rand::rngs::OsRng;
use rsa::pkcs8::EncodePublicKey;
use rsa::{Pkcs1v15Sign, Pss, RsaPrivateKey};
use sha2::{Sha256, Sha512};
use spki::{AlgorithmIdentifierOwned, ObjectIdentifier, SubjectPublicKeyInfoOwned};
use x509_cert::certificate::{Certificate, TbsCertificate, Version};
use x509_cert::der::asn1::BitString;
use x509_cert::der::{Decode, Encode};
use x509_cert::name::Name;
use x509_cert::serial_number::SerialNumber;
use x509_cert::time::Validity;

use crate::algorithms::{ContentDigestAlgorithm, KeyAlgorithm, SignatureAlgorithm, SignatureParams};
use crate::signed_data::signed_data;
use crate::types::{
    HashingInfo, SignatureEnvelope, SigningInfo, SigningInfos, HASHING_ALGORITHM_SHA256,
    LOG2_BLOCK_SIZE_4096_BYTES,
};

/// `ecdsa-with-SHA256`; fixture certificates are never checked against it.
const ECDSA_WITH_SHA256_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.4.3.2");

/// Default fixture subject.
pub const TEST_SUBJECT: &str = "CN=idsig test signer";

static RSA_KEY: OnceLock<RsaPrivateKey> = OnceLock::new();

/// A private key able to produce v4 signatures.
#[derive(Clone)]
pub enum TestKey {
    P256(p256::ecdsa::SigningKey),
    P384(p384::ecdsa::SigningKey),
    Rsa(RsaPrivateKey),
}

impl std::fmt::Debug for TestKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            Self::P256(_) => "P256",
            Self::P384(_) => "P384",
            Self::Rsa(_) => "Rsa",
        };
        write!(f, "TestKey::{name}")
    }
}

impl TestKey {
    pub fn p256() -> Self {
        Self::P256(p256::ecdsa::SigningKey::random(&mut OsRng))
    }

    pub fn p384() -> Self {
        Self::P384(p384::ecdsa::SigningKey::random(&mut OsRng))
    }

    /// RSA-2048. Generated once per process and shared.
    pub fn rsa() -> Self {
        let key = RSA_KEY.get_or_init(|| {
            RsaPrivateKey::new(&mut OsRng, 2048).expect("RSA key generation failed")
        });
        Self::Rsa(key.clone())
    }

    pub fn key_algorithm(&self) -> KeyAlgorithm {
        match self {
            Self::Rsa(_) => KeyAlgorithm::Rsa,
            Self::P256(_) | Self::P384(_) => KeyAlgorithm::Ec,
        }
    }

    /// Algorithm used when a fixture does not ask for a specific one.
    pub fn default_algorithm(&self) -> SignatureAlgorithm {
        match self {
            Self::P256(_) => SignatureAlgorithm::EcdsaWithSha256,
            Self::P384(_) => SignatureAlgorithm::EcdsaWithSha512,
            Self::Rsa(_) => SignatureAlgorithm::RsaPkcs1V15WithSha256,
        }
    }

    /// DER SubjectPublicKeyInfo.
    pub fn public_key_der(&self) -> Vec<u8> {
        let doc = match self {
            Self::P256(sk) => sk.verifying_key().to_public_key_der(),
            Self::P384(sk) => sk.verifying_key().to_public_key_der(),
            Self::Rsa(sk) => sk.to_public_key().to_public_key_der(),
        };
        doc.expect("public key encoding failed").as_bytes().to_vec()
    }

    /// Sign `message` the way a v4 signer would for `algorithm`.
    ///
    /// # Panics
    ///
    /// If the key family does not match the algorithm.
    pub fn sign(&self, algorithm: SignatureAlgorithm, message: &[u8]) -> Vec<u8> {
        let digest_alg = algorithm.digest_algorithm();
        let prehash = digest_alg.digest(message);

        match (self, algorithm.params()) {
            (Self::P256(sk), SignatureParams::EcdsaDer) => {
                let sig: p256::ecdsa::Signature =
                    sk.sign_prehash(&prehash).expect("ECDSA P-256 signing failed");
                sig.to_der().as_bytes().to_vec()
            }
            (Self::P384(sk), SignatureParams::EcdsaDer) => {
                let sig: p384::ecdsa::Signature =
                    sk.sign_prehash(&prehash).expect("ECDSA P-384 signing failed");
                sig.to_der().as_bytes().to_vec()
            }
            (Self::Rsa(sk), SignatureParams::Pkcs1V15) => {
                let scheme = match digest_alg {
                    ContentDigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                    ContentDigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
                };
                sk.sign(scheme, &prehash).expect("RSA PKCS#1 signing failed")
            }
            (Self::Rsa(sk), SignatureParams::Pss { salt_len }) => {
                let scheme = match digest_alg {
                    ContentDigestAlgorithm::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
                    ContentDigestAlgorithm::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
                };
                sk.sign_with_rng(&mut OsRng, scheme, &prehash)
                    .expect("RSA PSS signing failed")
            }
            (key, _) => panic!("{key:?} cannot sign with {algorithm}"),
        }
    }
}

/// Self-issued DER certificate for `key` with the given subject DN.
///
/// The certificate's own signature is a placeholder; only its subject
/// public key matters to v4 verification.
pub fn certificate_for(key: &TestKey, subject: &str) -> Vec<u8> {
    let spki = SubjectPublicKeyInfoOwned::from_der(&key.public_key_der())
        .expect("fixture SPKI does not decode");
    let name = Name::from_str(subject).expect("invalid fixture subject");
    let signature_algorithm = AlgorithmIdentifierOwned {
        oid: ECDSA_WITH_SHA256_OID,
        parameters: None,
    };

    let tbs_certificate = TbsCertificate {
        version: Version::V3,
        serial_number: SerialNumber::new(&[0x01, 0x5e]).expect("serial"),
        signature: signature_algorithm.clone(),
        issuer: name.clone(),
        validity: Validity::from_now(Duration::from_secs(24 * 3600)).expect("validity"),
        subject: name,
        subject_public_key_info: spki,
        issuer_unique_id: None,
        subject_unique_id: None,
        extensions: None,
    };

    Certificate {
        tbs_certificate,
        signature_algorithm,
        signature: BitString::from_bytes(&[0u8; 16]).expect("signature bits"),
    }
    .to_der()
    .expect("certificate encoding failed")
}

/// Produce a signed [`SigningInfo`] over the given envelope context.
pub fn sign_signing_info(
    key: &TestKey,
    algorithm: SignatureAlgorithm,
    file_size: u64,
    hashing_info: &HashingInfo,
    mut signing_info: SigningInfo,
) -> SigningInfo {
    signing_info.signature_algorithm_id = algorithm.id();
    let data = signed_data(file_size, hashing_info, &signing_info)
        .expect("fixture signed data too large");
    signing_info.signature = key.sign(algorithm, &data);
    signing_info
}

#[derive(Debug, Clone)]
struct SignerFixture {
    key: TestKey,
    algorithm: SignatureAlgorithm,
    apk_digest: Vec<u8>,
    certificate: Vec<u8>,
}

impl SignerFixture {
    fn new(key: &TestKey, apk_digest: &[u8]) -> Self {
        Self {
            key: key.clone(),
            algorithm: key.default_algorithm(),
            apk_digest: apk_digest.to_vec(),
            certificate: certificate_for(key, TEST_SUBJECT),
        }
    }
}

/// Builder for complete, validly signed v4 envelopes.
///
/// Overrides are applied after signing where that is the point of the
/// override (a foreign public key, a raw algorithm id), so a fixture can
/// carry a valid signature next to one bad field.
#[derive(Debug, Clone)]
pub struct EnvelopeBuilder {
    file_size: u64,
    version: u32,
    hashing_info: HashingInfo,
    default_signer: SignerFixture,
    additional_data: Vec<u8>,
    public_key_override: Option<Vec<u8>>,
    algorithm_id_override: Option<u32>,
    blocks: Vec<(u32, SignerFixture)>,
    trailing: Vec<u8>,
}

impl EnvelopeBuilder {
    pub fn new(key: &TestKey, file_size: u64) -> Self {
        Self {
            file_size,
            version: 2,
            hashing_info: HashingInfo {
                hash_algorithm: HASHING_ALGORITHM_SHA256,
                log2_block_size: LOG2_BLOCK_SIZE_4096_BYTES,
                salt: Vec::new(),
                root_hash: vec![0x5a; 32],
            },
            default_signer: SignerFixture::new(key, &[0xa1; 32]),
            additional_data: Vec::new(),
            public_key_override: None,
            algorithm_id_override: None,
            blocks: Vec::new(),
            trailing: Vec::new(),
        }
    }

    pub fn algorithm(mut self, algorithm: SignatureAlgorithm) -> Self {
        self.default_signer.algorithm = algorithm;
        self
    }

    /// Version written to the envelope header.
    pub fn version(mut self, version: u32) -> Self {
        self.version = version;
        self
    }

    pub fn hash_algorithm(mut self, id: u32) -> Self {
        self.hashing_info.hash_algorithm = id;
        self
    }

    pub fn salt(mut self, salt: &[u8]) -> Self {
        self.hashing_info.salt = salt.to_vec();
        self
    }

    pub fn root_hash(mut self, root_hash: &[u8]) -> Self {
        self.hashing_info.root_hash = root_hash.to_vec();
        self
    }

    pub fn apk_digest(mut self, digest: &[u8]) -> Self {
        self.default_signer.apk_digest = digest.to_vec();
        self
    }

    pub fn additional_data(mut self, data: &[u8]) -> Self {
        self.additional_data = data.to_vec();
        self
    }

    /// Replace the default signer's certificate (signed over as given).
    pub fn certificate(mut self, der: Vec<u8>) -> Self {
        self.default_signer.certificate = der;
        self
    }

    /// Replace `publicKey` after signing.
    pub fn public_key_after_signing(mut self, der: Vec<u8>) -> Self {
        self.public_key_override = Some(der);
        self
    }

    /// Replace `signatureAlgorithmId` after signing.
    pub fn algorithm_id_after_signing(mut self, id: u32) -> Self {
        self.algorithm_id_override = Some(id);
        self
    }

    /// Add a signer bound to `block_id`, signed by `key`.
    pub fn block(mut self, block_id: u32, key: &TestKey, apk_digest: &[u8]) -> Self {
        self.blocks.push((block_id, SignerFixture::new(key, apk_digest)));
        self
    }

    /// Bytes appended after the envelope, like the Merkle tree in a sidecar file.
    pub fn trailing(mut self, bytes: &[u8]) -> Self {
        self.trailing = bytes.to_vec();
        self
    }

    pub fn file_size(&self) -> u64 {
        self.file_size
    }

    pub fn hashing_info(&self) -> &HashingInfo {
        &self.hashing_info
    }

    pub fn root_hash_value(&self) -> &[u8] {
        &self.hashing_info.root_hash
    }

    pub fn default_apk_digest(&self) -> &[u8] {
        &self.default_signer.apk_digest
    }

    pub fn default_certificate(&self) -> &[u8] {
        &self.default_signer.certificate
    }

    fn sign_fixture(&self, fixture: &SignerFixture, additional_data: &[u8]) -> SigningInfo {
        let unsigned = SigningInfo {
            apk_digest: fixture.apk_digest.clone(),
            certificate: fixture.certificate.clone(),
            additional_data: additional_data.to_vec(),
            public_key: fixture.key.public_key_der(),
            signature_algorithm_id: 0,
            signature: Vec::new(),
        };
        sign_signing_info(
            &fixture.key,
            fixture.algorithm,
            self.file_size,
            &self.hashing_info,
            unsigned,
        )
    }

    /// The signed default signer, with post-signing overrides applied.
    pub fn default_signing_info(&self) -> SigningInfo {
        let mut info = self.sign_fixture(&self.default_signer, &self.additional_data);
        if let Some(key) = &self.public_key_override {
            info.public_key.clone_from(key);
        }
        if let Some(id) = self.algorithm_id_override {
            info.signature_algorithm_id = id;
        }
        info
    }

    pub fn envelope(&self) -> SignatureEnvelope {
        let mut infos = SigningInfos::new(&self.default_signing_info());
        for (block_id, fixture) in &self.blocks {
            infos = infos.with_block(*block_id, &self.sign_fixture(fixture, &[]));
        }
        SignatureEnvelope {
            version: self.version,
            hashing_info: self.hashing_info.to_bytes(),
            signing_infos: infos.to_bytes(),
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut bytes = self.envelope().to_bytes();
        bytes.extend_from_slice(&self.trailing);
        bytes
    }
}
