//! Public key reconstruction and signature verification.
//!
//! Supported keys: RSA up to [`MAX_RSA_MODULUS_BITS`], and EC on NIST P-256
//! or P-384. Other curves (P-521 included) are rejected as
//! [`V4Error::InvalidPublicKey`].
//!
//! Contract target:
//! - SPKI decoding and raw signature checks only
//! - no certificate handling, no record parsing

use p256::ecdsa::signature::hazmat::PrehashVerifier;
use rsa::pkcs8::DecodePublicKey;
use rsa::{BigUint, Pkcs1v15Sign, Pss, RsaPublicKey};
use sha2::{Sha256, Sha512};
use spki::{ObjectIdentifier, SubjectPublicKeyInfoRef};
use x509_cert::der::oid::AssociatedOid;
use x509_cert::der::Decode;

use crate::algorithms::{ContentDigestAlgorithm, KeyAlgorithm, SignatureAlgorithm, SignatureParams};
use crate::error::{V4Error, V4Result};

/// `id-ecPublicKey`.
const EC_PUBLIC_KEY_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.10045.2.1");

/// `rsaEncryption`.
const RSA_ENCRYPTION_OID: ObjectIdentifier = ObjectIdentifier::new_unwrap("1.2.840.113549.1.1.1");

/// Largest RSA modulus accepted, in bits (the `rsa` crate defaults to 4096).
pub const MAX_RSA_MODULUS_BITS: usize = 16_384;

/// A public key reconstructed from SubjectPublicKeyInfo bytes.
#[derive(Debug, Clone)]
pub enum PublicKey {
    Rsa(RsaPublicKey),
    P256(p256::ecdsa::VerifyingKey),
    P384(p384::ecdsa::VerifyingKey),
}

impl PublicKey {
    /// Decode `spki_der` as a key of the given family.
    pub fn from_spki_der(algorithm: KeyAlgorithm, spki_der: &[u8]) -> V4Result<Self> {
        let invalid = |reason: String| V4Error::InvalidPublicKey {
            algorithm: algorithm.name(),
            reason,
        };

        let spki =
            SubjectPublicKeyInfoRef::from_der(spki_der).map_err(|e| invalid(e.to_string()))?;

        match algorithm {
            KeyAlgorithm::Rsa => {
                if spki.algorithm.oid != RSA_ENCRYPTION_OID {
                    return Err(invalid(format!(
                        "not an RSA key (algorithm {})",
                        spki.algorithm.oid
                    )));
                }
                let key_bytes = spki
                    .subject_public_key
                    .as_bytes()
                    .ok_or_else(|| invalid("unaligned key bit string".to_string()))?;
                let key = rsa::pkcs1::RsaPublicKey::try_from(key_bytes)
                    .map_err(|e| invalid(format!("bad PKCS#1 public key: {e}")))?;
                RsaPublicKey::new_with_max_size(
                    BigUint::from_bytes_be(key.modulus.as_bytes()),
                    BigUint::from_bytes_be(key.public_exponent.as_bytes()),
                    MAX_RSA_MODULUS_BITS,
                )
                .map(Self::Rsa)
                .map_err(|e| invalid(e.to_string()))
            }
            KeyAlgorithm::Ec => {
                if spki.algorithm.oid != EC_PUBLIC_KEY_OID {
                    return Err(invalid(format!(
                        "not an EC key (algorithm {})",
                        spki.algorithm.oid
                    )));
                }
                let curve: ObjectIdentifier = spki
                    .algorithm
                    .parameters_oid()
                    .map_err(|e| invalid(format!("missing curve parameters: {e}")))?;

                if curve == p256::NistP256::OID {
                    p256::PublicKey::from_public_key_der(spki_der)
                        .map(|pk| Self::P256(pk.into()))
                        .map_err(|e| invalid(format!("bad P-256 public key: {e}")))
                } else if curve == p384::NistP384::OID {
                    p384::PublicKey::from_public_key_der(spki_der)
                        .map(|pk| Self::P384(pk.into()))
                        .map_err(|e| invalid(format!("bad P-384 public key: {e}")))
                } else {
                    Err(invalid(format!("unsupported curve {curve}")))
                }
            }
        }
    }
}

/// Check `signature` over `message` with `key`.
///
/// Malformed signature encodings and failed verification are reported as
/// distinct errors; both are terminal.
pub fn verify_signature(
    algorithm: SignatureAlgorithm,
    key: &PublicKey,
    message: &[u8],
    signature: &[u8],
) -> V4Result<()> {
    let name = algorithm.name();
    let malformed = |reason: String| V4Error::MalformedSignature {
        algorithm: name,
        reason,
    };
    let mismatch = || V4Error::SignatureMismatch { algorithm: name };

    let digest_alg = algorithm.digest_algorithm();
    let prehash = digest_alg.digest(message);

    match (key, algorithm.params()) {
        (PublicKey::Rsa(rsa_key), SignatureParams::Pkcs1V15) => {
            let scheme = match digest_alg {
                ContentDigestAlgorithm::Sha256 => Pkcs1v15Sign::new::<Sha256>(),
                ContentDigestAlgorithm::Sha512 => Pkcs1v15Sign::new::<Sha512>(),
            };
            rsa_key
                .verify(scheme, &prehash, signature)
                .map_err(|_| mismatch())
        }
        (PublicKey::Rsa(rsa_key), SignatureParams::Pss { salt_len }) => {
            let scheme = match digest_alg {
                ContentDigestAlgorithm::Sha256 => Pss::new_with_salt::<Sha256>(salt_len),
                ContentDigestAlgorithm::Sha512 => Pss::new_with_salt::<Sha512>(salt_len),
            };
            rsa_key
                .verify(scheme, &prehash, signature)
                .map_err(|_| mismatch())
        }
        (PublicKey::P256(vk), SignatureParams::EcdsaDer) => {
            let sig = p256::ecdsa::Signature::from_der(signature)
                .map_err(|e| malformed(format!("bad ECDSA P-256 signature: {e}")))?;
            vk.verify_prehash(&prehash, &sig).map_err(|_| mismatch())
        }
        (PublicKey::P384(vk), SignatureParams::EcdsaDer) => {
            let sig = p384::ecdsa::Signature::from_der(signature)
                .map_err(|e| malformed(format!("bad ECDSA P-384 signature: {e}")))?;
            vk.verify_prehash(&prehash, &sig).map_err(|_| mismatch())
        }
        // Only reachable if a caller pairs a key with the wrong algorithm.
        _ => Err(V4Error::InvalidPublicKey {
            algorithm: algorithm.key_algorithm().name(),
            reason: format!("key type does not match {name}"),
        }),
    }
}
