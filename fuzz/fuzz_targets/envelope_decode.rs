#![no_main]

use idsig_verify::{
    verify_bytes, HashingInfo, SignatureEnvelope, SignerSelector, SigningInfo, SigningInfos,
    VerifierConfig, MAX_SIGNATURE_SIZE,
};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Decoders must reject, never panic.
    let _ = HashingInfo::decode(data);
    let _ = SigningInfo::decode(data);
    if let Ok(infos) = SigningInfos::decode(data) {
        let _ = infos.decode_default();
        for block in &infos.signing_info_blocks {
            let _ = SigningInfo::decode(&block.signing_info);
        }
    }

    if let Ok(envelope) = SignatureEnvelope::decode(data, MAX_SIGNATURE_SIZE) {
        let _ = envelope.decode_hashing_info();
        let _ = envelope.decode_signing_infos();
    }

    let selector = data
        .get(..4)
        .and_then(|b| b.try_into().ok())
        .map_or(SignerSelector::Default, |b| {
            SignerSelector::from_raw(u32::from_le_bytes(b))
        });
    let _ = verify_bytes(data.len() as u64, data, selector, &VerifierConfig::default());
});
