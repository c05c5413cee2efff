//! `idsig inspect` - Decode a v4 signature file without verifying it.

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use idsig_verify::{
    decode_envelope, SignatureAlgorithm, SignatureEnvelope, SigningInfo, VerbatimCertificate,
    VerifierConfig,
};

use crate::cli::args::OutputFormat;
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct InspectArgs {
    /// Signature file (.idsig)
    pub signature: PathBuf,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,
}

#[derive(Serialize, Debug)]
pub struct HashingReport {
    pub hash_algorithm: u32,
    pub log2_block_size: u8,
    pub salt: String,
    pub root_hash: String,
}

#[derive(Serialize, Debug)]
pub struct SignerReport {
    pub signature_algorithm_id: u32,
    /// `None` when the id is not on the allow-list.
    pub signature_algorithm: Option<&'static str>,
    pub apk_digest: String,
    /// `None` when the certificate does not decode.
    pub certificate_subject: Option<String>,
    pub certificate_len: usize,
    pub public_key_len: usize,
    pub additional_data_len: usize,
    pub signature_len: usize,
}

impl From<&SigningInfo> for SignerReport {
    fn from(info: &SigningInfo) -> Self {
        Self {
            signature_algorithm_id: info.signature_algorithm_id,
            signature_algorithm: SignatureAlgorithm::try_from(info.signature_algorithm_id)
                .ok()
                .map(SignatureAlgorithm::name),
            apk_digest: hex::encode(&info.apk_digest),
            certificate_subject: VerbatimCertificate::from_der(&info.certificate)
                .ok()
                .map(|c| c.subject()),
            certificate_len: info.certificate.len(),
            public_key_len: info.public_key.len(),
            additional_data_len: info.additional_data.len(),
            signature_len: info.signature.len(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct BlockReport {
    pub block_id: u32,
    pub len: usize,
}

#[derive(Serialize, Debug)]
pub struct InspectReport {
    pub version: u32,
    pub hashing_info: HashingReport,
    pub default_signer: SignerReport,
    pub blocks: Vec<BlockReport>,
}

impl InspectReport {
    fn from_envelope(envelope: &SignatureEnvelope) -> Result<Self> {
        let hashing_info = envelope
            .decode_hashing_info()
            .map_err(idsig_verify::V4Error::from)?;
        let infos = envelope
            .decode_signing_infos()
            .map_err(idsig_verify::V4Error::from)?;
        let default_signer = infos
            .decode_default()
            .map_err(idsig_verify::V4Error::from)?;

        Ok(Self {
            version: envelope.version,
            hashing_info: HashingReport {
                hash_algorithm: hashing_info.hash_algorithm,
                log2_block_size: hashing_info.log2_block_size,
                salt: hex::encode(&hashing_info.salt),
                root_hash: hex::encode(&hashing_info.root_hash),
            },
            default_signer: (&default_signer).into(),
            blocks: infos
                .signing_info_blocks
                .iter()
                .map(|b| BlockReport {
                    block_id: b.block_id,
                    len: b.signing_info.len(),
                })
                .collect(),
        })
    }

    fn render_text(&self) -> String {
        let h = &self.hashing_info;
        let s = &self.default_signer;
        let mut out = format!(
            "version: {}\nhashing info:\n  algorithm: {}\n  log2 block size: {}\n  salt: {}\n  root hash: {}\n",
            self.version, h.hash_algorithm, h.log2_block_size, h.salt, h.root_hash
        );
        out.push_str(&format!(
            "default signer:\n  algorithm: {:#06x} ({})\n  apk digest: {}\n  certificate: {} ({} bytes)\n  public key: {} bytes\n  additional data: {} bytes\n  signature: {} bytes\n",
            s.signature_algorithm_id,
            s.signature_algorithm.unwrap_or("unsupported"),
            s.apk_digest,
            s.certificate_subject.as_deref().unwrap_or("<undecodable>"),
            s.certificate_len,
            s.public_key_len,
            s.additional_data_len,
            s.signature_len,
        ));
        if self.blocks.is_empty() {
            out.push_str("signer blocks: none\n");
        } else {
            out.push_str("signer blocks:\n");
            for block in &self.blocks {
                out.push_str(&format!("  {:#010x} ({} bytes)\n", block.block_id, block.len));
            }
        }
        out
    }
}

pub fn cmd_inspect(args: &InspectArgs) -> i32 {
    match run_inspect(args) {
        Ok(()) => exit_codes::SUCCESS,
        Err(e) => {
            eprintln!("error: {e:#}");
            exit_codes::for_anyhow(&e)
        }
    }
}

fn run_inspect(args: &InspectArgs) -> Result<()> {
    let bytes = fs::read(&args.signature)
        .with_context(|| format!("failed to read signature: {}", args.signature.display()))?;
    let envelope = decode_envelope(&bytes, &VerifierConfig::from_env())
        .with_context(|| format!("failed to decode {}", args.signature.display()))?;
    let report = InspectReport::from_envelope(&envelope)
        .with_context(|| format!("failed to decode {}", args.signature.display()))?;

    match args.format {
        OutputFormat::Text => print!("{}", report.render_text()),
        OutputFormat::Json => println!(
            "{}",
            serde_json::to_string_pretty(&report).context("failed to encode report")?
        ),
    }
    Ok(())
}
