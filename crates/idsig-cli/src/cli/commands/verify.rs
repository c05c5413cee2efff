//! `idsig verify` - Verify the v4 signature of a package.

use std::collections::BTreeMap;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Args;
use serde::Serialize;

use idsig_verify::{
    SchemeV4Verifier, SignerSelector, VerbatimCertificate, VerifiedSigner, VerifierConfig,
};

use crate::cli::args::{parse_block_id, OutputFormat};
use crate::exit_codes;

#[derive(Args, Debug)]
pub struct VerifyArgs {
    /// Package file the signature is bound to
    pub package: PathBuf,

    /// Signature file (default: the sidecar next to the package)
    #[arg(long)]
    pub signature: Option<PathBuf>,

    /// Signer block id, decimal or 0x-prefixed hex (default: the default signer)
    #[arg(long, value_parser = parse_block_id)]
    pub block_id: Option<u32>,

    /// Output format
    #[arg(long, value_enum, default_value_t)]
    pub format: OutputFormat,

    /// Quiet mode - only exit code, no output
    #[arg(long, short)]
    pub quiet: bool,
}

#[derive(Serialize, Debug)]
pub struct CertificateReport {
    pub subject: String,
    pub issuer: String,
    pub serial: String,
    pub sha256: String,
}

impl From<&VerbatimCertificate> for CertificateReport {
    fn from(cert: &VerbatimCertificate) -> Self {
        Self {
            subject: cert.subject(),
            issuer: cert.issuer(),
            serial: cert.serial_hex(),
            sha256: cert.sha256_fingerprint(),
        }
    }
}

#[derive(Serialize, Debug)]
pub struct VerifyReport {
    pub package: String,
    pub signer: String,
    pub certificates: Vec<CertificateReport>,
    pub apk_digest: String,
    pub content_digests: BTreeMap<u32, String>,
}

impl VerifyReport {
    fn new(package: &Path, selector: SignerSelector, verified: &VerifiedSigner) -> Self {
        let signer = match selector {
            SignerSelector::Default => "default".to_string(),
            SignerSelector::BlockId(id) => format!("{id:#010x}"),
        };
        Self {
            package: package.display().to_string(),
            signer,
            certificates: verified.certificates.iter().map(Into::into).collect(),
            apk_digest: hex::encode(&verified.apk_digest),
            content_digests: verified
                .content_digests
                .iter()
                .map(|(id, digest)| (*id, hex::encode(digest)))
                .collect(),
        }
    }

    fn render_text(&self) -> String {
        let mut out = format!("verified: {} (signer: {})\n", self.package, self.signer);
        for (i, cert) in self.certificates.iter().enumerate() {
            out.push_str(&format!(
                "certificate[{i}]:\n  subject: {}\n  issuer:  {}\n  serial:  {}\n  sha256:  {}\n",
                cert.subject, cert.issuer, cert.serial, cert.sha256
            ));
        }
        out.push_str(&format!("apk digest: {}\n", self.apk_digest));
        for (id, digest) in &self.content_digests {
            out.push_str(&format!("content digest [{id}]: {digest}\n"));
        }
        out
    }
}

pub fn cmd_verify(args: &VerifyArgs) -> i32 {
    match run_verify(args) {
        Ok(report) => {
            if args.quiet {
                return exit_codes::SUCCESS;
            }
            match args.format {
                OutputFormat::Text => print!("{}", report.render_text()),
                OutputFormat::Json => match serde_json::to_string_pretty(&report) {
                    Ok(json) => println!("{json}"),
                    Err(e) => {
                        eprintln!("error: failed to encode report: {e}");
                        return exit_codes::INTERNAL_ERROR;
                    }
                },
            }
            exit_codes::SUCCESS
        }
        Err(e) => {
            if !args.quiet {
                eprintln!("error: {e:#}");
            }
            exit_codes::for_anyhow(&e)
        }
    }
}

fn run_verify(args: &VerifyArgs) -> Result<VerifyReport> {
    fs::metadata(&args.package)
        .with_context(|| format!("failed to read package: {}", args.package.display()))?;

    let config = VerifierConfig::from_env();
    let selector = args
        .block_id
        .map_or(SignerSelector::Default, SignerSelector::from_raw);

    let verified = match &args.signature {
        Some(path) => {
            let path = path.clone();
            let source = move |_: &Path| -> io::Result<Option<Vec<u8>>> {
                match fs::read(&path) {
                    Ok(bytes) => Ok(Some(bytes)),
                    Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
                    Err(e) => Err(e),
                }
            };
            SchemeV4Verifier::new(source, config).verify(&args.package, selector)
        }
        None => SchemeV4Verifier::sidecar(config).verify(&args.package, selector),
    }
    .with_context(|| format!("failed to verify {}", args.package.display()))?;

    tracing::debug!(
        package = %args.package.display(),
        certificates = verified.certificates.len(),
        "package verified"
    );
    Ok(VerifyReport::new(&args.package, selector, &verified))
}
