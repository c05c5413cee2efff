//! Integration tests for `idsig verify` and `idsig inspect`.

use std::path::{Path, PathBuf};

use assert_cmd::Command;
use idsig_verify::testing::{certificate_for, EnvelopeBuilder, TestKey};
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

const PACKAGE: &[u8] = b"PK\x03\x04 not really a zip, but the size is what counts";

fn idsig_cmd() -> Command {
    let mut cmd = Command::new(env!("CARGO_BIN_EXE_idsig"));
    cmd.env_remove("IDSIG_MAX_SIGNATURE_SIZE")
        .env_remove("IDSIG_SIDECAR_EXTENSION")
        .env_remove("RUST_LOG");
    cmd
}

/// Write the package and return its path.
fn write_package(dir: &Path) -> PathBuf {
    let apk = dir.join("base.apk");
    std::fs::write(&apk, PACKAGE).unwrap();
    apk
}

fn signed(builder: &EnvelopeBuilder) -> Vec<u8> {
    builder.build()
}

#[test]
fn test_verify_sidecar_text() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p256();
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64).apk_digest(&[0x0f; 4]);
    std::fs::write(tmp.path().join("base.apk.idsig"), signed(&builder)).unwrap();

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("signer: default"))
        .stdout(predicate::str::contains("subject: CN=idsig test signer"))
        .stdout(predicate::str::contains("apk digest: 0f0f0f0f"));
}

#[test]
fn test_verify_explicit_signature_json() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p384();
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64).root_hash(&[0x77; 32]);
    let sig = tmp.path().join("detached.sig");
    std::fs::write(&sig, signed(&builder)).unwrap();

    let output = idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .arg("--signature")
        .arg(&sig)
        .args(["--format", "json"])
        .output()
        .expect("failed to run idsig verify");
    assert!(output.status.success());

    let json: Value = serde_json::from_slice(&output.stdout).expect("invalid json");
    assert_eq!(json["signer"], "default");
    assert_eq!(json["content_digests"]["3"], hex::encode([0x77; 32]));
    assert_eq!(json["certificates"].as_array().map(Vec::len), Some(1));
    assert_eq!(
        json["certificates"][0]["sha256"].as_str().map(str::len),
        Some(64)
    );
}

#[test]
fn test_verify_block_id_selects_signer() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p256();
    let block_key = TestKey::p256();
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64)
        .block(0x1b93_ad61, &block_key, &[0xbb; 2]);
    std::fs::write(tmp.path().join("base.apk.idsig"), signed(&builder)).unwrap();

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .args(["--block-id", "0x1b93ad61"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("signer: 0x1b93ad61"))
        .stdout(predicate::str::contains("apk digest: bbbb"));

    // The v3 block id resolves to the default signer.
    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .args(["--block-id", "4031998144"])
        .assert()
        .code(0)
        .stdout(predicate::str::contains("signer: default"));

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .args(["--block-id", "7"])
        .assert()
        .code(2)
        .stderr(predicate::str::contains("no v4 signer block"));
}

#[test]
fn test_verify_missing_signature_exit_2() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .assert()
        .code(2)
        .stderr(predicate::str::contains("v4 signature not found"));
}

#[test]
fn test_verify_tampered_exit_4() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p256();
    // Signed for a different file size.
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64 + 1);
    std::fs::write(tmp.path().join("base.apk.idsig"), signed(&builder)).unwrap();

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("did not verify"));
}

#[test]
fn test_verify_key_mismatch_exit_4() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p256();
    let other = TestKey::p256();
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64)
        .certificate(certificate_for(&other, "CN=other"));
    std::fs::write(tmp.path().join("base.apk.idsig"), signed(&builder)).unwrap();

    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .arg("--quiet")
        .assert()
        .code(4)
        .stdout(predicate::str::is_empty())
        .stderr(predicate::str::is_empty());

    // RUST_LOG does not override --quiet.
    idsig_cmd()
        .env("RUST_LOG", "debug")
        .arg("verify")
        .arg(&apk)
        .arg("--quiet")
        .assert()
        .code(4)
        .stderr(predicate::str::is_empty());

    // Without --quiet the rejection is reported.
    idsig_cmd()
        .arg("verify")
        .arg(&apk)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("public key mismatch"));
}

#[test]
fn test_verify_missing_package_exit_1() {
    let tmp = TempDir::new().unwrap();
    idsig_cmd()
        .arg("verify")
        .arg(tmp.path().join("absent.apk"))
        .assert()
        .code(1)
        .stderr(predicate::str::contains("failed to read package"));
}

#[test]
fn test_verify_sidecar_extension_env() {
    let tmp = TempDir::new().unwrap();
    let apk = write_package(tmp.path());
    let key = TestKey::p256();
    let builder = EnvelopeBuilder::new(&key, PACKAGE.len() as u64);
    std::fs::write(tmp.path().join("base.apk.v4"), signed(&builder)).unwrap();

    idsig_cmd()
        .env("IDSIG_SIDECAR_EXTENSION", "v4")
        .arg("verify")
        .arg(&apk)
        .assert()
        .code(0);
}

#[test]
fn test_inspect_text_and_json() {
    let tmp = TempDir::new().unwrap();
    let key = TestKey::p256();
    let builder = EnvelopeBuilder::new(&key, 100)
        .block(3, &key, b"x")
        .trailing(&[0u8; 64]);
    let sig = tmp.path().join("base.apk.idsig");
    std::fs::write(&sig, signed(&builder)).unwrap();

    idsig_cmd()
        .arg("inspect")
        .arg(&sig)
        .assert()
        .code(0)
        .stdout(predicate::str::contains("version: 2"))
        .stdout(predicate::str::contains("0x00000003"));

    let output = idsig_cmd()
        .arg("inspect")
        .arg(&sig)
        .args(["--format", "json"])
        .output()
        .expect("failed to run idsig inspect");
    assert!(output.status.success());
    let json: Value = serde_json::from_slice(&output.stdout).expect("invalid json");
    assert_eq!(json["version"], 2);
    assert_eq!(json["default_signer"]["signature_algorithm_id"], 0x0201);
    assert_eq!(json["blocks"][0]["block_id"], 3);
}

#[test]
fn test_inspect_unsupported_version_exit_4() {
    let tmp = TempDir::new().unwrap();
    let sig = tmp.path().join("old.idsig");
    std::fs::write(&sig, [1u8, 0, 0, 0, 0xff, 0xff]).unwrap();

    idsig_cmd()
        .arg("inspect")
        .arg(&sig)
        .assert()
        .code(4)
        .stderr(predicate::str::contains("version 1 is not supported"));
}
