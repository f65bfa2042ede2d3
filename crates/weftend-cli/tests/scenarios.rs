// SPDX-License-Identifier: MIT OR Apache-2.0
//! The six end-to-end scenarios driving the `weftend` binary over fixture
//! directories and zips.

use std::fs;
use std::path::Path;

use assert_cmd::Command;
use serde_json::Value;

fn weftend() -> Command {
    let mut cmd = Command::cargo_bin("weftend").expect("binary `weftend` should be built");
    cmd.env("WEFTEND_RELEASE_DIR", "/tmp/weftend-release")
        .env("WEFTEND_LIBRARY_ROOT", "/tmp/weftend-library")
        .env_remove("WEFTEND_ADAPTER_DISABLE")
        .env_remove("WEFTEND_ADAPTER_DISABLE_FILE");
    cmd
}

fn read_json(path: &Path) -> Value {
    let text = fs::read_to_string(path).unwrap_or_else(|e| panic!("reading {}: {e}", path.display()));
    serde_json::from_str(&text).unwrap_or_else(|e| panic!("parsing {}: {e}", path.display()))
}

/// Scenario 1: safe no-caps.
#[test]
fn safe_no_caps_approves() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join("index.html"), b"<html><body>hi</body></html>").unwrap();
    fs::write(input.path().join("app.css"), b"body { color: black; }").unwrap();
    let out = tempfile::tempdir().unwrap();

    weftend()
        .args(["safe-run", input.path().to_str().unwrap(), "--out", out.path().to_str().unwrap(), "--profile", "web"])
        .assert()
        .success();

    let decision = read_json(&out.path().join("decision.json"));
    assert_eq!(decision["grade"], "OK");
    assert_eq!(decision["action"], "APPROVE");
    assert_eq!(decision["top_reason_codes"], serde_json::json!([]));

    let operator_receipt = read_json(&out.path().join("operator_receipt.json"));
    assert_eq!(operator_receipt["warnings"], serde_json::json!([]));

    let readme = fs::read_to_string(out.path().join("weftend/README.txt")).unwrap();
    assert!(readme.contains("DISCLOSURE_NOT_REQUIRED"));
}

/// Scenario 2: net attempt under the web profile warns and queues.
#[test]
fn net_attempt_web_profile_warns() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join("index.html"), br#"<html><script>fetch("https://x/")</script></html>"#).unwrap();
    let out = tempfile::tempdir().unwrap();

    weftend()
        .args(["safe-run", input.path().to_str().unwrap(), "--out", out.path().to_str().unwrap(), "--profile", "web"])
        .assert()
        .success();

    let decision = read_json(&out.path().join("decision.json"));
    assert_eq!(decision["grade"], "WARN");
    assert_eq!(decision["action"], "QUEUE");
    let top: Vec<String> = serde_json::from_value(decision["top_reason_codes"].clone()).unwrap();
    assert!(top.contains(&"CAP_DENY_NET".to_string()));

    let mint = read_json(&out.path().join("mint.json"));
    let denied = mint["execution_probes"]["load_only"]["denied_caps"]["net.fetch"].as_u64().unwrap_or(0);
    assert!(denied >= 1);
}

/// Scenario 3: the same input rejected outright under the mod profile.
#[test]
fn net_attempt_mod_profile_denies() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join("index.html"), br#"<html><script>fetch("https://x/")</script></html>"#).unwrap();
    let out = tempfile::tempdir().unwrap();

    weftend()
        .args(["safe-run", input.path().to_str().unwrap(), "--out", out.path().to_str().unwrap(), "--profile", "mod"])
        .assert()
        .success();

    let decision = read_json(&out.path().join("decision.json"));
    assert_eq!(decision["grade"], "DENY");
    assert_eq!(decision["action"], "REJECT");
}

fn le16(n: u16) -> [u8; 2] {
    n.to_le_bytes()
}
fn le32(n: u32) -> [u8; 4] {
    n.to_le_bytes()
}

/// Build a minimal well-formed single-entry stored ZIP.
fn write_minimal_zip(path: &Path, name: &str, content: &[u8]) {
    let crc = crc32(content);
    let mut local = Vec::new();
    local.extend_from_slice(&le32(0x0403_4b50));
    local.extend_from_slice(&le16(20));
    local.extend_from_slice(&le16(0));
    local.extend_from_slice(&le16(0));
    local.extend_from_slice(&le16(0));
    local.extend_from_slice(&le16(0));
    local.extend_from_slice(&le32(crc));
    local.extend_from_slice(&le32(content.len() as u32));
    local.extend_from_slice(&le32(content.len() as u32));
    local.extend_from_slice(&le16(name.len() as u16));
    local.extend_from_slice(&le16(0));
    local.extend_from_slice(name.as_bytes());
    local.extend_from_slice(content);

    let mut central = Vec::new();
    central.extend_from_slice(&le32(0x0201_4b50));
    central.extend_from_slice(&le16(20));
    central.extend_from_slice(&le16(20));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le32(crc));
    central.extend_from_slice(&le32(content.len() as u32));
    central.extend_from_slice(&le32(content.len() as u32));
    central.extend_from_slice(&le16(name.len() as u16));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le16(0));
    central.extend_from_slice(&le32(0));
    central.extend_from_slice(&le32(0));
    central.extend_from_slice(name.as_bytes());

    let cd_offset = local.len() as u32;
    let mut eocd = Vec::new();
    eocd.extend_from_slice(&le32(0x0605_4b50));
    eocd.extend_from_slice(&le16(0));
    eocd.extend_from_slice(&le16(0));
    eocd.extend_from_slice(&le16(1));
    eocd.extend_from_slice(&le16(1));
    eocd.extend_from_slice(&le32(central.len() as u32));
    eocd.extend_from_slice(&le32(cd_offset));
    eocd.extend_from_slice(&le16(0));

    let mut bytes = local;
    bytes.extend_from_slice(&central);
    bytes.extend_from_slice(&eocd);
    fs::write(path, bytes).unwrap();
}

fn crc32(data: &[u8]) -> u32 {
    let mut crc: u32 = 0xFFFF_FFFF;
    for &byte in data {
        crc ^= u32::from(byte);
        for _ in 0..8 {
            let mask = (crc & 1).wrapping_neg();
            crc = (crc >> 1) ^ (0xEDB8_8320 & mask);
        }
    }
    !crc
}

/// Scenario 4: a zip whose last 22 bytes are zeroed has no locatable EOCD.
#[test]
fn tampered_zip_denies_with_eocd_missing() {
    let input_dir = tempfile::tempdir().unwrap();
    let zip_path = input_dir.path().join("artifact.zip");
    write_minimal_zip(&zip_path, "index.html", b"<html></html>");
    let mut bytes = fs::read(&zip_path).unwrap();
    let len = bytes.len();
    for b in &mut bytes[len - 22..] {
        *b = 0;
    }
    fs::write(&zip_path, &bytes).unwrap();

    let out = tempfile::tempdir().unwrap();
    weftend()
        .args(["safe-run", zip_path.to_str().unwrap(), "--out", out.path().to_str().unwrap(), "--profile", "web"])
        .assert()
        .success();

    let decision = read_json(&out.path().join("decision.json"));
    assert_eq!(decision["grade"], "DENY");
    assert_eq!(decision["action"], "REJECT");
    let top: Vec<String> = serde_json::from_value(decision["top_reason_codes"].clone()).unwrap();
    assert!(top.contains(&"ZIP_EOCD_MISSING".to_string()));

    let mint = read_json(&out.path().join("mint.json"));
    assert_eq!(mint["capture"]["paths"], serde_json::json!([]));
}

/// Scenario 5: two runs over identical input and policy produce a
/// byte-identical operator receipt.
#[test]
fn identical_runs_produce_byte_identical_receipts() {
    let input = tempfile::tempdir().unwrap();
    fs::write(input.path().join("index.html"), b"<html><body>hi</body></html>").unwrap();
    fs::write(input.path().join("app.css"), b"body { color: black; }").unwrap();

    let out_a = tempfile::tempdir().unwrap();
    let out_b = tempfile::tempdir().unwrap();

    for out in [&out_a, &out_b] {
        weftend()
            .args(["safe-run", input.path().to_str().unwrap(), "--out", out.path().to_str().unwrap(), "--profile", "web"])
            .assert()
            .success();
    }

    let a = fs::read(out_a.path().join("operator_receipt.json")).unwrap();
    let b = fs::read(out_b.path().join("operator_receipt.json")).unwrap();
    assert_eq!(a, b);
}

/// Scenario 6: a receipt field carrying a forbidden absolute path fails the
/// privacy lint with a deterministic `sampleHash`, never the raw text.
#[test]
fn privacy_violation_fails_lint_with_deterministic_hash() {
    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("mint.json"), br#"{"note":"C:\\Users\\alice\\secret"}"#).unwrap();

    let report_a = weftend_receipt::lint(dir.path());
    let report_b = weftend_receipt::lint(dir.path());

    assert_eq!(report_a.verdict, weftend_receipt::LintVerdict::Fail);
    assert_eq!(report_a.violations[0].code, "ABS_PATH_WIN");
    assert!(!report_a.violations[0].sample_hash.contains("alice"));
    assert_eq!(report_a.violations[0].sample_hash, report_b.violations[0].sample_hash);
}
