// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
//! Thin binary exposing exactly the `safe-run`/`compare` entry points the
//! core contracts with a CLI collaborator.
//!
//! Everything else a production release of this tool would need —
//! `ticket-pack`, `library`, `adapter doctor`, Windows launchers, release
//! tooling — is a separate collaborator this binary does not implement; it
//! exists only to give the core a runnable, testable surface.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use weftend_canon::{canonicalize, Digest};
use weftend_examiner::{capture, decide, detect, mint, probe, Limits, Policy, Profile};
use weftend_receipt::{assemble, check_no_orphans, lint, write_finalized, LintVerdict, ReceiptEntry};

/// Precondition failure: a missing fixture, a disabled adapter, a required
/// disclosure that could not be produced, or a failed privacy lint.
const EXIT_PRECONDITION: u8 = 40;
/// Internal/unexpected error.
const EXIT_INTERNAL: u8 = 1;
/// Success, including a run that concludes WITHHELD.
const EXIT_OK: u8 = 0;

#[derive(Parser, Debug)]
#[command(name = "weftend", version, about = "Deterministic artifact-intake and evidence tool")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Run capture -> detect -> probe -> mint -> decide over one artifact
    /// and assemble its operator receipt.
    SafeRun {
        /// Path to the artifact: a file, a directory, or a `.zip` archive.
        input: PathBuf,

        /// Output directory. Created if missing; pre-existing contents are
        /// surfaced as a warning, not a failure.
        #[arg(long)]
        out: PathBuf,

        /// Profile to evaluate under: `web`, `mod`, or `generic`.
        #[arg(long, default_value = "web")]
        profile: String,

        /// Policy file (TOML or JSON). Defaults to the profile's built-in
        /// default policy.
        #[arg(long)]
        policy: Option<PathBuf>,

        /// Limits file (TOML or JSON). Defaults to built-in limits.
        #[arg(long)]
        limits: Option<PathBuf>,

        /// Interaction script source to probe, in addition to the
        /// load-only probe.
        #[arg(long)]
        script: Option<PathBuf>,

        /// Analysis-only. This binary never attempts native execution
        /// regardless of this flag's value; it is accepted for interface
        /// compatibility and always effectively true.
        #[arg(long)]
        withhold_exec: bool,
    },

    /// Compare two prior `safe-run` output roots across the seven
    /// comparison buckets.
    Compare {
        /// The baseline output root.
        root_a: PathBuf,
        /// The candidate output root.
        root_b: PathBuf,
        /// Write the compare report here instead of stdout.
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

fn init_logging() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).with_target(false).init();
}

fn main() -> ExitCode {
    init_logging();
    let cli = Cli::parse();
    let code = match run(cli) {
        Ok(code) => code,
        Err(err) => {
            tracing::error!(error = %err, "run failed");
            EXIT_INTERNAL
        }
    };
    ExitCode::from(code)
}

fn run(cli: Cli) -> Result<u8> {
    match cli.command {
        Commands::SafeRun { input, out, profile, policy, limits, script, withhold_exec: _ } => {
            safe_run(&input, &out, &profile, policy.as_deref(), limits.as_deref(), script.as_deref())
        }
        Commands::Compare { root_a, root_b, out } => compare_cmd(&root_a, &root_b, out.as_deref()),
    }
}

fn profile_for(name: &str) -> Profile {
    match name {
        "mod" => Profile::Mod,
        "web" => Profile::Web,
        _ => Profile::Generic,
    }
}

fn default_policy_for(profile: Profile) -> Policy {
    match profile {
        Profile::Mod => Policy::mod_default(),
        Profile::Web | Profile::Generic => Policy::web_component_default(),
    }
}

/// Write `value` as canonical JSON, newline-terminated, via the staged
/// atomic finalize path, returning the finalized file's `sha256`.
fn write_canonical_json<T: serde::Serialize>(path: &Path, value: &T) -> Result<String> {
    let mut body = canonicalize(value).context("canonicalize output document")?;
    body.push('\n');
    write_finalized(path, body.as_bytes()).context("write output document")?;
    Ok(Digest::sha256_bytes(body.as_bytes()).to_string())
}

fn write_text(path: &Path, text: &str) -> Result<String> {
    write_finalized(path, text.as_bytes()).context("write text document")?;
    Ok(Digest::sha256_bytes(text.as_bytes()).to_string())
}

#[derive(serde::Serialize)]
struct ExaminerSubReceipt<'a> {
    schema: &'a str,
    mint: &'a weftend_examiner::MintPackage,
    decision: &'a weftend_examiner::IntakeDecision,
}

fn safe_run(
    input: &Path,
    out: &Path,
    profile_name: &str,
    policy_path: Option<&Path>,
    limits_path: Option<&Path>,
    script_path: Option<&Path>,
) -> Result<u8> {
    let env = weftend_config::load_env();

    let mut warnings = Vec::new();
    let preexisting = out.exists() && fs::read_dir(out).map(|mut d| d.next().is_some()).unwrap_or(false);
    if preexisting {
        warnings.push("SAFE_RUN_EVIDENCE_PREEXISTING".to_string());
    }
    fs::create_dir_all(out).context("create output root")?;

    let fail_closed_reason = match &env {
        Ok(env) if env.adapter_disabled() => Some("ADAPTER_DISABLED"),
        Err(err) => Some(err.code.as_str()),
        Ok(_) => None,
    };

    if let Some(reason) = fail_closed_reason {
        let receipt = assemble("sha256:0000000000000000000000000000000000000000000000000000000000000000", "safe-run", Vec::new(), {
            let mut w = warnings.clone();
            w.push(reason.to_string());
            w
        });
        write_canonical_json(&out.join("operator_receipt.json"), &receipt)?;
        return Ok(EXIT_PRECONDITION);
    }

    let profile = profile_for(profile_name);
    let limits = match limits_path {
        Some(p) => weftend_config::load_limits(p)?,
        None => Limits::default(),
    };
    let policy = match policy_path {
        Some(p) => weftend_config::load_policy(p)?,
        None => default_policy_for(profile),
    };
    let interaction_source = script_path.map(fs::read_to_string).transpose().context("read interaction script")?;

    let tree = capture(input, &limits);
    let observations = detect(&tree, input, &limits);
    let probes = probe(&observations, input, interaction_source.as_deref(), &limits);
    let policy_digest = policy.policy_id();
    let mint_package = mint(profile, &tree, observations, probes, limits, &policy_digest);
    let (decision, disclosure, _appeal) = decide(&mint_package, &policy);

    let mint_digest = mint_package.digests.mint_digest.clone();
    let mut entries = Vec::new();

    let mint_hash = write_canonical_json(&out.join("mint.json"), &mint_package)?;
    entries.push(ReceiptEntry { kind: "mint".to_string(), rel_path: "mint.json".to_string(), digest: mint_hash });

    let decision_hash = write_canonical_json(&out.join("decision.json"), &decision)?;
    entries.push(ReceiptEntry { kind: "decision".to_string(), rel_path: "decision.json".to_string(), digest: decision_hash });

    let sub_receipt = ExaminerSubReceipt { schema: "weftend.safe_run_receipt/0", mint: &mint_package, decision: &decision };
    let sub_hash = write_canonical_json(&out.join("safe_run_receipt.json"), &sub_receipt)?;
    entries.push(ReceiptEntry { kind: "safe_run_receipt".to_string(), rel_path: "safe_run_receipt.json".to_string(), digest: sub_hash });

    let readme_hash = write_text(&out.join("weftend/README.txt"), &format!("{disclosure}\n"))?;
    entries.push(ReceiptEntry { kind: "readme".to_string(), rel_path: "weftend/README.txt".to_string(), digest: readme_hash });

    let operator_receipt = assemble(&mint_digest, "safe-run", entries, warnings);
    write_canonical_json(&out.join("operator_receipt.json"), &operator_receipt)?;

    let report = lint(out);
    write_canonical_json(&out.join(weftend_receipt::LINT_OUTPUT_PATH), &report)?;

    check_no_orphans(out).context("orphaned stage file after finalize")?;

    if report.verdict == LintVerdict::Fail {
        return Ok(EXIT_PRECONDITION);
    }
    if mint_package.grade.reason_codes.iter().any(|c| c == "CAPTURE_INPUT_MISSING") {
        return Ok(EXIT_PRECONDITION);
    }
    if decision.top_reason_codes.iter().any(|c| c == "DISCLOSURE_REQUIRED") {
        return Ok(EXIT_PRECONDITION);
    }
    Ok(EXIT_OK)
}

fn compare_cmd(root_a: &Path, root_b: &Path, out: Option<&Path>) -> Result<u8> {
    let report = weftend_receipt::compare(root_a, root_b);
    let body = format!("{}\n", canonicalize(&report).context("canonicalize compare report")?);
    match out {
        Some(path) => write_finalized(path, body.as_bytes()).context("write compare report")?,
        None => print!("{body}"),
    }
    Ok(match report.verdict {
        weftend_receipt::CompareVerdict::Blocked => EXIT_PRECONDITION,
        _ => EXIT_OK,
    })
}
