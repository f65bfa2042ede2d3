// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! Operator receipt assembly, privacy lint, compare, and staged atomic
//! finalize.
//!
//! Everything here writes or reads the output root; nothing here touches
//! the examiner pipeline's pure core directly except to read its already
//! produced `MintPackage`/`IntakeDecision` values back off disk for
//! [`compare`].

mod assemble;
mod compare;
mod privacy;
mod stage;

pub use assemble::{assemble, OperatorReceipt, ReceiptEntry};
pub use compare::{compare, compare_runs, Bucket, BucketResult, BucketVerdict, CompareReport, CompareVerdict};
pub use privacy::{lint, LintVerdict, PrivacyLintReport, PrivacyViolation, LINT_OUTPUT_PATH};
pub use stage::{check_no_orphans, find_orphans, finalize, write_finalized, write_staged};
