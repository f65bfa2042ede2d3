// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The bounded capture -> detect -> probe -> mint -> decide examiner
//! pipeline.
//!
//! Every stage is a pure function over its predecessor's output plus a
//! [`limits::Limits`]/[`policy::Policy`] budget: nothing here reads the
//! clock, touches the network, or retries. An artifact that cannot be
//! fully examined within its budget is truncated and marked, never
//! silently dropped and never allowed to block forever.

pub mod capture;
pub mod decide;
pub mod detect;
pub mod limits;
pub mod mint;
pub mod policy;
pub mod probe;
pub mod reason;
pub mod script;

pub use capture::{capture, CaptureEntry, CaptureTotals, CaptureTree, InputKind};
pub use decide::{decide, Appeal, CapKindSummary, CapSummary, IntakeDecision};
pub use detect::{detect, FileKind, Observations};
pub use limits::Limits;
pub use mint::{mint, Grade, GradeStatus, MintCapture, MintDigests, MintInput, MintPackage, Profile};
pub use policy::{Action, Bounds, CapsPolicy, DisclosurePolicy, Policy, Severity};
pub use probe::{probe, ExecutionProbes, ProbeResult, ProbeStatus};
pub use script::Script;
