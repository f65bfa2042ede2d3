// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The strict sandbox membrane and deny-by-default capability kernel.
//!
//! There is exactly one source of randomness in this crate — and in the
//! entire core — the session nonce generated once per invocation in
//! [`nonce::SessionNonce::generate`]. Everything else here is a pure
//! function of its inputs.

pub mod capability;
pub mod nonce;
pub mod preflight;
pub mod pulse;
pub mod tartarus;

pub use capability::{decide, CapabilityRequest, Decision, ReplayGuard, SECRET_CAPS};
pub use nonce::{verify_envelope, Envelope, EnvelopeMismatch, SessionNonce};
pub use preflight::{run_preflight, ArtifactStore, PreflightInput, PreflightResult, ReleaseStatus, StampStatus};
pub use pulse::{Pulse, PulseCounts, PulseDigests, PulseEmitter, PulseKind, Subject, SubjectKind};
pub use tartarus::{Remedy, Severity, TartarusLedger, TartarusRecord, ViolationKind};
