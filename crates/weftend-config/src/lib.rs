// SPDX-License-Identifier: MIT OR Apache-2.0
#![deny(unsafe_code)]
#![warn(missing_docs)]
//! The `WEFTEND_*` environment variable contract and `Limits`/`Policy` file
//! loading, validated at the schema boundary before any field is read.

mod env;
mod load;

pub use env::{load_env, load_env_from, EnvConfig};
pub use load::{load_limits, load_policy};
