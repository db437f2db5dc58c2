// Copyright (c) 2026 Robert L. Snyder, Sierra Vista, AZ
// Licensed under the MIT License. See LICENSE file in the project root for details.

//! Beat-synchronised rhythm core.
//!
//! - [`timing`]: drift-free beat clock and the thread that drives it
//! - [`rhythm`]: beat counting, hit judgement, combo and power arc
//! - [`config`]: YAML tuning with hot reload
//! - [`control`]: keyboard bindings

pub mod config;
pub mod control;
pub mod error;
pub mod rhythm;
pub mod timing;

pub use error::{Result, RhythmError};
