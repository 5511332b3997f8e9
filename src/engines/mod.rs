//! Speech synthesis backends.
//!
//! This module contains implementations of [`crate::SynthesisBackend`].
//!
//! # Available Backends
//!
//! Enable backends via Cargo features:
//! - `polly` - Amazon Polly through the AWS SDK (enabled by default)

#[cfg(feature = "polly")]
pub mod polly;
