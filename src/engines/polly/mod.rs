//! Amazon Polly synthesis backend.
//!
//! Requests go through the AWS SDK (`aws-sdk-polly`). The synthesized mp3 is
//! collected in memory and handed to the pool as a byte stream.
//!
//! # Credentials
//!
//! Explicit keys in [`PollyConfig`] are used when present. Otherwise the
//! default AWS chain resolves them: `AWS_ACCESS_KEY_ID` /
//! `AWS_SECRET_ACCESS_KEY` / `AWS_SESSION_TOKEN`, then the selected profile
//! in `~/.aws/config` and `~/.aws/credentials`, then instance roles.
//!
//! # Example
//!
//! ```rust,no_run
//! use say::engines::polly::{PollyBackend, PollyConfig};
//! use say::SynthesisBackend;
//!
//! let backend = PollyBackend::new(PollyConfig {
//!     voice: "Amy".to_string(),
//!     ..Default::default()
//! })?;
//! let audio = backend.synthesize("<speak>Hello, world!</speak>")?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod engine;

pub use engine::{PollyBackend, PollyConfig};
