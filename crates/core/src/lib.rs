//! ns-core: Core library for the NetStorage client
//!
//! This crate provides the transport-independent parts of the client:
//! - Request signing (credentials, nonce source, auth headers)
//! - The listing model (request, path and action resolution, result)
//! - Error types
//! - Client configuration
//! - Failure diagnostics
//! - The Lister trait
//!
//! The HTTP transport lives in ns-http.

pub mod config;
pub mod diagnostics;
pub mod error;
pub mod listing;
pub mod signer;
pub mod traits;

pub use config::{ClientConfig, TimeoutConfig};
pub use diagnostics::{FailureSink, NoopSink, RequestFailure};
pub use error::{Error, ErrorKind, Result};
pub use listing::{EntryKind, FileEntry, ListRequest, ListResult};
pub use signer::{AuthHeaders, Credentials, NonceSource, RandomNonce, Signer};
pub use traits::Lister;
