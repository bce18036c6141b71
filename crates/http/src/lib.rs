//! ns-http: HTTP transport for the NetStorage client
//!
//! This crate provides the implementation of the Lister trait using
//! reqwest, plus the XML decoder for listing responses. It is the only
//! crate that talks to the network.

pub mod client;
mod dump;
pub mod xml;

pub use ns_core::Lister;

pub use client::{NetStorageClient, NetStorageClientBuilder};
pub use xml::{DecodeError, decode_listing};
