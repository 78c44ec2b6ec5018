//! Atelier Core - Foundational types for the Atelier asset generator
//!
//! This crate provides the types that all other Atelier crates depend on:
//! - `AssetId` - Opaque unique identifiers for generated assets
//! - `ContentHash` - SHA-256 based content hashing
//! - `ServiceErrorKind` - Structured classification of upstream failures
//! - Error types and Result alias

mod error;
mod hash;
mod id;

pub use error::{AtelierError, Result, ServiceErrorKind};
pub use hash::ContentHash;
pub use id::AssetId;
