//! Core of the NDO policy modules: a typed view on policy documents, lookup of
//! objects inside a template collection, and the planner that turns a sparse
//! desired state into a JSON Patch.
//!
//! Nothing in here performs I/O. The transport, the template fetch and the
//! lifecycle selection live in `ndo-policy`.
//!
//! ## JSON Patch
//!
//! Plans are expressed as RFC 6902 documents using the `json-patch` crate, so
//! that the operations we report are exactly the operations we send.

pub mod desired;
pub mod document;
pub mod error;
pub mod locate;
pub mod patch;
pub mod schema;

pub use error::{Error, Result};
