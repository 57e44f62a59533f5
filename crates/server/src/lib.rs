//! Transports over a shared engine handle
//!
//! Two concurrent front ends serve the same [`engine::SemanticEngine`]:
//! the line-delimited JSON-RPC tool transport (MCP) on stdio and the
//! length-delimited bincode RPC on TCP. The only transport-specific
//! logic is framing, auth, error mapping, and serialization.

#![deny(unsafe_code)]
#![warn(missing_docs, rust_2018_idioms)]

pub mod mcp;
pub mod rpc;
pub mod wire;
