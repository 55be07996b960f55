//! KairosMix Tools module
//!
//! MCP tool implementations for the mix designer.

pub mod catalog;
pub mod mixes;
pub mod nutrition;
pub mod orders;
pub mod status;
