//! KairosMix Library
//!
//! Nutrition and pricing engine for custom nut and dried-fruit mixes.

pub mod build_info;
pub mod config;
pub mod db;
pub mod mcp;
pub mod models;
pub mod nutrition;
pub mod tools;
