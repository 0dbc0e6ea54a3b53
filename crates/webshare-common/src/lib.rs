//! # webshare-common
//!
//! Configuration and error handling shared by the WebShare crates.
//! No signaling logic lives here, only primitives the other crates build on.

pub mod config;
pub mod error;
