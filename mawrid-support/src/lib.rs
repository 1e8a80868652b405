//! # Mawrid Support
//!
//! Shared helpers for the Mawrid DI runtime.
//!
//! This crate provides text rendering used by diagnostics: short type
//! names for identities and arrow-joined chains for cycle reports.

pub mod rendering;
