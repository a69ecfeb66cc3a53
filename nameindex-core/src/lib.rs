//! Core types and error handling for nameindex
//!
//! This crate contains the fundamental types shared between the ordered-name
//! index and its collaborators. It provides:
//!
//! - Common error types with [`Error`] and [`Result`]
//! - The [`Name`] and [`NodeId`] types the index is built from
//!
//! # Example
//!
//! ```
//! use nameindex_core::Name;
//!
//! let name = Name::new(b"user:123".to_vec()).unwrap();
//! assert_eq!(name.as_bytes(), b"user:123");
//! ```

pub mod error;
pub mod types;

pub use error::{Error, Result};
pub use types::*;
