//! Client-side access to a marena arena.
//!
//! This crate provides typed handles over the five arena operations. A
//! handle owns one reference to its block and keeps the count in step with
//! Rust ownership: cloning adds a reference, dropping releases one.
//!
//! # Features
//!
//! - [`ArenaClient`]: the transport seam, implemented for the in-process `MemoryService`
//! - [`Primitive`]: maps `i16`, `i32`, `i64`, `f32`, `f64`, `bool` and `char` onto arena types
//! - [`RemotePtr`]: the reference-counted handle
//!
//! # Example
//!
//! ```
//! use marena_client::RemotePtr;
//! use marena_core::{ArenaConfig, MemoryService};
//! use std::sync::Arc;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let service = Arc::new(MemoryService::new(&ArenaConfig::for_testing(1024))?);
//!
//! let mut a = RemotePtr::<f64, _>::with_value(Arc::clone(&service), &1.5)?;
//! let b = RemotePtr::<f64, _>::with_value(Arc::clone(&service), &2.5)?;
//!
//! // `a`'s old block loses its last reference and is collected.
//! a.assign(&b)?;
//! assert_eq!(a.get()?, 2.5);
//! # Ok(())
//! # }
//! # example().unwrap();
//! ```
//!
//! # Error Handling
//!
//! All operations return `Result<T, ClientError>`:
//!
//! ```
//! # use marena_client::{ClientError, RemotePtr};
//! # use marena_core::{ArenaConfig, MemoryService};
//! # use std::sync::Arc;
//! # let service = Arc::new(MemoryService::new(&ArenaConfig::for_testing(8)).unwrap());
//! let ptr = RemotePtr::<char, _>::new(service).unwrap();
//! match ptr.set(&'€') {
//!     Err(ClientError::Rejected { operation, .. }) => assert_eq!(operation, "Set"),
//!     other => panic!("unexpected: {other:?}"),
//! }
//! ```

mod client;
mod error;
mod handle;

// Re-export the main types
pub use client::ArenaClient;
pub use error::{ClientError, Result};
pub use handle::{Primitive, RemotePtr};
