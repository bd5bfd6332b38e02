//! # trino-transport
//!
//! Pluggable HTTP transport for the Trino client protocol.
//!
//! The client never talks to an HTTP library directly. It builds
//! [`HttpRequest`] values and hands them to a [`Transport`], which returns a
//! fully-read [`HttpResponse`]. The default [`ReqwestTransport`] uses a pooled
//! `reqwest` client; tests substitute an in-process coordinator.
//!
//! ## Architecture
//!
//! ```text
//! QueryStream → HttpRequest → Arc<dyn Transport> → HttpResponse → QueryResults
//! ```
//!
//! ## Named transports
//!
//! A [`TransportRegistry`] maps names to transports so a configuration can
//! select one by name. All registrations must happen before the first
//! lookup:
//!
//! ```rust
//! use std::sync::Arc;
//! use std::time::Duration;
//! use trino_transport::{ReqwestTransport, TransportRegistry};
//!
//! let registry = TransportRegistry::new();
//! let uncompressed = ReqwestTransport::new(Duration::from_secs(5), Duration::from_secs(60)).unwrap();
//! registry.register("uncompressed", Arc::new(uncompressed)).unwrap();
//! assert!(registry.get("uncompressed").is_ok());
//! assert!(registry.register("late", Arc::new(ReqwestTransport::from_client(Default::default()))).is_err());
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod message;
pub mod registry;
pub mod transport;

pub use error::{RegistryError, TransportError};
pub use message::{Headers, HttpRequest, HttpResponse, Method, reason_phrase};
pub use registry::TransportRegistry;
pub use transport::{ReqwestTransport, Transport};
