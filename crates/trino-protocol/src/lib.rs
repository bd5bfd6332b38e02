//! # trino-protocol
//!
//! Pure model of the Trino client REST protocol.
//!
//! A query is submitted with `POST /v1/statement`; every response is a
//! [`QueryResults`] page. The client follows each page's `nextUri` with a
//! `GET` until a page arrives without one, and cancels by sending `DELETE`
//! to the current `nextUri`.
//!
//! ## Design Philosophy
//!
//! This crate is intentionally IO-agnostic. It contains no networking logic and
//! makes no assumptions about the async runtime. Higher-level crates build upon
//! this foundation to provide async I/O capabilities.
//!
//! ## Example
//!
//! ```rust
//! use trino_protocol::{EngineState, QueryResults};
//!
//! let body = br#"{"id": "q1", "stats": {"state": "FINISHED"}}"#;
//! let page = QueryResults::from_slice(body).unwrap();
//! assert!(page.is_terminal());
//! assert_eq!(page.engine_state(), Some(EngineState::Finished));
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod error;
pub mod headers;
pub mod results;
pub mod state;

pub use error::ProtocolError;
pub use results::{
    Column, ErrorLocation, FailureInfo, QueryError, QueryResults, StatementStats, Warning,
    WarningCode,
};
pub use state::{EngineState, Phase};
