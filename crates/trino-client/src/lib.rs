//! # trino-client
//!
//! High-level async client for Trino (and Presto) coordinators.
//!
//! This is the primary public API surface of the workspace. It submits
//! statements over the Trino REST protocol, follows the result pages and
//! hands rows out one at a time, decoded into typed values.
//!
//! ## Features
//!
//! - **Streaming results**: rows are pulled page by page; only one page is
//!   held in memory at a time
//! - **Nested types**: `array`, `map` and `row` values of any depth decode
//!   into [`SqlValue`] and convert into `Vec`, maps and tuples
//! - **Cancellation**: [`CancelHandle`] and per-query deadlines interrupt
//!   any wait and cancel the query on the coordinator
//! - **Session tracking**: `USE`, `SET SESSION`, `PREPARE` and transactions
//!   are followed through the coordinator's response headers
//! - **Pluggable transport**: any [`Transport`] can carry the requests,
//!   registered by name in a [`TransportRegistry`]
//!
//! ## Query Lifecycle
//!
//! ```text
//! Created -> Queued -> Running -> Finished
//!                           \---> Failed | Canceled
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use std::time::Duration;
//! use trino_client::{Client, Config};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = Config::new()
//!         .server("http://localhost:8080")
//!         .user("analyst")
//!         .catalog("tpch")
//!         .schema("sf1");
//!     let client = Client::new(config)?;
//!
//!     let mut stream = client
//!         .query_with_timeout(
//!             "SELECT name FROM nation WHERE regionkey = ?",
//!             &[&1_i64],
//!             Duration::from_secs(30),
//!         )
//!         .await?;
//!
//!     while let Some(row) = stream.advance().await? {
//!         let name: String = row.get(0)?;
//!         println!("{name}");
//!     }
//!
//!     client.simple_query("USE tpch.sf100").await?;
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod cancel;
pub mod client;
pub mod config;
pub mod error;
mod exchange;
pub mod from_row;
pub mod query;
pub mod row;
pub mod session;
pub mod state;
pub mod stream;

pub use cancel::CancelHandle;
pub use client::Client;
pub use config::{Config, HeaderPolicy, RetryPolicy, TimeoutConfig};
pub use error::{Error, ErrorKind, Result};
pub use from_row::{FromRow, MapRows, RowIteratorExt};
pub use query::Query;
pub use row::{Column, Row};
pub use session::SessionState;
pub use state::QueryState;
pub use stream::{ExecuteResult, QueryStream};
pub use trino_protocol::{QueryError, StatementStats, Warning};
pub use trino_transport::{
    HttpRequest, HttpResponse, Transport, TransportError, TransportRegistry,
};
pub use trino_types::{DecimalMode, FromSql, SqlValue, ToSql, TypeSignature, ZonedDateTime};
