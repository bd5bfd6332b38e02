//! # trino-testing
//!
//! Test infrastructure for Trino client development.
//!
//! This crate provides utilities for testing against a Trino coordinator,
//! either a real one started with testcontainers or an in-process mock.
//!
//! ## Features
//!
//! - Trino container management via testcontainers
//! - Mock coordinator implementing the client transport (no Docker or
//!   sockets required)
//! - Request recording for protocol assertions
//! - Canned statements mirroring the `tpch` and `system` catalogs
//!
//! ## Mock Coordinator Example
//!
//! ```rust,ignore
//! use std::sync::Arc;
//! use trino_client::{Client, Config};
//! use trino_testing::{MockCoordinator, fixtures};
//!
//! #[tokio::test]
//! async fn test_with_mock_coordinator() {
//!     let coordinator = MockCoordinator::builder()
//!         .with_query(fixtures::NODES_SQL, fixtures::nodes())
//!         .build();
//!     let config = Config::new().server(coordinator.base_url()).user("test");
//!     let client = Client::with_transport(config, Arc::new(coordinator)).unwrap();
//!     let rows = client.query(fixtures::NODES_SQL, &[]).await.unwrap().collect_all().await.unwrap();
//!     assert_eq!(rows.len(), 1);
//! }
//! ```
//!
//! ## Container Example
//!
//! ```rust,ignore
//! use testcontainers::runners::AsyncRunner;
//! use trino_testing::TrinoContainer;
//!
//! #[tokio::test]
//! async fn test_with_real_server() {
//!     let container = TrinoContainer::default().start().await.unwrap();
//!     let port = container.get_host_port_ipv4(8080).await.unwrap();
//!     let url = TrinoContainer::server_url("localhost", port);
//!     // Point a client at url...
//! }
//! ```

#![warn(missing_docs)]
#![deny(unsafe_code)]

pub mod container;
pub mod fixtures;
pub mod mock_coordinator;

pub use container::TrinoContainer;
pub use mock_coordinator::{
    MockCoordinator, MockCoordinatorBuilder, MockCoordinatorConfig, MockQuery, MockResponse,
};
