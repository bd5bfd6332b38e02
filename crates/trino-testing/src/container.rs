//! Trino container support via testcontainers.

use testcontainers::Image;
use testcontainers::core::{ContainerPort, WaitFor};

/// HTTP port the coordinator listens on inside the container.
pub const HTTP_PORT: u16 = 8080;

/// Trino coordinator container image.
///
/// Uses the official `trinodb/trino` image, which ships the `tpch` and
/// `system` catalogs.
#[derive(Debug, Clone)]
pub struct TrinoContainer {
    /// Container tag (version).
    pub tag: String,
}

impl Default for TrinoContainer {
    fn default() -> Self {
        Self {
            tag: "latest".to_string(),
        }
    }
}

impl TrinoContainer {
    /// Create a new Trino container configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the container tag (Trino version).
    #[must_use]
    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tag = tag.into();
        self
    }

    /// Server URL for a mapped host port.
    #[must_use]
    pub fn server_url(host: &str, port: u16) -> String {
        format!("http://{host}:{port}")
    }
}

impl Image for TrinoContainer {
    fn name(&self) -> &str {
        "trinodb/trino"
    }

    fn tag(&self) -> &str {
        &self.tag
    }

    fn ready_conditions(&self) -> Vec<WaitFor> {
        vec![WaitFor::message_on_stdout("======== SERVER STARTED ========")]
    }

    fn expose_ports(&self) -> &[ContainerPort] {
        &[ContainerPort::Tcp(HTTP_PORT)]
    }
}
