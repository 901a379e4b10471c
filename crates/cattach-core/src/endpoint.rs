//! Remote endpoint description and URL construction.
//!
//! A [`ContainerEndpoint`] names the container API host, the container to
//! attach to, and the API version prefix. URL construction lives here,
//! outside the event-loop core: the loop only ever sees the resulting
//! duplex stream and the resize collaborator.

/// Describes the remote container console endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ContainerEndpoint {
    /// Container API host, `host:port`.
    pub host: String,
    /// Container ID or name.
    pub container_id: String,
    /// Remote API version prefix, e.g. `v1.17`.
    pub api_version: String,
}

impl ContainerEndpoint {
    /// Create a new endpoint descriptor.
    pub fn new(
        host: impl Into<String>,
        container_id: impl Into<String>,
        api_version: impl Into<String>,
    ) -> Self {
        Self {
            host: host.into(),
            container_id: container_id.into(),
            api_version: api_version.into(),
        }
    }

    /// Websocket URL of the interactive attach stream.
    ///
    /// Requests a live stream with stdin/stdout/stderr and no log replay.
    pub fn attach_url(&self) -> String {
        format!(
            "ws://{}/{}/containers/{}/attach/ws?logs=0&stream=1&stdin=1&stdout=1&stderr=1",
            self.host, self.api_version, self.container_id
        )
    }

    /// HTTP URL of the out-of-band resize endpoint.
    ///
    /// The resize endpoint is unversioned.
    pub fn resize_url(&self, rows: u16, cols: u16) -> String {
        format!(
            "http://{}/containers/{}/resize?h={}&w={}",
            self.host, self.container_id, rows, cols
        )
    }
}
