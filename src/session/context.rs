//! Listener context
//!
//! Who the listener is and what it asked for. Built by the HTTP layer from
//! the request before the session is opened.

use std::net::SocketAddr;

/// Information about a connected listener
#[derive(Debug, Clone, Default)]
pub struct ListenerContext {
    /// Unique listener ID
    pub listener_id: u64,

    /// Remote peer address
    pub peer_addr: Option<SocketAddr>,

    /// Client user agent
    pub user_agent: Option<String>,

    /// Client asked for in-band ICY metadata
    pub icy_metadata: bool,
}

impl ListenerContext {
    /// Create a new context
    pub fn new(listener_id: u64) -> Self {
        Self {
            listener_id,
            ..Default::default()
        }
    }

    /// Set the peer address
    pub fn with_peer(mut self, addr: SocketAddr) -> Self {
        self.peer_addr = Some(addr);
        self
    }

    /// Set the user agent
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = Some(user_agent.into());
        self
    }

    /// Set whether the client understands ICY metadata
    pub fn with_icy_metadata(mut self, enabled: bool) -> Self {
        self.icy_metadata = enabled;
        self
    }

    /// Fill in capabilities from request headers
    ///
    /// Header names are matched case-insensitively. `Icy-MetaData: 1` enables
    /// metadata.
    pub fn with_request_headers<'a>(
        mut self,
        headers: impl IntoIterator<Item = (&'a str, &'a str)>,
    ) -> Self {
        for (name, value) in headers {
            if name.eq_ignore_ascii_case("icy-metadata") {
                self.icy_metadata = value.trim() == "1";
            } else if name.eq_ignore_ascii_case("user-agent") {
                self.user_agent = Some(value.trim().to_string());
            }
        }
        self
    }

    /// Label used for the buffer cursor owner
    pub fn label(&self) -> String {
        match self.peer_addr {
            Some(addr) => format!("{}#{}", addr, self.listener_id),
            None => format!("listener#{}", self.listener_id),
        }
    }
}
