//! `SpywordServer` builder and accept loop.
//!
//! This is the entry point for running a Spyword server. It ties the
//! layers together: transport → protocol → dispatcher → room store and
//! session registry.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use spyword_protocol::{Codec, JsonCodec};
use spyword_room::{Clock, RoomStore, SystemClock};
use spyword_session::SessionRegistry;
use spyword_transport::{Transport, TransportError, WebSocketTransport};

use crate::config::ServerConfig;
use crate::dispatcher::Dispatcher;
use crate::handler::handle_connection;
use crate::SpywordError;

/// Shared state handed to every connection task.
pub(crate) struct ServerState<C: Clock, K: Codec> {
    pub(crate) dispatcher: Dispatcher<C>,
    pub(crate) codec: K,
    pub(crate) idle_timeout: Option<Duration>,
}

/// Builder for configuring and starting a Spyword server.
///
/// # Example
///
/// ```rust,no_run
/// use spyword::prelude::*;
///
/// # async fn start() -> Result<(), SpywordError> {
/// let server = SpywordServer::builder()
///     .bind("127.0.0.1:3000")
///     .build()
///     .await?;
/// server.run().await
/// # }
/// ```
#[derive(Debug, Clone, Default)]
pub struct SpywordServerBuilder {
    config: ServerConfig,
}

impl SpywordServerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces the whole configuration.
    pub fn config(mut self, config: ServerConfig) -> Self {
        self.config = config;
        self
    }

    /// Sets the address to listen on.
    pub fn bind(mut self, addr: &str) -> Self {
        self.config.bind = addr.to_string();
        self
    }

    /// Drops connections that stay silent for `timeout`.
    pub fn idle_timeout(mut self, timeout: Duration) -> Self {
        self.config.idle_timeout_secs = Some(timeout.as_secs().max(1));
        self
    }

    /// Binds the listener and builds the shared state.
    ///
    /// Uses `JsonCodec`, `WebSocketTransport` and the system clock.
    pub async fn build(self) -> Result<SpywordServer<SystemClock, JsonCodec>, SpywordError> {
        let transport = WebSocketTransport::bind(&self.config.bind).await?;

        let store = RoomStore::with_config(self.config.store_config(), SystemClock);
        let dispatcher = Dispatcher::new(
            Arc::new(store),
            Arc::new(SessionRegistry::new()),
            self.config.dispatch_config(),
        );

        let state = Arc::new(ServerState {
            dispatcher,
            codec: JsonCodec,
            idle_timeout: self.config.idle_timeout(),
        });

        Ok(SpywordServer { transport, state })
    }
}

/// A bound Spyword server.
///
/// Call [`run()`](Self::run) to start accepting connections.
pub struct SpywordServer<C: Clock = SystemClock, K: Codec = JsonCodec> {
    transport: WebSocketTransport,
    state: Arc<ServerState<C, K>>,
}

impl SpywordServer {
    pub fn builder() -> SpywordServerBuilder {
        SpywordServerBuilder::new()
    }
}

impl<C: Clock, K: Codec> SpywordServer<C, K> {
    /// The address actually bound.
    pub fn local_addr(&self) -> Result<SocketAddr, SpywordError> {
        Ok(self.transport.local_addr()?)
    }

    /// The dispatcher shared by all connections, e.g. to inspect rooms.
    pub fn dispatcher(&self) -> &Dispatcher<C> {
        &self.state.dispatcher
    }

    /// Runs the accept loop, spawning one task per connection.
    ///
    /// A failed accept (e.g. a botched WebSocket handshake) is logged and
    /// the loop carries on. Returns once the transport is shut down.
    pub async fn run(mut self) -> Result<(), SpywordError> {
        tracing::info!(addr = %self.local_addr()?, "Spyword server running");

        loop {
            match self.transport.accept().await {
                Ok(conn) => {
                    let state = Arc::clone(&self.state);
                    tokio::spawn(async move {
                        if let Err(e) = handle_connection(conn, state).await {
                            tracing::debug!(error = %e, "connection ended with error");
                        }
                    });
                }
                Err(TransportError::Shutdown) => return Ok(()),
                Err(e) => {
                    tracing::warn!(error = %e, "accept failed");
                }
            }
        }
    }
}
