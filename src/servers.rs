//! TCP servers exposing the JSON API

use std::net::SocketAddr;

use futures::Future;
use thiserror::Error;
use tokio::{
    net::{TcpListener, TcpStream},
    task::JoinHandle,
};

use crate::{global::Global, models::ServerConfig};

pub mod json;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
}

/// Running server, stopped when dropped
pub struct ServerHandle {
    local_addr: SocketAddr,
    join_handle: JoinHandle<()>,
}

impl ServerHandle {
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Drop for ServerHandle {
    fn drop(&mut self) {
        self.join_handle.abort();
    }
}

/// Bind a TCP server and spawn a task accepting its clients
///
/// Every client is handled in its own task by `handle_client`. Errors returned by the client
/// handler are logged and only end that client's connection.
pub async fn bind<T, E, F, H>(
    name: &'static str,
    options: T,
    global: Global,
    handle_client: H,
) -> Result<ServerHandle, ServerError>
where
    T: ServerConfig,
    H: Fn((TcpStream, SocketAddr), Global) -> F + Send + Sync + 'static,
    F: Future<Output = Result<(), E>> + Send + 'static,
    E: std::fmt::Display + Send,
{
    let address = SocketAddr::from(([0, 0, 0, 0], options.port()));
    let listener = TcpListener::bind(address).await?;
    let local_addr = listener.local_addr()?;

    info!(name = %name, address = %local_addr, "server listening");

    let join_handle = tokio::spawn(async move {
        loop {
            match listener.accept().await {
                Ok((socket, peer_addr)) => {
                    let client = handle_client((socket, peer_addr), global.clone());

                    tokio::spawn(async move {
                        if let Err(error) = client.await {
                            warn!(name = %name, peer_addr = %peer_addr, error = %error, "client error");
                        }

                        trace!(name = %name, peer_addr = %peer_addr, "client disconnected");
                    });
                }
                Err(error) => {
                    warn!(name = %name, error = %error, "accept failed");
                }
            }
        }
    });

    Ok(ServerHandle {
        local_addr,
        join_handle,
    })
}
