//! JSON protocol server implementation

use std::net::SocketAddr;

use futures::prelude::*;
use thiserror::Error;
use tokio::net::TcpStream;
use tokio_util::codec::Framed;

use crate::{
    api::json::{message::LedResponse, ClientConnection, ClientName, JsonApiError},
    global::Global,
};

/// JSON protocol codec definition
mod codec;
use codec::*;

#[derive(Debug, Error)]
pub enum JsonServerError {
    #[error("codec error: {0}")]
    Codec(#[from] JsonCodecError),
}

pub async fn handle_client(
    (socket, peer_addr): (TcpStream, SocketAddr),
    global: Global,
) -> Result<(), JsonServerError> {
    debug!(peer_addr = %peer_addr, "accepted new connection");

    let framed = Framed::new(socket, JsonCodec::new());
    let (mut writer, mut reader) = framed.split();

    let mut client = ClientConnection::new(ClientName::Json { peer_addr });

    while let Some(frame) = reader.next().await {
        let reply = match frame? {
            JsonFrame::Line(line) if line.trim().is_empty() => continue,
            JsonFrame::Line(line) => match client.handle_payload(line.as_bytes(), &global).await {
                Ok(response) => response,
                Err((_, response)) => response,
            },
            JsonFrame::Oversized => {
                debug!(peer_addr = %peer_addr, "request line too long");

                LedResponse::error(JsonApiError::MalformedPayload(format!(
                    "request line exceeds {} bytes",
                    MAX_LINE_LENGTH
                )))
            }
        };

        trace!(response = ?reply, "sending response");

        writer.send(reply).await?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use serde_json::Value;
    use tokio::io::{AsyncBufReadExt, AsyncWriteExt, BufReader};

    use super::*;
    use crate::{
        global::GlobalData,
        instance::Instance,
        models::{Config, JsonServer},
        servers::bind,
    };

    async fn next_response<R: tokio::io::AsyncBufRead + Unpin>(
        lines: &mut tokio::io::Lines<R>,
    ) -> Value {
        let line = lines.next_line().await.unwrap().unwrap();
        serde_json::from_str(&line).unwrap()
    }

    #[tokio::test]
    async fn test_json_server() {
        let config = Config::default();
        let (instance, handle) = Instance::new(&config).await;
        tokio::spawn(instance.run());
        let global = GlobalData::new(&config, handle).wrap();

        let server = bind(
            "JSON",
            JsonServer {
                enable: true,
                port: 0,
            },
            global,
            handle_client,
        )
        .await
        .unwrap();

        let stream = TcpStream::connect(("127.0.0.1", server.local_addr().port()))
            .await
            .unwrap();
        let (read, mut write) = stream.into_split();
        let mut lines = BufReader::new(read).lines();

        write
            .write_all(b"garbage\n{\"action\":\"highlight\",\"led_indices_or_positions\":[\"C1-C5\"]}\n")
            .await
            .unwrap();

        // The connection survives a malformed request
        let first = next_response(&mut lines).await;
        assert_eq!(first["success"], false);

        let second = next_response(&mut lines).await;
        assert_eq!(second["success"], true);
        assert_eq!(second["led_count"], 5);
        assert_eq!(second["color"]["b"], 255);

        // An overlong line gets an error and the connection keeps going
        let mut long_line = vec![b'x'; 70 * 1024];
        long_line.extend_from_slice(b"\n{\"action\":\"status\"}\n");
        write.write_all(&long_line).await.unwrap();

        let third = next_response(&mut lines).await;
        assert_eq!(third["success"], false);
        assert!(third["error"].as_str().unwrap().contains("exceeds"));

        let fourth = next_response(&mut lines).await;
        assert_eq!(fourth["success"], true);
        assert_eq!(fourth["active_leds"], 5);
    }
}
