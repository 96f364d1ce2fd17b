//! WebSocket transport over tokio-tungstenite
//!
//! Single socket per client. The write half sits behind a lock, the read half
//! is drained by a background task into the inbound channel.

use async_trait::async_trait;
use futures_util::{stream::SplitSink, SinkExt, StreamExt};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex as StdMutex;
use tokio::net::TcpStream;
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::protocol::WebSocketConfig;
use tokio_tungstenite::tungstenite::{Error as WsError, Message};
use tokio_tungstenite::{connect_async_with_config, MaybeTlsStream, WebSocketStream};
use url::Url;

use super::{Inbound, Transport};
use crate::config::ClientConfig;
use crate::error::{CDPError, Result};

type WsSink = SplitSink<WebSocketStream<MaybeTlsStream<TcpStream>>, Message>;

pub struct WebSocketTransport {
    sink: Mutex<WsSink>,
    closed: AtomicBool,
    reader: StdMutex<Option<JoinHandle<()>>>,
}

/// Reject anything that is not a ws:// or wss:// URL before dialing.
pub(crate) fn parse_endpoint(address: &str) -> Result<Url> {
    let url = Url::parse(address).map_err(|e| CDPError::InvalidUrl {
        url: address.to_string(),
        reason: e.to_string(),
    })?;
    match url.scheme() {
        "ws" | "wss" => Ok(url),
        other => Err(CDPError::InvalidUrl {
            url: address.to_string(),
            reason: format!("unsupported scheme {}", other),
        }),
    }
}

impl WebSocketTransport {
    /// Dial `config.ws_url` and start the reader task.
    pub async fn connect(config: &ClientConfig) -> Result<(Self, Inbound)> {
        let url = parse_endpoint(&config.ws_url)?;

        let mut ws_config = WebSocketConfig::default();
        if config.max_message_size.is_some() {
            ws_config.max_message_size = config.max_message_size;
            ws_config.max_frame_size = config.max_message_size;
        }

        let (ws_stream, _) =
            connect_async_with_config(url.as_str(), Some(ws_config), false).await?;
        tracing::info!("WebSocket connected to {}", url);

        let (sink, mut stream) = ws_stream.split();
        let (tx, rx) = mpsc::unbounded_channel();

        let reader = tokio::spawn(async move {
            while let Some(msg) = stream.next().await {
                let text = match msg {
                    Ok(Message::Text(text)) => text,
                    Ok(Message::Binary(bytes)) => match String::from_utf8(bytes) {
                        Ok(text) => text,
                        Err(_) => {
                            tracing::warn!("Dropping non UTF-8 binary frame");
                            continue;
                        }
                    },
                    Ok(Message::Close(frame)) => {
                        tracing::info!("WebSocket closed by peer: {:?}", frame);
                        break;
                    }
                    Ok(_) => continue,
                    Err(e) => {
                        tracing::error!("WebSocket error: {}", e);
                        break;
                    }
                };
                if tx.send(text).is_err() {
                    break; // Consumer gone
                }
            }
        });

        let transport = Self {
            sink: Mutex::new(sink),
            closed: AtomicBool::new(false),
            reader: StdMutex::new(Some(reader)),
        };
        Ok((transport, rx))
    }

    fn stop_reader(&self) {
        if let Ok(mut reader) = self.reader.lock() {
            if let Some(task) = reader.take() {
                task.abort();
            }
        }
    }
}

fn map_ws_error(e: WsError) -> CDPError {
    match e {
        WsError::ConnectionClosed | WsError::AlreadyClosed => CDPError::ConnectionClosed,
        other => CDPError::WebSocket(other),
    }
}

#[async_trait]
impl Transport for WebSocketTransport {
    async fn send(&self, frame: String) -> Result<()> {
        if self.closed.load(Ordering::SeqCst) {
            return Err(CDPError::ConnectionClosed);
        }
        let mut sink = self.sink.lock().await;
        sink.send(Message::Text(frame)).await.map_err(map_ws_error)
    }

    async fn close(&self) -> Result<()> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        let result = self.sink.lock().await.close().await;
        self.stop_reader();
        match result.map_err(map_ws_error) {
            Ok(()) | Err(CDPError::ConnectionClosed) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

impl Drop for WebSocketTransport {
    fn drop(&mut self) {
        self.stop_reader();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio::net::TcpListener;
    use tokio_test::{assert_err, assert_ok};

    /// Loopback server that echoes text frames back to the client.
    async fn echo_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            while let Some(Ok(msg)) = ws.next().await {
                if msg.is_close() {
                    break;
                }
                if msg.is_text() && ws.send(msg).await.is_err() {
                    break;
                }
            }
        });
        format!("ws://{}", addr)
    }

    #[tokio::test]
    async fn test_send_and_receive() {
        let url = echo_server().await;
        let (transport, mut inbound) =
            assert_ok!(WebSocketTransport::connect(&ClientConfig::new(url)).await);

        assert_ok!(transport.send(r#"{"id":1,"method":"Browser.getVersion"}"#.to_string()).await);
        assert_eq!(
            inbound.recv().await.as_deref(),
            Some(r#"{"id":1,"method":"Browser.getVersion"}"#)
        );

        assert_ok!(transport.close().await);
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let url = echo_server().await;
        let (transport, mut inbound) =
            assert_ok!(WebSocketTransport::connect(&ClientConfig::new(url)).await);

        assert_ok!(transport.close().await);
        assert_ok!(transport.close().await);

        let err = assert_err!(transport.send("{}".to_string()).await);
        assert!(err.is_connection_closed());
        assert_eq!(inbound.recv().await, None);
    }

    #[tokio::test]
    async fn test_peer_disconnect_ends_inbound() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let (tcp, _) = listener.accept().await.unwrap();
            let mut ws = tokio_tungstenite::accept_async(tcp).await.unwrap();
            let _ = ws.close(None).await;
        });

        let (_transport, mut inbound) = assert_ok!(
            WebSocketTransport::connect(&ClientConfig::new(format!("ws://{}", addr))).await
        );
        assert_eq!(inbound.recv().await, None);
    }

    #[tokio::test]
    async fn test_connect_refused() {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let config = ClientConfig::new(format!("ws://{}", addr));
        let result = WebSocketTransport::connect(&config).await;
        assert!(matches!(result, Err(CDPError::WebSocket(_))));
    }

    #[test]
    fn test_parse_endpoint() {
        assert_ok!(parse_endpoint("ws://localhost:9222/devtools/browser/abc"));
        assert_ok!(parse_endpoint("wss://example.com/devtools"));
        assert!(matches!(
            parse_endpoint("http://localhost:9222"),
            Err(CDPError::InvalidUrl { .. })
        ));
        assert!(matches!(
            parse_endpoint("not a url"),
            Err(CDPError::InvalidUrl { .. })
        ));
    }
}
