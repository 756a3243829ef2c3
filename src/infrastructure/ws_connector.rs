// WebSocket transport for the push channel
use crate::application::push_connector::{PushConnection, PushConnector};
use crate::error::ChannelError;
use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream};

#[derive(Debug, Clone)]
pub struct WsConnector {
    url: String,
}

impl WsConnector {
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into() }
    }
}

#[async_trait]
impl PushConnector for WsConnector {
    fn endpoint(&self) -> &str {
        &self.url
    }

    async fn connect(&self) -> Result<Box<dyn PushConnection>, ChannelError> {
        let (stream, _response) = tokio_tungstenite::connect_async(self.url.as_str())
            .await
            .map_err(|e| ChannelError::Connect {
                url: self.url.clone(),
                reason: e.to_string(),
            })?;
        Ok(Box::new(WsConnection { stream }))
    }
}

struct WsConnection {
    stream: WebSocketStream<MaybeTlsStream<TcpStream>>,
}

#[async_trait]
impl PushConnection for WsConnection {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError> {
        self.stream
            .send(Message::Text(text.into()))
            .await
            .map_err(|e| ChannelError::Transport(e.to_string()))
    }

    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>> {
        loop {
            match self.stream.next().await? {
                Ok(Message::Text(text)) => return Some(Ok(text.as_str().to_owned())),
                Ok(Message::Binary(bytes)) => match String::from_utf8(bytes.to_vec()) {
                    Ok(text) => return Some(Ok(text)),
                    Err(_) => tracing::debug!("dropping non-utf8 binary frame"),
                },
                Ok(Message::Close(frame)) => {
                    tracing::debug!("push channel closed by peer: {:?}", frame);
                    return None;
                }
                // tungstenite answers pings itself
                Ok(Message::Ping(_)) | Ok(Message::Pong(_)) | Ok(Message::Frame(_)) => {}
                Err(e) => return Some(Err(ChannelError::Transport(e.to_string()))),
            }
        }
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.close(None).await {
            tracing::debug!("error while closing push channel: {}", e);
        }
    }
}
