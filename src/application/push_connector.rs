// Connector traits for the push-notification channel
use crate::error::ChannelError;
use async_trait::async_trait;

#[async_trait]
pub trait PushConnector: Send + Sync {
    /// Where connections go, for logging
    fn endpoint(&self) -> &str;

    /// Open one physical connection
    async fn connect(&self) -> Result<Box<dyn PushConnection>, ChannelError>;
}

/// One open connection. Owned by exactly one channel driver.
#[async_trait]
pub trait PushConnection: Send {
    async fn send_text(&mut self, text: String) -> Result<(), ChannelError>;

    /// Next text frame. `None` once the peer closed the connection.
    async fn recv_text(&mut self) -> Option<Result<String, ChannelError>>;

    async fn close(&mut self);
}
