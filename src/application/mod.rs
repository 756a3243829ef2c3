// Application layer - Polling, normalization and the push channel
pub mod channel_client;
pub mod channel_machine;
pub mod classifier;
pub mod identity;
pub mod normalizer;
pub mod notification_feed;
pub mod poller;
pub mod push_connector;
pub mod session;
pub mod telemetry_source;

#[cfg(test)]
pub(crate) mod test_support;
