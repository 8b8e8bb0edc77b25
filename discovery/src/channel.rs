//! Channel adapter contract.
//!
//! The discovery engine shares one bidirectional byte stream with interactive
//! use. Outbound probes go through [`ChannelAdapter::send`]; inbound data is
//! push-delivered in arbitrary chunks to a [`DataCallback`], usually
//! [`ResponseBuffer::sink`](crate::ResponseBuffer::sink).

use std::sync::Arc;

use async_trait::async_trait;

use crate::error::ChannelError;

/// Receives inbound chunks. Chunk boundaries carry no meaning.
pub type DataCallback = Arc<dyn Fn(&[u8]) + Send + Sync>;

/// A live text channel to the shell.
#[async_trait]
pub trait ChannelAdapter: Send + Sync {
    /// Writes `text` to the shell.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelError::NotOpen`] if the channel is not live.
    async fn send(&self, text: &str) -> Result<(), ChannelError>;

    /// Returns `true` while the channel can carry probes.
    fn is_open(&self) -> bool;
}
