//! Inbound response buffer.
//!
//! The channel adapter pushes every received chunk here. Bytes are kept only
//! while a probe is active; anything arriving between probes is interactive
//! traffic and is dropped.

use std::sync::Arc;

use parking_lot::Mutex;

use crate::channel::DataCallback;

#[derive(Debug, Default)]
struct BufferState {
    active: bool,
    bytes: Vec<u8>,
}

/// Shared, cloneable probe buffer.
///
/// # Examples
///
/// ```
/// use shell_catalog_discovery::ResponseBuffer;
///
/// let buffer = ResponseBuffer::new();
/// buffer.push(b"ignored");
/// assert!(buffer.is_empty());
///
/// buffer.begin();
/// buffer.push(b"log - Log");
/// buffer.push(b"ging\r\n");
/// assert_eq!(buffer.finish(), "log - Logging\r\n");
/// assert!(!buffer.is_active());
/// ```
#[derive(Debug, Clone, Default)]
pub struct ResponseBuffer {
    inner: Arc<Mutex<BufferState>>,
}

impl ResponseBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Clears the buffer and starts capturing.
    pub fn begin(&self) {
        let mut state = self.inner.lock();
        state.bytes.clear();
        state.active = true;
    }

    /// Stops capturing and returns the captured text.
    pub fn finish(&self) -> String {
        let mut state = self.inner.lock();
        state.active = false;
        let bytes = std::mem::take(&mut state.bytes);
        String::from_utf8_lossy(&bytes).into_owned()
    }

    /// Appends a chunk if a probe is active.
    pub fn push(&self, chunk: &[u8]) {
        let mut state = self.inner.lock();
        if state.active {
            state.bytes.extend_from_slice(chunk);
        }
    }

    pub fn is_active(&self) -> bool {
        self.inner.lock().active
    }

    /// Captured byte count.
    pub fn len(&self) -> usize {
        self.inner.lock().bytes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Lossy UTF-8 view of the captured bytes so far.
    pub fn snapshot(&self) -> String {
        String::from_utf8_lossy(&self.inner.lock().bytes).into_owned()
    }

    /// A data callback that feeds this buffer, for push-delivering channels.
    pub fn sink(&self) -> DataCallback {
        let buffer = self.clone();
        Arc::new(move |chunk: &[u8]| buffer.push(chunk))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_multibyte_chunk_decodes() {
        let buffer = ResponseBuffer::new();
        buffer.begin();
        let text = "µs timer\n".as_bytes();
        buffer.push(&text[..1]);
        buffer.push(&text[1..]);
        assert_eq!(buffer.finish(), "µs timer\n");
    }

    #[test]
    fn test_invalid_utf8_is_replaced() {
        let buffer = ResponseBuffer::new();
        buffer.begin();
        buffer.push(&[b'o', b'k', 0xff, b'\n']);
        assert_eq!(buffer.finish(), "ok\u{fffd}\n");
    }

    #[test]
    fn test_begin_clears_previous_capture() {
        let buffer = ResponseBuffer::new();
        buffer.begin();
        buffer.push(b"stale");
        buffer.begin();
        assert!(buffer.is_empty());
        buffer.push(b"fresh");
        assert_eq!(buffer.snapshot(), "fresh");
    }

    #[test]
    fn test_sink_feeds_shared_state() {
        let buffer = ResponseBuffer::new();
        let sink = buffer.sink();
        buffer.begin();
        sink(b"abc");
        assert_eq!(buffer.len(), 3);
    }
}
