//! Messages carried between paired nodes.
//!
//! The wire payload is raw bytes; nothing here imposes structure on it. The
//! demo exchange happens to send UTF-8 text, so `Message` offers helpers for
//! building that text and rendering received bytes for logs.

use std::fmt;

use bytes::Bytes;

/// A single message payload.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Message(Bytes);

impl Message {
    /// Wrap raw bytes.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self(payload.into())
    }

    /// The demo payload for iteration `index` sent by `node`.
    ///
    /// ```rust
    /// use pairmsg_core::Message;
    ///
    /// let msg = Message::exchange(0, "1");
    /// assert_eq!(msg.to_string(), "message 0 from node 1.");
    /// ```
    pub fn exchange(index: usize, node: &str) -> Self {
        Self(Bytes::from(format!("message {} from node {}.", index, node)))
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.0
    }

    pub fn into_bytes(self) -> Bytes {
        self.0
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl From<Bytes> for Message {
    fn from(bytes: Bytes) -> Self {
        Self(bytes)
    }
}

impl From<&'static str> for Message {
    fn from(text: &'static str) -> Self {
        Self(Bytes::from_static(text.as_bytes()))
    }
}

impl From<String> for Message {
    fn from(text: String) -> Self {
        Self(Bytes::from(text))
    }
}

/// Lossy UTF-8 rendering, for logs.
impl fmt::Display for Message {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.0))
    }
}
