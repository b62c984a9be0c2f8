//! Logical endpoint addressing.
//!
//! An [`EndPointAddress`] is an opaque, content-addressed identity: two
//! addresses are equal iff their trimmed UTF-8 byte sequences are equal.
//! The empty sequence is the distinguished [`EndPointAddress::unknown`].

use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::varint;

/// A routable logical identity, independent of physical location.
#[derive(Debug, Clone, Eq)]
pub struct EndPointAddress {
    bytes: Arc<[u8]>,
}

impl EndPointAddress {
    /// The sentinel address for "no known endpoint": the empty byte sequence.
    #[must_use]
    pub fn unknown() -> Self {
        Self {
            bytes: Arc::from(&[][..]),
        }
    }

    /// Build an address from raw UTF-8 bytes, trimming surrounding whitespace.
    #[must_use]
    pub fn from_str_trimmed(s: &str) -> Self {
        Self {
            bytes: Arc::from(s.trim().as_bytes()),
        }
    }

    #[must_use]
    pub fn is_unknown(&self) -> bool {
        self.bytes.is_empty()
    }

    #[must_use]
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    /// Lossy string view, useful for logging.
    #[must_use]
    pub fn display(&self) -> std::borrow::Cow<'_, str> {
        String::from_utf8_lossy(&self.bytes)
    }

    /// Serialize as `<byteLen:varint><utf8-bytes>`.
    pub fn encode(&self, out: &mut Vec<u8>) {
        varint::write_u64(out, self.bytes.len() as u64);
        out.extend_from_slice(&self.bytes);
    }

    /// Decode the wire form produced by [`Self::encode`].
    pub fn decode(buf: &[u8]) -> Option<(Self, &[u8])> {
        let (len, rest) = varint::read_u64(buf)?;
        let len = usize::try_from(len).ok()?;
        if rest.len() < len {
            return None;
        }
        let (bytes, rest) = rest.split_at(len);
        Some((
            Self {
                bytes: Arc::from(bytes),
            },
            rest,
        ))
    }
}

impl PartialEq for EndPointAddress {
    fn eq(&self, other: &Self) -> bool {
        self.bytes.as_ref() == other.bytes.as_ref()
    }
}

impl Hash for EndPointAddress {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.bytes.as_ref().hash(state);
    }
}

impl fmt::Display for EndPointAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unknown() {
            write!(f, "<unknown>")
        } else {
            write!(f, "{}", self.display())
        }
    }
}

impl From<&str> for EndPointAddress {
    fn from(s: &str) -> Self {
        Self::from_str_trimmed(s)
    }
}

impl From<String> for EndPointAddress {
    fn from(s: String) -> Self {
        Self::from_str_trimmed(&s)
    }
}
