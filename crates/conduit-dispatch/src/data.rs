use conduit_core::AHashMap;
use conduit_message::Message;

/// The message under dispatch, plus a string-keyed property bag that
/// processors in the pipeline read and write freely (deadlines, trace
/// ids, auth context — whatever a given processor needs to thread
/// through to the next one or to the handler).
#[derive(Debug, Clone, Default)]
pub struct DispatchData {
    pub message: Message,
    properties: AHashMap<String, Vec<u8>>,
}

impl DispatchData {
    #[must_use]
    pub fn new(message: Message) -> Self {
        Self {
            message,
            properties: AHashMap::default(),
        }
    }

    #[must_use]
    pub fn property(&self, key: &str) -> Option<&[u8]> {
        self.properties.get(key).map(Vec::as_slice)
    }

    pub fn set_property(&mut self, key: impl Into<String>, value: impl Into<Vec<u8>>) {
        self.properties.insert(key.into(), value.into());
    }
}

/// Return-value mapping for a handler or processor invocation: either no
/// payload (the `void`/`Unit` case) or a payload message (both the
/// "returned a `DispatchResult`" and "returned any other value" cases,
/// which collapse to the same shape once the handler closure has encoded
/// its return value into a `Message` at registration time).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum DispatchOutcome {
    #[default]
    Empty,
    Payload(Message),
}

impl DispatchOutcome {
    #[must_use]
    pub const fn payload(&self) -> Option<&Message> {
        match self {
            Self::Empty => None,
            Self::Payload(message) => Some(message),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn properties_round_trip() {
        let mut data = DispatchData::new(Message::new());
        data.set_property("trace-id", b"abc-123".to_vec());
        assert_eq!(data.property("trace-id"), Some(&b"abc-123"[..]));
        assert_eq!(data.property("missing"), None);
    }
}
