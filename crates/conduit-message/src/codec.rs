use bytes::Bytes;
use conduit_core::{varint, Error, Result};

use crate::message::Message;

fn truncated(context: &str) -> Error {
    Error::transport_failure(format!("truncated message frame: {context}"))
}

/// Encode a message as `<msgLen:u32 LE><n:varint><frame₁>…<frameₙ>` where
/// each `frameᵢ = <payloadLen:varint><payload>`.
#[must_use]
pub fn encode(message: &Message) -> Vec<u8> {
    let mut body = Vec::new();
    varint::write_u64(&mut body, message.frames.len() as u64);
    for frame in &message.frames {
        varint::write_u64(&mut body, frame.len() as u64);
        body.extend_from_slice(frame);
    }

    let mut out = Vec::with_capacity(4 + body.len());
    out.extend_from_slice(&u32::try_from(body.len()).unwrap_or(u32::MAX).to_le_bytes());
    out.extend_from_slice(&body);
    out
}

/// Decode one message from the front of `buf`, returning it along with the
/// unconsumed remainder. Rejects truncated input rather than panicking or
/// silently returning a partial message.
pub fn decode(buf: &[u8]) -> Result<(Message, &[u8])> {
    if buf.len() < 4 {
        return Err(truncated("missing length prefix"));
    }
    let msg_len = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]) as usize;
    let rest = &buf[4..];
    if rest.len() < msg_len {
        return Err(truncated("body shorter than declared length"));
    }
    let (body, tail) = rest.split_at(msg_len);

    let (frame_count, mut cursor) =
        varint::read_u64(body).ok_or_else(|| truncated("missing frame count"))?;

    let mut frames = Vec::with_capacity(usize::try_from(frame_count).unwrap_or(0));
    for _ in 0..frame_count {
        let (len, next) =
            varint::read_u64(cursor).ok_or_else(|| truncated("missing frame length"))?;
        let len = usize::try_from(len).map_err(|_| truncated("frame length overflow"))?;
        if next.len() < len {
            return Err(truncated("frame payload shorter than declared length"));
        }
        let (payload, after) = next.split_at(len);
        frames.push(Bytes::copy_from_slice(payload));
        cursor = after;
    }

    Ok((Message::from_frames(frames), tail))
}
