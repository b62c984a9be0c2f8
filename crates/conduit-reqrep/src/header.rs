use bytes::Bytes;

/// The outermost remaining frame after a multiplexer/physical layer has
/// stripped its own headers: `<kind:u8><corrId:u32 LE>`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Request = 1,
    Response = 2,
    Ack = 3,
    Cancel = 4,
    CancellationAck = 5,
}

impl Kind {
    const fn from_u8(byte: u8) -> Option<Self> {
        match byte {
            1 => Some(Self::Request),
            2 => Some(Self::Response),
            3 => Some(Self::Ack),
            4 => Some(Self::Cancel),
            5 => Some(Self::CancellationAck),
            _ => None,
        }
    }
}

pub fn encode_header(kind: Kind, corr_id: u32) -> Bytes {
    let mut buf = Vec::with_capacity(5);
    buf.push(kind as u8);
    buf.extend_from_slice(&corr_id.to_le_bytes());
    Bytes::from(buf)
}

pub fn decode_header(frame: &[u8]) -> Option<(Kind, u32)> {
    if frame.len() < 5 {
        return None;
    }
    let kind = Kind::from_u8(frame[0])?;
    let corr_id = u32::from_le_bytes([frame[1], frame[2], frame[3], frame[4]]);
    Some((kind, corr_id))
}
