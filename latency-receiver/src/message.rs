//! Decoded message records.
//!
//! A record payload is laid out little-endian as
//! `[id tag: u8][id value][creation ms: u64][body...]`, where the id value
//! width depends on the tag.

use thiserror::Error;

pub const TAG_ULONG: u8 = 0x80;
pub const TAG_UINT: u8 = 0x70;
pub const TAG_UUID: u8 = 0x98;
pub const TAG_BINARY: u8 = 0xa0;
pub const TAG_STRING: u8 = 0xa1;

const BODY_PREVIEW_LEN: usize = 64;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum DecodeError {
    #[error("Record truncated: needed {needed} bytes, {available} available")]
    Truncated { needed: usize, available: usize },

    #[error("Unknown message id type 0x{0:02x}")]
    UnknownIdType(u8),

    #[error("Delivery is not readable")]
    Unreadable,

    #[error("Malformed frame: {0}")]
    MalformedFrame(String),
}

/// Message id as carried on the wire. Only `Ulong` is a valid sequence id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageId {
    Ulong(u64),
    Uint(u32),
    Uuid([u8; 16]),
    Binary(Vec<u8>),
    String(String),
}

impl MessageId {
    pub fn kind(&self) -> &'static str {
        match self {
            MessageId::Ulong(_) => "ulong",
            MessageId::Uint(_) => "uint",
            MessageId::Uuid(_) => "uuid",
            MessageId::Binary(_) => "binary",
            MessageId::String(_) => "string",
        }
    }

    fn encode_into(&self, out: &mut Vec<u8>) {
        match self {
            MessageId::Ulong(v) => {
                out.push(TAG_ULONG);
                out.extend_from_slice(&v.to_le_bytes());
            }
            MessageId::Uint(v) => {
                out.push(TAG_UINT);
                out.extend_from_slice(&v.to_le_bytes());
            }
            MessageId::Uuid(bytes) => {
                out.push(TAG_UUID);
                out.extend_from_slice(bytes);
            }
            MessageId::Binary(bytes) => {
                out.push(TAG_BINARY);
                out.extend_from_slice(&(bytes.len() as u16).to_le_bytes());
                out.extend_from_slice(bytes);
            }
            MessageId::String(s) => {
                out.push(TAG_STRING);
                out.extend_from_slice(&(s.len() as u16).to_le_bytes());
                out.extend_from_slice(s.as_bytes());
            }
        }
    }
}

/// A message as handed over by the transport, before the sequence id type is checked
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedMessage {
    pub id: MessageId,
    /// Producer send time in ms since the epoch, 0 when absent
    pub creation_ms: u64,
    pub body: Vec<u8>,
}

/// Record consumed by the statistics core
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageRecord {
    pub sequence_id: u64,
    pub creation_ms: Option<u64>,
    pub body: Vec<u8>,
}

impl MessageRecord {
    /// Lossy UTF-8 rendering of the body, truncated for log output
    pub fn body_preview(&self) -> String {
        let end = self.body.len().min(BODY_PREVIEW_LEN);
        let mut preview = String::from_utf8_lossy(&self.body[..end]).into_owned();
        if self.body.len() > BODY_PREVIEW_LEN {
            preview.push_str("...");
        }
        preview
    }
}

impl TryFrom<DecodedMessage> for MessageRecord {
    /// Kind of the offending id
    type Error = &'static str;

    fn try_from(message: DecodedMessage) -> Result<Self, Self::Error> {
        match message.id {
            MessageId::Ulong(sequence_id) => Ok(Self {
                sequence_id,
                creation_ms: (message.creation_ms != 0).then_some(message.creation_ms),
                body: message.body,
            }),
            other => Err(other.kind()),
        }
    }
}

/// Bounds-checked little-endian reader over a byte slice
pub(crate) struct Cursor<'a> {
    data: &'a [u8],
    pos: usize,
}

impl<'a> Cursor<'a> {
    pub(crate) fn new(data: &'a [u8]) -> Self {
        Self { data, pos: 0 }
    }

    pub(crate) fn take(&mut self, len: usize) -> Result<&'a [u8], DecodeError> {
        let end = self.pos + len;
        if end > self.data.len() {
            return Err(DecodeError::Truncated {
                needed: end,
                available: self.data.len(),
            });
        }
        let slice = &self.data[self.pos..end];
        self.pos = end;
        Ok(slice)
    }

    pub(crate) fn array<const N: usize>(&mut self) -> Result<[u8; N], DecodeError> {
        let mut out = [0u8; N];
        out.copy_from_slice(self.take(N)?);
        Ok(out)
    }

    pub(crate) fn rest(&mut self) -> &'a [u8] {
        let slice = &self.data[self.pos..];
        self.pos = self.data.len();
        slice
    }
}

impl DecodedMessage {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(32 + self.body.len());
        self.id.encode_into(&mut out);
        out.extend_from_slice(&self.creation_ms.to_le_bytes());
        out.extend_from_slice(&self.body);
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let [tag] = cursor.array::<1>()?;
        let id = match tag {
            TAG_ULONG => MessageId::Ulong(u64::from_le_bytes(cursor.array()?)),
            TAG_UINT => MessageId::Uint(u32::from_le_bytes(cursor.array()?)),
            TAG_UUID => MessageId::Uuid(cursor.array()?),
            TAG_BINARY | TAG_STRING => {
                let len = u16::from_le_bytes(cursor.array()?) as usize;
                let bytes = cursor.take(len)?.to_vec();
                if tag == TAG_BINARY {
                    MessageId::Binary(bytes)
                } else {
                    MessageId::String(String::from_utf8_lossy(&bytes).into_owned())
                }
            }
            other => return Err(DecodeError::UnknownIdType(other)),
        };
        let creation_ms = u64::from_le_bytes(cursor.array()?);
        let body = cursor.rest().to_vec();

        Ok(Self { id, creation_ms, body })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_ulong_record() {
        let message = DecodedMessage {
            id: MessageId::Ulong(42),
            creation_ms: 1_700_000_000_000,
            body: b"hello".to_vec(),
        };
        let decoded = DecodedMessage::decode(&message.encode()).unwrap();
        assert_eq!(decoded, message);

        let record = MessageRecord::try_from(decoded).unwrap();
        assert_eq!(record.sequence_id, 42);
        assert_eq!(record.creation_ms, Some(1_700_000_000_000));
        assert_eq!(record.body_preview(), "hello");
    }

    #[test]
    fn test_absent_creation_time() {
        let message = DecodedMessage {
            id: MessageId::Ulong(1),
            creation_ms: 0,
            body: Vec::new(),
        };
        let record = MessageRecord::try_from(message).unwrap();
        assert_eq!(record.creation_ms, None);
    }

    #[test]
    fn test_non_ulong_id_is_rejected() {
        let message = DecodedMessage {
            id: MessageId::String("abc".to_string()),
            creation_ms: 5,
            body: Vec::new(),
        };
        let decoded = DecodedMessage::decode(&message.encode()).unwrap();
        assert_eq!(MessageRecord::try_from(decoded), Err("string"));
    }

    #[test]
    fn test_truncated_and_unknown() {
        assert_eq!(
            DecodedMessage::decode(&[TAG_ULONG, 1, 2]),
            Err(DecodeError::Truncated { needed: 9, available: 3 })
        );
        assert_eq!(DecodedMessage::decode(&[0x42]), Err(DecodeError::UnknownIdType(0x42)));
        assert!(matches!(DecodedMessage::decode(&[]), Err(DecodeError::Truncated { .. })));
    }

    #[test]
    fn test_body_preview_truncates() {
        let record = MessageRecord {
            sequence_id: 0,
            creation_ms: None,
            body: vec![b'x'; 100],
        };
        let preview = record.body_preview();
        assert!(preview.ends_with("..."));
        assert_eq!(preview.len(), BODY_PREVIEW_LEN + 3);
    }
}
