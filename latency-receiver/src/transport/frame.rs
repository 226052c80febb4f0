use crate::message::{Cursor, DecodeError};

pub const FRAME_ATTACH: u8 = 0x01;
pub const FRAME_ATTACHED: u8 = 0x02;
pub const FRAME_TRANSFER: u8 = 0x03;
pub const FRAME_FLOW: u8 = 0x04;
pub const FRAME_ACCEPT: u8 = 0x05;
pub const FRAME_SETTLE: u8 = 0x06;
pub const FRAME_DETACH: u8 = 0x07;
pub const FRAME_ERROR: u8 = 0x08;
pub const FRAME_CLOSE: u8 = 0x09;

const FLAG_SETTLED: u8 = 0x01;
const FLAG_MORE: u8 = 0x02;

/// Datagram link frames, one frame per UDP datagram
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Attach {
        credit: u32,
        container: String,
        target: String,
    },
    Attached,
    Transfer {
        delivery: u64,
        settled: bool,
        more: bool,
        payload: Vec<u8>,
    },
    Flow {
        credit: u32,
    },
    Accept {
        delivery: u64,
    },
    Settle {
        delivery: u64,
    },
    Detach,
    Error {
        name: String,
        description: String,
    },
    Close,
}

fn put_str(out: &mut Vec<u8>, value: &str) {
    let len = value.len().min(u16::MAX as usize);
    out.extend_from_slice(&(len as u16).to_le_bytes());
    out.extend_from_slice(&value.as_bytes()[..len]);
}

fn get_str(cursor: &mut Cursor<'_>) -> Result<String, DecodeError> {
    let len = u16::from_le_bytes(cursor.array()?) as usize;
    Ok(String::from_utf8_lossy(cursor.take(len)?).into_owned())
}

impl Frame {
    pub fn encode(&self) -> Vec<u8> {
        let mut out = Vec::with_capacity(16);
        match self {
            Frame::Attach { credit, container, target } => {
                out.push(FRAME_ATTACH);
                out.extend_from_slice(&credit.to_le_bytes());
                put_str(&mut out, container);
                put_str(&mut out, target);
            }
            Frame::Attached => out.push(FRAME_ATTACHED),
            Frame::Transfer { delivery, settled, more, payload } => {
                out.push(FRAME_TRANSFER);
                out.extend_from_slice(&delivery.to_le_bytes());
                let mut flags = 0;
                if *settled {
                    flags |= FLAG_SETTLED;
                }
                if *more {
                    flags |= FLAG_MORE;
                }
                out.push(flags);
                out.extend_from_slice(payload);
            }
            Frame::Flow { credit } => {
                out.push(FRAME_FLOW);
                out.extend_from_slice(&credit.to_le_bytes());
            }
            Frame::Accept { delivery } => {
                out.push(FRAME_ACCEPT);
                out.extend_from_slice(&delivery.to_le_bytes());
            }
            Frame::Settle { delivery } => {
                out.push(FRAME_SETTLE);
                out.extend_from_slice(&delivery.to_le_bytes());
            }
            Frame::Detach => out.push(FRAME_DETACH),
            Frame::Error { name, description } => {
                out.push(FRAME_ERROR);
                put_str(&mut out, name);
                put_str(&mut out, description);
            }
            Frame::Close => out.push(FRAME_CLOSE),
        }
        out
    }

    pub fn decode(data: &[u8]) -> Result<Self, DecodeError> {
        let mut cursor = Cursor::new(data);
        let [frame_type] = cursor.array::<1>()?;
        let frame = match frame_type {
            FRAME_ATTACH => Frame::Attach {
                credit: u32::from_le_bytes(cursor.array()?),
                container: get_str(&mut cursor)?,
                target: get_str(&mut cursor)?,
            },
            FRAME_ATTACHED => Frame::Attached,
            FRAME_TRANSFER => {
                let delivery = u64::from_le_bytes(cursor.array()?);
                let [flags] = cursor.array::<1>()?;
                Frame::Transfer {
                    delivery,
                    settled: flags & FLAG_SETTLED != 0,
                    more: flags & FLAG_MORE != 0,
                    payload: cursor.rest().to_vec(),
                }
            }
            FRAME_FLOW => Frame::Flow {
                credit: u32::from_le_bytes(cursor.array()?),
            },
            FRAME_ACCEPT => Frame::Accept {
                delivery: u64::from_le_bytes(cursor.array()?),
            },
            FRAME_SETTLE => Frame::Settle {
                delivery: u64::from_le_bytes(cursor.array()?),
            },
            FRAME_DETACH => Frame::Detach,
            FRAME_ERROR => Frame::Error {
                name: get_str(&mut cursor)?,
                description: get_str(&mut cursor)?,
            },
            FRAME_CLOSE => Frame::Close,
            other => {
                return Err(DecodeError::MalformedFrame(format!(
                    "unknown frame type 0x{:02x}",
                    other
                )));
            }
        };
        Ok(frame)
    }
}
