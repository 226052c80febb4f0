use socket2::{Domain, Protocol, Socket, Type};
use std::collections::VecDeque;
use std::net::{Ipv4Addr, Ipv6Addr, SocketAddr, UdpSocket};
use std::time::Duration;
use tracing::{debug, info, warn};

use super::frame::Frame;
use super::{LinkHandle, Transport};
use crate::error::{Error, Result};
use crate::event::{Condition, Delivery, Event};
use crate::message::{DecodeError, DecodedMessage};

const MAX_DATAGRAM: usize = 65536;

/// Minimal UDP link transport: one frame per datagram, a single receiving link.
pub struct DatagramTransport {
    socket: UdpSocket,
    peer: SocketAddr,
    container_id: String,
    pending: VecDeque<Event>,
    link: Option<LinkHandle>,
    closed: bool,
    buffer: Vec<u8>,
}

impl DatagramTransport {
    pub fn connect(peer: SocketAddr, container_id: String) -> Result<Self> {
        let (domain, local): (Domain, SocketAddr) = if peer.is_ipv4() {
            (Domain::IPV4, (Ipv4Addr::UNSPECIFIED, 0).into())
        } else {
            (Domain::IPV6, (Ipv6Addr::UNSPECIFIED, 0).into())
        };

        let socket = Socket::new(domain, Type::DGRAM, Some(Protocol::UDP))?;
        if let Err(e) = socket.set_recv_buffer_size(1024 * 1024) {
            warn!("Failed to set large receive buffer: {}", e);
        }
        socket.bind(&local.into())?;
        socket.connect(&peer.into())?;
        let socket: UdpSocket = socket.into();

        info!(
            "Datagram transport {} connected to {} as {}",
            socket.local_addr()?,
            peer,
            container_id
        );

        Ok(Self {
            socket,
            peer,
            container_id,
            pending: VecDeque::from([Event::ConnectionInit]),
            link: None,
            closed: false,
            buffer: vec![0u8; MAX_DATAGRAM],
        })
    }

    fn send(&self, frame: &Frame) -> Result<()> {
        self.socket.send(&frame.encode())?;
        Ok(())
    }

    fn check_link(&self, link: LinkHandle) -> Result<()> {
        if self.link == Some(link) {
            Ok(())
        } else {
            Err(Error::LinkNotOpen)
        }
    }

    fn frame_to_event(&mut self, size: usize) -> Event {
        let frame = match Frame::decode(&self.buffer[..size]) {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Dropping datagram from {}: {}", self.peer, e);
                return Event::Other("malformed-frame");
            }
        };

        match frame {
            Frame::Attached => Event::LinkRemoteOpen,
            Frame::Transfer { delivery, settled, more, payload } => Event::Delivery(Delivery {
                tag: delivery,
                readable: true,
                partial: more,
                settled,
                payload,
            }),
            Frame::Detach => Event::LinkRemoteClose,
            Frame::Error { name, description } => {
                self.closed = true;
                Event::TransportError(Condition {
                    name: (!name.is_empty()).then_some(name),
                    description: (!description.is_empty()).then_some(description),
                })
            }
            Frame::Close => {
                self.closed = true;
                Event::Other("connection-remote-close")
            }
            other => {
                debug!("Ignoring unexpected frame from peer: {:?}", other);
                Event::Other("unexpected-frame")
            }
        }
    }
}

impl Transport for DatagramTransport {
    fn open_link(&mut self, target: &str, initial_credit: u32) -> Result<LinkHandle> {
        self.send(&Frame::Attach {
            credit: initial_credit,
            container: self.container_id.clone(),
            target: target.to_string(),
        })?;
        let link = LinkHandle(0);
        self.link = Some(link);
        debug!("Requested link to '{}' with {} credit", target, initial_credit);
        Ok(link)
    }

    fn grant_credit(&mut self, link: LinkHandle, amount: u32) -> Result<()> {
        self.check_link(link)?;
        self.send(&Frame::Flow { credit: amount })
    }

    fn poll_event(&mut self, timeout: Duration) -> Result<Option<Event>> {
        if let Some(event) = self.pending.pop_front() {
            return Ok(Some(event));
        }
        if self.closed {
            return Ok(None);
        }

        // a zero timeout means "block forever" to the socket
        self.socket
            .set_read_timeout(Some(timeout.max(Duration::from_millis(1))))?;

        match self.socket.recv(&mut self.buffer) {
            Ok(size) => Ok(Some(self.frame_to_event(size))),
            Err(e) => match e.kind() {
                std::io::ErrorKind::WouldBlock | std::io::ErrorKind::TimedOut => Ok(None),
                _ => {
                    self.closed = true;
                    Ok(Some(Event::TransportError(Condition {
                        name: Some(format!("{:?}", e.kind())),
                        description: Some(e.to_string()),
                    })))
                }
            },
        }
    }

    fn decode_delivery(
        &mut self,
        link: LinkHandle,
        delivery: &Delivery,
    ) -> std::result::Result<DecodedMessage, DecodeError> {
        if self.link != Some(link) || !delivery.readable {
            return Err(DecodeError::Unreadable);
        }
        DecodedMessage::decode(&delivery.payload)
    }

    fn acknowledge(&mut self, delivery: &Delivery) -> Result<()> {
        self.send(&Frame::Accept { delivery: delivery.tag })
    }

    fn settle(&mut self, delivery: Delivery) -> Result<()> {
        if delivery.settled {
            return Ok(());
        }
        self.send(&Frame::Settle { delivery: delivery.tag })
    }

    fn close_link(&mut self, link: LinkHandle) -> Result<()> {
        self.check_link(link)?;
        info!("Closing link");
        self.send(&Frame::Detach)
    }

    fn close_connection(&mut self) -> Result<()> {
        if !self.closed {
            self.send(&Frame::Close)?;
            self.closed = true;
        }
        self.link = None;
        Ok(())
    }

    fn is_closed(&self) -> bool {
        self.closed && self.pending.is_empty()
    }
}
