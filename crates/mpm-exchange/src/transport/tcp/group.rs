// SPDX-License-Identifier: Apache-2.0 OR MIT
// Copyright (c) 2025-2026 cb-geo mpm contributors

//! Full-mesh TCP rank group.

use super::config::TcpGroupConfig;
use super::frame_codec::FrameCodec;
use crate::core::ser::{Cursor, CursorMut, SerError, SerResult};
use crate::datatype::DatatypeRegistry;
use crate::exchange::ExchangeError;
use crate::transport::{Envelope, Pending, Rank, Tag, Transport};
use crate::{Error, Result};
use crossbeam::channel::{unbounded, Receiver, Sender};
use parking_lot::Mutex;
use socket2::{Domain, Protocol, Socket, Type};
use std::io;
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::Arc;
use std::thread;

const HANDSHAKE_MAGIC: [u8; 4] = *b"MPMX";
const HANDSHAKE_VERSION: u8 = 1;
/// magic + version + rank + size
const HANDSHAKE_LEN: usize = 4 + 1 + 4 + 4;
/// tag + signature
const ENVELOPE_HEADER_LEN: usize = 4 + 8;

/// One rank of a group of processes connected pairwise over TCP.
///
/// Rank `i` listens on `peers[i]`, dials every lower rank and accepts every
/// higher one. Each connection opens with a handshake naming the dialling
/// rank and the group size, answered by the acceptor's rank.
pub struct TcpGroup {
    rank: Rank,
    size: usize,
    links: Vec<Link>,
    datatypes: Arc<DatatypeRegistry>,
}

enum Link {
    Loopback {
        tx: Sender<Envelope>,
        rx: Receiver<Envelope>,
        pending: Mutex<Pending>,
    },
    Peer {
        addr: SocketAddr,
        writer: Mutex<PeerWriter>,
        reader: Mutex<PeerReader>,
    },
}

struct PeerWriter {
    stream: TcpStream,
    codec: FrameCodec,
}

struct PeerReader {
    stream: TcpStream,
    codec: FrameCodec,
    pending: Pending,
}

impl TcpGroup {
    /// Bind this rank's listen address and connect the mesh.
    pub fn connect(config: TcpGroupConfig) -> Result<Self> {
        config.validate()?;
        let addr = config
            .listen_addr()
            .ok_or_else(|| Error::Config(format!("no listen address for rank {}", config.rank)))?;
        let listener = bind_listener(addr, config.listen_backlog)?;
        Self::with_listener(config, listener)
    }

    /// Connect the mesh using an already bound listener for this rank.
    pub fn with_listener(config: TcpGroupConfig, listener: TcpListener) -> Result<Self> {
        config.validate()?;
        let rank = config.rank;
        let size = config.size();
        let mut streams: Vec<Option<TcpStream>> = (0..size).map(|_| None).collect();

        for peer in 0..rank {
            let addr = config.peers[peer];
            let mut stream = dial(addr, &config)?;
            let mut codec = FrameCodec::new(HANDSHAKE_LEN);
            codec.write_frame(&mut stream, &encode_handshake(rank, size)?)?;
            let (acceptor, acceptor_size) = decode_handshake(&codec.read_frame(&mut stream)?)?;
            if acceptor != peer || acceptor_size != size {
                return Err(handshake_error(format!(
                    "{} answered as rank {} of {}, expected rank {} of {}",
                    addr, acceptor, acceptor_size, peer, size
                )));
            }
            log::debug!("[TCP] rank {} connected to rank {} at {}", rank, peer, addr);
            streams[peer] = Some(stream);
        }

        for _ in rank + 1..size {
            let (mut stream, remote) = listener.accept()?;
            stream.set_nodelay(config.nodelay)?;
            let mut codec = FrameCodec::new(HANDSHAKE_LEN);
            let (peer, peer_size) = decode_handshake(&codec.read_frame(&mut stream)?)?;
            if peer_size != size || peer <= rank || peer >= size || streams[peer].is_some() {
                return Err(handshake_error(format!(
                    "unexpected handshake from {}: rank {} of {}",
                    remote, peer, peer_size
                )));
            }
            codec.write_frame(&mut stream, &encode_handshake(rank, size)?)?;
            log::debug!("[TCP] rank {} accepted rank {} from {}", rank, peer, remote);
            streams[peer] = Some(stream);
        }

        let mut links = Vec::with_capacity(size);
        for (peer, stream) in streams.into_iter().enumerate() {
            let link = match stream {
                None if peer == rank => {
                    let (tx, rx) = unbounded();
                    Link::Loopback {
                        tx,
                        rx,
                        pending: Mutex::new(Pending::default()),
                    }
                }
                None => {
                    return Err(handshake_error(format!("rank {} never connected", peer)));
                }
                Some(stream) => Link::Peer {
                    addr: stream.peer_addr()?,
                    reader: Mutex::new(PeerReader {
                        stream: stream.try_clone()?,
                        codec: FrameCodec::new(config.max_frame_size),
                        pending: Pending::default(),
                    }),
                    writer: Mutex::new(PeerWriter {
                        stream,
                        codec: FrameCodec::new(config.max_frame_size),
                    }),
                },
            };
            links.push(link);
        }

        log::info!("[TCP] rank {} of {} connected", rank, size);
        Ok(Self {
            rank,
            size,
            links,
            datatypes: Arc::new(DatatypeRegistry::new()),
        })
    }

    /// Remote address of `peer`, `None` for this rank.
    pub fn peer_addr(&self, peer: Rank) -> Option<SocketAddr> {
        match self.links.get(peer)? {
            Link::Peer { addr, .. } => Some(*addr),
            Link::Loopback { .. } => None,
        }
    }
}

impl Transport for TcpGroup {
    fn rank(&self) -> Rank {
        self.rank
    }

    fn size(&self) -> usize {
        self.size
    }

    fn datatypes(&self) -> &Arc<DatatypeRegistry> {
        &self.datatypes
    }

    fn send_bytes(
        &self,
        dest: Rank,
        tag: Tag,
        signature: u64,
        payload: &[u8],
    ) -> std::result::Result<(), ExchangeError> {
        self.check_rank(dest)?;
        match &self.links[dest] {
            Link::Loopback { tx, .. } => tx
                .send(Envelope {
                    source: self.rank,
                    tag,
                    signature,
                    payload: payload.to_vec(),
                })
                .map_err(|_| ExchangeError::Disconnected { peer: dest }),
            Link::Peer { writer, .. } => {
                let body = encode_envelope(tag, signature, payload)?;
                let mut writer = writer.lock();
                let PeerWriter { stream, codec } = &mut *writer;
                codec
                    .write_frame(stream, &body)
                    .map_err(|e| io_to_exchange(e, dest))?;
                log::debug!(
                    "[TCP] rank {} -> {} tag {} ({} bytes)",
                    self.rank,
                    dest,
                    tag,
                    payload.len()
                );
                Ok(())
            }
        }
    }

    fn recv_bytes(&self, source: Rank, tag: Tag) -> std::result::Result<Envelope, ExchangeError> {
        self.check_rank(source)?;
        match &self.links[source] {
            Link::Loopback { rx, pending, .. } => {
                let mut pending = pending.lock();
                if let Some(envelope) = pending.take(tag) {
                    return Ok(envelope);
                }
                loop {
                    let envelope = rx
                        .recv()
                        .map_err(|_| ExchangeError::Disconnected { peer: source })?;
                    if envelope.tag == tag {
                        return Ok(envelope);
                    }
                    pending.hold(envelope);
                }
            }
            Link::Peer { reader, .. } => {
                let mut reader = reader.lock();
                let PeerReader {
                    stream,
                    codec,
                    pending,
                } = &mut *reader;
                if let Some(envelope) = pending.take(tag) {
                    return Ok(envelope);
                }
                loop {
                    let body = codec
                        .read_frame(stream)
                        .map_err(|e| io_to_exchange(e, source))?;
                    let envelope = decode_envelope(source, &body)?;
                    if envelope.tag == tag {
                        log::debug!(
                            "[TCP] rank {} <- {} tag {} ({} bytes)",
                            self.rank,
                            source,
                            tag,
                            envelope.payload.len()
                        );
                        return Ok(envelope);
                    }
                    pending.hold(envelope);
                }
            }
        }
    }
}

impl std::fmt::Debug for TcpGroup {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TcpGroup")
            .field("rank", &self.rank)
            .field("size", &self.size)
            .finish()
    }
}

/// Bind a listener with address reuse, so a restarted rank can rebind at once.
pub fn bind_listener(addr: SocketAddr, backlog: i32) -> io::Result<TcpListener> {
    let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
    socket.set_reuse_address(true)?;
    socket.bind(&addr.into())?;
    socket.listen(backlog)?;
    Ok(socket.into())
}

fn dial(addr: SocketAddr, config: &TcpGroupConfig) -> io::Result<TcpStream> {
    let attempts = config.connect_attempts.max(1);
    let mut last_err = None;
    for attempt in 1..=attempts {
        let socket = Socket::new(Domain::for_address(addr), Type::STREAM, Some(Protocol::TCP))?;
        match socket.connect_timeout(&addr.into(), config.connect_timeout) {
            Ok(()) => {
                let stream: TcpStream = socket.into();
                stream.set_nodelay(config.nodelay)?;
                return Ok(stream);
            }
            Err(e) => {
                log::trace!("[TCP] connect {} attempt {}/{}: {}", addr, attempt, attempts, e);
                last_err = Some(e);
                if attempt < attempts {
                    thread::sleep(config.connect_retry_delay);
                }
            }
        }
    }
    let err = last_err.unwrap_or_else(|| io::Error::new(io::ErrorKind::TimedOut, "no attempt"));
    log::warn!("[TCP] giving up on {} after {} attempts: {}", addr, attempts, err);
    Err(err)
}

fn handshake_error(reason: String) -> Error {
    log::error!("[TCP] handshake failed: {}", reason);
    Error::Exchange(ExchangeError::Transport(io::Error::new(
        io::ErrorKind::InvalidData,
        reason,
    )))
}

fn io_to_exchange(err: io::Error, peer: Rank) -> ExchangeError {
    match err.kind() {
        io::ErrorKind::UnexpectedEof
        | io::ErrorKind::ConnectionReset
        | io::ErrorKind::ConnectionAborted
        | io::ErrorKind::BrokenPipe => ExchangeError::Disconnected { peer },
        _ => ExchangeError::Transport(err),
    }
}

fn encode_handshake(rank: Rank, size: usize) -> SerResult<Vec<u8>> {
    let mut buf = vec![0u8; HANDSHAKE_LEN];
    let mut cursor = CursorMut::new(&mut buf);
    for byte in HANDSHAKE_MAGIC {
        cursor.write_u8(byte)?;
    }
    cursor.write_u8(HANDSHAKE_VERSION)?;
    cursor.write_u32_le(rank as u32)?;
    cursor.write_u32_le(size as u32)?;
    Ok(buf)
}

fn decode_handshake(body: &[u8]) -> SerResult<(Rank, usize)> {
    let mut cursor = Cursor::new(body);
    let mut magic = [0u8; 4];
    for byte in &mut magic {
        *byte = cursor.read_u8()?;
    }
    if magic != HANDSHAKE_MAGIC {
        return Err(SerError::InvalidData {
            offset: 0,
            reason: format!("bad handshake magic {:02x?}", magic),
        });
    }
    let version = cursor.read_u8()?;
    if version != HANDSHAKE_VERSION {
        return Err(SerError::InvalidData {
            offset: 4,
            reason: format!("unsupported handshake version {}", version),
        });
    }
    let rank = cursor.read_u32_le()? as Rank;
    let size = cursor.read_u32_le()? as usize;
    Ok((rank, size))
}

fn encode_envelope(tag: Tag, signature: u64, payload: &[u8]) -> SerResult<Vec<u8>> {
    let mut body = vec![0u8; ENVELOPE_HEADER_LEN + payload.len()];
    let mut cursor = CursorMut::new(&mut body[..ENVELOPE_HEADER_LEN]);
    cursor.write_u32_le(tag)?;
    cursor.write_u64_le(signature)?;
    body[ENVELOPE_HEADER_LEN..].copy_from_slice(payload);
    Ok(body)
}

fn decode_envelope(source: Rank, body: &[u8]) -> SerResult<Envelope> {
    let mut cursor = Cursor::new(body);
    let tag = cursor.read_u32_le()?;
    let signature = cursor.read_u64_le()?;
    Ok(Envelope {
        source,
        tag,
        signature,
        payload: body[ENVELOPE_HEADER_LEN..].to_vec(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loopback_listener() -> (TcpListener, SocketAddr) {
        let listener = bind_listener("127.0.0.1:0".parse().unwrap(), 16).unwrap();
        let addr = listener.local_addr().unwrap();
        (listener, addr)
    }

    #[test]
    fn test_envelope_body_layout() {
        let body = encode_envelope(3, 0xAABB, b"xyz").unwrap();
        assert_eq!(&body[..4], &3u32.to_le_bytes());
        assert_eq!(&body[4..12], &0xAABBu64.to_le_bytes());
        assert_eq!(&body[12..], b"xyz");

        let envelope = decode_envelope(2, &body).unwrap();
        assert_eq!(envelope.source, 2);
        assert_eq!(envelope.tag, 3);
        assert_eq!(envelope.signature, 0xAABB);
        assert_eq!(envelope.payload, b"xyz");
    }

    #[test]
    fn test_short_envelope_is_rejected() {
        assert!(matches!(
            decode_envelope(0, &[1, 2, 3]),
            Err(SerError::ReadFailed { .. })
        ));
    }

    #[test]
    fn test_handshake_rejects_foreign_magic() {
        let mut body = encode_handshake(1, 2).unwrap();
        assert_eq!(decode_handshake(&body).unwrap(), (1, 2));
        body[0] = b'X';
        assert!(matches!(
            decode_handshake(&body),
            Err(SerError::InvalidData { offset: 0, .. })
        ));
    }

    #[test]
    fn test_single_rank_group_uses_loopback() {
        let (listener, addr) = loopback_listener();
        let group = TcpGroup::with_listener(TcpGroupConfig::new(0, vec![addr]), listener).unwrap();
        assert_eq!(group.peer_addr(0), None);
        group.send_bytes(0, 1, 9, b"self").unwrap();
        let envelope = group.recv_bytes(0, 1).unwrap();
        assert_eq!(envelope.payload, b"self");
        assert_eq!(envelope.signature, 9);
    }

    #[test]
    fn test_two_rank_mesh_over_loopback() {
        let (l0, a0) = loopback_listener();
        let (l1, a1) = loopback_listener();
        let peers = vec![a0, a1];

        let peers0 = peers.clone();
        let rank0 = thread::spawn(move || {
            let group = TcpGroup::with_listener(TcpGroupConfig::new(0, peers0), l0).unwrap();
            let envelope = group.recv_bytes(1, 5).unwrap();
            group.send_bytes(1, 6, envelope.signature, &envelope.payload).unwrap();
            envelope.payload
        });

        let group = TcpGroup::with_listener(TcpGroupConfig::new(1, peers), l1).unwrap();
        assert_eq!(group.peer_addr(0), Some(a0));
        group.send_bytes(0, 5, 77, b"ping").unwrap();
        let echo = group.recv_bytes(0, 6).unwrap();
        assert_eq!(echo.payload, b"ping");
        assert_eq!(echo.signature, 77);
        assert_eq!(rank0.join().unwrap(), b"ping");
    }
}
