//! Per-connection task: reads [`GossipRecord`]s off the socket,
//! dispatches them against the shared [`Router`], and drains its own
//! mailbox back onto the same socket.
//!
//! Grounded on the accept-loop/`tokio::select!` shape of the teacher's
//! transport listener: one task per accepted socket, a single
//! `select!` combining the socket read with the session's outbound
//! channel so writes from a relay and writes from this session's own
//! replies never interleave.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::BytesMut;
use codec::{Command, Error as CodecError, GossipRecord, LogicalAddress, PingData};
use service::{PeerHandle, Router};
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;
use tokio::sync::mpsc::unbounded_channel;

use crate::outbox::{ChannelOutbox, Mail};

const READ_CHUNK: usize = 4096;
const MAX_RECORD_BYTES: usize = 1 << 20;

pub fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_millis() as u64)
        .unwrap_or(0)
}

/// Per-session state tracked for the lifetime of one accepted socket.
/// `current_group` and `current_addr` record the identity this
/// session most recently registered under a successful `CONNECT`, and
/// are what a bare `DISCONNECT`/`MESSAGE` without an explicit address
/// falls back to.
struct SessionState {
    peer: Arc<PeerHandle>,
    router: Router,
    current_group: Option<String>,
    current_addr: Option<LogicalAddress>,
}

impl SessionState {
    fn handle(&mut self, record: GossipRecord, out: &mut BytesMut) {
        match record.command {
            Command::Connect => self.handle_connect(record, out),
            Command::Disconnect => self.handle_disconnect(record, out),
            Command::GossipGet => self.handle_gossip_get(record, out),
            Command::Message => self.handle_message(record),
            Command::Ping => {}
            Command::Close => {
                self.router.close_gracefully(&self.peer);
            }
            Command::Suspect | Command::ConnectOk | Command::OpFail | Command::DisconnectOk => {
                // Server-to-client-only records; a client sending one
                // back is a protocol violation we simply ignore rather
                // than tear the connection down over.
            }
        }
    }

    fn handle_connect(&mut self, record: GossipRecord, out: &mut BytesMut) {
        let (Some(group), Some(addr)) = (record.group.clone(), record.addr) else {
            GossipRecord::new(Command::OpFail).encode(out);
            return;
        };

        // Existing-connection check: a prior session squatting on this
        // (group, addr) slot is forcibly closed before the new one
        // takes its place.
        if let Some(existing) = self.router.routing.find(&group, &addr) {
            if !Arc::ptr_eq(&existing, &self.peer) {
                self.router.close(&existing);
            }
        }

        self.router.routing.add(&group, addr, self.peer.clone());

        if let Some(physical) = record.physical {
            self.router.addresses.set(addr, physical);
        }

        if let Some(name) = record.logical_name.clone() {
            self.router.names.set(&name, addr);
            self.peer.set_logical_name(Some(name));
        }

        // Only after every fallible registration step above has
        // actually succeeded does the address become part of this
        // peer's own bookkeeping — `close()` only ever unwinds state
        // that was fully committed.
        self.peer.add_logical_address(addr);
        self.peer.note_group(&group);
        self.current_group = Some(group.clone());
        self.current_addr = Some(addr);

        let mut ok = GossipRecord::new(Command::ConnectOk);
        ok.group = Some(group);
        ok.addr = Some(addr);
        ok.encode(out);
    }

    fn handle_disconnect(&mut self, record: GossipRecord, out: &mut BytesMut) {
        let group = record.group.or_else(|| self.current_group.clone());
        let addr = record.addr.or(self.current_addr);

        match (group, addr) {
            (Some(group), Some(addr)) => {
                self.router.routing.remove(&group, &addr);
                GossipRecord::new(Command::DisconnectOk).encode(out);
            }
            _ => GossipRecord::new(Command::OpFail).encode(out),
        }
    }

    /// Replies with the `GOSSIP_GET` directory blob directly, not a
    /// `GossipRecord`: a 16-bit member count followed by one
    /// `PingData` per member of the queried group.
    fn handle_gossip_get(&mut self, record: GossipRecord, out: &mut BytesMut) {
        let Some(group) = record.group else {
            GossipRecord::new(Command::OpFail).encode(out);
            return;
        };

        let members: Vec<PingData> = self
            .router
            .routing
            .members_with_addr(&group)
            .into_iter()
            .map(|(addr, member)| PingData {
                logical_addr: addr,
                is_server: true,
                logical_name: member.logical_name(),
                physical_addr: self.router.addresses.get(&addr),
            })
            .collect();

        codec::ping::encode_reply(out, &members);
    }

    fn handle_message(&mut self, record: GossipRecord) {
        let Some(group) = record.group.clone() else {
            return;
        };

        if record.payload.as_ref().is_none_or(|p| p.is_empty()) {
            log::debug!("dropping MESSAGE with empty payload for group {group}");
            return;
        }

        match record.addr {
            Some(addr) => service::relay::unicast(&self.router.routing, &group, &addr, record),
            None => service::relay::multicast(&self.router.routing, &group, Some(&self.peer), &record),
        }
    }
}

pub struct SessionOptions {
    pub id: u64,
    pub source: SocketAddr,
    pub interface: SocketAddr,
    pub solinger: Duration,
    pub sotimeout: Option<Duration>,
}

pub async fn run(socket: TcpStream, router: Router, options: SessionOptions) {
    let SessionOptions {
        id,
        source,
        interface,
        solinger,
        sotimeout,
    } = options;

    if let Err(e) = apply_socket_options(&socket, solinger) {
        log::warn!("failed to apply socket options for {source}: {e}");
    }

    let (mail_tx, mut mail_rx) = unbounded_channel::<Mail>();
    let peer = PeerHandle::new(id, Box::new(ChannelOutbox::new(mail_tx)), now_ms());

    let mut state = SessionState {
        peer: peer.clone(),
        router: router.clone(),
        current_group: None,
        current_addr: None,
    };

    log::info!("session {id} accepted from {source} on {interface}");

    let (mut read_half, mut write_half) = socket.into_split();
    let mut buffer = BytesMut::with_capacity(READ_CHUNK);
    let mut read_chunk = [0u8; READ_CHUNK];

    'session: loop {
        let read_outcome = async {
            match sotimeout {
                Some(timeout) => tokio::time::timeout(timeout, read_half.read(&mut read_chunk)).await,
                None => Ok(read_half.read(&mut read_chunk).await),
            }
        };

        tokio::select! {
            outcome = read_outcome => {
                let result = match outcome {
                    Err(_) => {
                        log::info!("session {id} idle read timeout, closing");
                        break 'session;
                    }
                    Ok(result) => result,
                };

                let size = match result {
                    Ok(0) => {
                        log::info!("session {id} closed by peer");
                        router.close_gracefully(&peer);
                        break 'session;
                    }
                    Ok(size) => size,
                    Err(e) => {
                        log::warn!("session {id} read error: {e}");
                        break 'session;
                    }
                };

                buffer.extend_from_slice(&read_chunk[..size]);

                loop {
                    if buffer.len() > MAX_RECORD_BYTES {
                        log::warn!("session {id} exceeded max record size, closing");
                        break 'session;
                    }

                    match GossipRecord::decode(&buffer) {
                        Ok(None) => break,
                        Ok(Some((record, consumed))) => {
                            let _ = buffer.split_to(consumed);
                            peer.touch(now_ms());

                            let mut out = BytesMut::new();
                            state.handle(record, &mut out);

                            if !out.is_empty() && write_half.write_all(&out).await.is_err() {
                                log::warn!("session {id} write error, closing");
                                break 'session;
                            }
                        }
                        Err(CodecError::Incomplete) => break,
                        Err(e) => {
                            log::warn!("session {id} malformed record: {e}");
                            break 'session;
                        }
                    }
                }
            }

            mail = mail_rx.recv() => {
                match mail {
                    Some(Mail::Record(record)) => {
                        let mut out = BytesMut::new();
                        record.encode(&mut out);
                        if write_half.write_all(&out).await.is_err() {
                            log::warn!("session {id} write error, closing");
                            break 'session;
                        }
                    }
                    Some(Mail::Shutdown) | None => {
                        break 'session;
                    }
                }
            }
        }
    }

    router.close(&peer);
    let _ = write_half.shutdown().await;
    log::info!("session {id} torn down");
}

fn apply_socket_options(socket: &TcpStream, solinger: Duration) -> std::io::Result<()> {
    socket.set_nodelay(true)?;
    let socket2 = socket2::SockRef::from(socket);
    socket2.set_linger(Some(solinger))?;
    Ok(())
}
