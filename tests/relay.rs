//! End-to-end scenarios driven over real loopback TCP sockets,
//! mirroring the direct-API-driving style of the teacher's own
//! `crates/service/tests/turn.rs`.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use bytes::BytesMut;
use codec::{ping, Command, GossipRecord, LogicalAddress, PhysicalAddress};
use gossip_server::acceptor;
use service::Router;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpStream;

async fn start_server() -> SocketAddr {
    let router = Router::new();
    let bind_addr = SocketAddr::new(IpAddr::V4(Ipv4Addr::LOCALHOST), 0);
    let listener = acceptor::bind_listener(bind_addr, 128).unwrap();
    let local_addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        let _ = acceptor::serve(listener, router, Duration::from_millis(0), None).await;
    });

    local_addr
}

async fn connect(server: SocketAddr) -> TcpStream {
    TcpStream::connect(server).await.unwrap()
}

async fn send(stream: &mut TcpStream, record: &GossipRecord) {
    let mut buf = BytesMut::new();
    record.encode(&mut buf);
    stream.write_all(&buf).await.unwrap();
}

/// Reads exactly one record off `stream`, growing the buffer until a
/// full record decodes. Panics (via `timeout`) if the peer never
/// sends enough bytes.
async fn recv(stream: &mut TcpStream) -> GossipRecord {
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Ok(Some((record, consumed))) = GossipRecord::decode(&buf) {
            buf.split_to(consumed);
            return record;
        }

        let size = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut chunk))
            .await
            .expect("timed out waiting for a reply")
            .unwrap();

        assert!(size > 0, "peer closed before sending a full record");
        buf.extend_from_slice(&chunk[..size]);
    }
}

/// Reads a `GOSSIP_GET` reply (a bare count + `PingData*` blob, not a
/// `GossipRecord`) off `stream`, growing the buffer until it decodes.
async fn recv_gossip_reply(stream: &mut TcpStream) -> Vec<ping::PingData> {
    let mut buf = BytesMut::new();
    let mut chunk = [0u8; 1024];

    loop {
        if let Ok(Some((members, consumed))) = ping::decode_reply(&buf) {
            buf.split_to(consumed);
            return members;
        }

        let size = tokio::time::timeout(Duration::from_secs(2), stream.read(&mut chunk))
            .await
            .expect("timed out waiting for a gossip reply")
            .unwrap();

        assert!(size > 0, "peer closed before sending a full reply");
        buf.extend_from_slice(&chunk[..size]);
    }
}

fn connect_record(group: &str, addr: LogicalAddress, name: Option<&str>) -> GossipRecord {
    let mut record = GossipRecord::new(Command::Connect);
    record.group = Some(group.to_string());
    record.addr = Some(addr);
    record.logical_name = name.map(str::to_string);
    record.physical = Some(PhysicalAddress("127.0.0.1:9000".parse().unwrap()));
    record
}

#[tokio::test]
async fn connect_then_disconnect_round_trips_ok_replies() {
    let server = start_server().await;
    let mut client = connect(server).await;

    let addr = LogicalAddress::from_bytes([1u8; 16]);
    send(&mut client, &connect_record("group-a", addr, Some("alice"))).await;
    let reply = recv(&mut client).await;
    assert_eq!(reply.command, Command::ConnectOk);
    assert_eq!(reply.addr, Some(addr));

    let mut disconnect = GossipRecord::new(Command::Disconnect);
    disconnect.group = Some("group-a".to_string());
    disconnect.addr = Some(addr);
    send(&mut client, &disconnect).await;

    let reply = recv(&mut client).await;
    assert_eq!(reply.command, Command::DisconnectOk);
}

#[tokio::test]
async fn unicast_message_reaches_only_the_addressed_peer() {
    let server = start_server().await;
    let mut alice = connect(server).await;
    let mut bob = connect(server).await;

    let alice_addr = LogicalAddress::from_bytes([1u8; 16]);
    let bob_addr = LogicalAddress::from_bytes([2u8; 16]);

    send(&mut alice, &connect_record("group-a", alice_addr, Some("alice"))).await;
    recv(&mut alice).await;
    send(&mut bob, &connect_record("group-a", bob_addr, Some("bob"))).await;
    recv(&mut bob).await;

    let mut message = GossipRecord::new(Command::Message);
    message.group = Some("group-a".to_string());
    message.addr = Some(bob_addr);
    message.payload = Some(bytes::Bytes::from_static(b"hi bob"));
    send(&mut alice, &message).await;

    let received = recv(&mut bob).await;
    assert_eq!(received.command, Command::Message);
    assert_eq!(received.payload.as_deref(), Some(&b"hi bob"[..]));
}

#[tokio::test]
async fn broadcast_message_excludes_the_sender() {
    let server = start_server().await;
    let mut alice = connect(server).await;
    let mut bob = connect(server).await;

    let alice_addr = LogicalAddress::from_bytes([1u8; 16]);
    let bob_addr = LogicalAddress::from_bytes([2u8; 16]);

    send(&mut alice, &connect_record("group-a", alice_addr, Some("alice"))).await;
    recv(&mut alice).await;
    send(&mut bob, &connect_record("group-a", bob_addr, Some("bob"))).await;
    recv(&mut bob).await;

    let mut message = GossipRecord::new(Command::Message);
    message.group = Some("group-a".to_string());
    message.payload = Some(bytes::Bytes::from_static(b"hello everyone"));
    send(&mut alice, &message).await;

    let received = recv(&mut bob).await;
    assert_eq!(received.payload.as_deref(), Some(&b"hello everyone"[..]));
}

#[tokio::test]
async fn gossip_get_replies_with_a_ping_data_per_member() {
    let server = start_server().await;
    let mut alice = connect(server).await;
    let mut bob = connect(server).await;

    let alice_addr = LogicalAddress::from_bytes([1u8; 16]);
    let bob_addr = LogicalAddress::from_bytes([2u8; 16]);

    send(&mut alice, &connect_record("group-a", alice_addr, Some("alice"))).await;
    recv(&mut alice).await;
    send(&mut bob, &connect_record("group-a", bob_addr, Some("bob"))).await;
    recv(&mut bob).await;

    let mut query = GossipRecord::new(Command::GossipGet);
    query.group = Some("group-a".to_string());
    send(&mut alice, &query).await;

    let members = recv_gossip_reply(&mut alice).await;
    assert_eq!(members.len(), 2);
    assert!(members.iter().all(|m| m.is_server));

    let seen_addrs: Vec<_> = members.iter().map(|m| m.logical_addr).collect();
    assert!(seen_addrs.contains(&alice_addr));
    assert!(seen_addrs.contains(&bob_addr));

    let bob_entry = members.iter().find(|m| m.logical_addr == bob_addr).unwrap();
    assert_eq!(bob_entry.logical_name.as_deref(), Some("bob"));
    assert!(bob_entry.physical_addr.is_some());
}

#[tokio::test]
async fn message_with_empty_payload_is_dropped_silently() {
    let server = start_server().await;
    let mut alice = connect(server).await;
    let mut bob = connect(server).await;

    let alice_addr = LogicalAddress::from_bytes([1u8; 16]);
    let bob_addr = LogicalAddress::from_bytes([2u8; 16]);

    send(&mut alice, &connect_record("group-a", alice_addr, Some("alice"))).await;
    recv(&mut alice).await;
    send(&mut bob, &connect_record("group-a", bob_addr, Some("bob"))).await;
    recv(&mut bob).await;

    let mut empty = GossipRecord::new(Command::Message);
    empty.group = Some("group-a".to_string());
    empty.addr = Some(bob_addr);
    empty.payload = Some(bytes::Bytes::new());
    send(&mut alice, &empty).await;

    let mut followup = GossipRecord::new(Command::Message);
    followup.group = Some("group-a".to_string());
    followup.addr = Some(bob_addr);
    followup.payload = Some(bytes::Bytes::from_static(b"hi bob"));
    send(&mut alice, &followup).await;

    // If the empty-payload message had been relayed, this would be the
    // first of two records sitting in bob's socket buffer rather than
    // the only one.
    let received = recv(&mut bob).await;
    assert_eq!(received.payload.as_deref(), Some(&b"hi bob"[..]));
}

#[tokio::test]
async fn graceful_close_does_not_suspect_remaining_group_members() {
    let server = start_server().await;
    let mut alice = connect(server).await;
    let mut bob = connect(server).await;

    let alice_addr = LogicalAddress::from_bytes([1u8; 16]);
    let bob_addr = LogicalAddress::from_bytes([2u8; 16]);

    send(&mut alice, &connect_record("group-a", alice_addr, Some("alice"))).await;
    recv(&mut alice).await;
    send(&mut bob, &connect_record("group-a", bob_addr, Some("bob"))).await;
    recv(&mut bob).await;

    send(&mut alice, &GossipRecord::new(Command::Close)).await;
    drop(alice);

    // Give the server time to tear alice's session down, then have bob
    // unicast itself: if a SUSPECT record had been queued ahead of it,
    // this would be the second record waiting rather than the first.
    let mut message = GossipRecord::new(Command::Message);
    message.group = Some("group-a".to_string());
    message.addr = Some(bob_addr);
    message.payload = Some(bytes::Bytes::from_static(b"still here"));
    tokio::time::sleep(Duration::from_millis(100)).await;
    send(&mut bob, &message).await;

    let received = recv(&mut bob).await;
    assert_eq!(received.command, Command::Message);
    assert_eq!(received.payload.as_deref(), Some(&b"still here"[..]));
}

#[tokio::test]
async fn reconnecting_on_the_same_address_evicts_the_prior_session() {
    let server = start_server().await;
    let addr = LogicalAddress::from_bytes([1u8; 16]);

    let mut first = connect(server).await;
    send(&mut first, &connect_record("group-a", addr, Some("alice"))).await;
    recv(&mut first).await;

    let mut second = connect(server).await;
    send(&mut second, &connect_record("group-a", addr, Some("alice"))).await;
    recv(&mut second).await;

    // The first connection's socket should observe EOF once the
    // server forcibly closes it in favor of the second.
    let mut buf = [0u8; 16];
    let size = tokio::time::timeout(Duration::from_secs(2), first.read(&mut buf))
        .await
        .expect("timed out waiting for the stale session to close")
        .unwrap();
    assert_eq!(size, 0);
}

#[tokio::test]
async fn malformed_command_byte_closes_the_connection_without_panicking() {
    let server = start_server().await;
    let mut client = connect(server).await;

    client.write_all(&[250]).await.unwrap();

    let mut buf = [0u8; 16];
    let size = tokio::time::timeout(Duration::from_secs(2), client.read(&mut buf))
        .await
        .expect("timed out waiting for the connection to close")
        .unwrap();
    assert_eq!(size, 0);
}
