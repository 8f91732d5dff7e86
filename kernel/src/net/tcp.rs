// SPDX-License-Identifier: GPL-2.0

//! Minimal RFC 793 TCP: connection state machine, segment encode/decode,
//! and a real three-way handshake layered over the kernel's existing
//! loopback-backed network stack.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU16, AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::network::{self, Ipv4Address, ProtocolType};
use crate::sync::Spinlock;

const FLAG_FIN: u8 = 0x01;
const FLAG_SYN: u8 = 0x02;
const FLAG_RST: u8 = 0x04;
const FLAG_PSH: u8 = 0x08;
const FLAG_ACK: u8 = 0x10;

const HEADER_LEN: usize = 20;
const RECEIVE_BUFFER_CAP: usize = 4096;
const MAX_HANDSHAKE_RETRIES: u32 = 5;
const MAX_CLOSE_RETRIES: u32 = 3;
const EPHEMERAL_PORT_START: u16 = 49152;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TcpState {
	Closed,
	Listen,
	SynSent,
	SynReceived,
	Established,
	FinWait1,
	FinWait2,
	CloseWait,
	Closing,
	LastAck,
	TimeWait,
}

pub struct TcpConnection {
	pub local_ip: Ipv4Address,
	pub remote_ip: Ipv4Address,
	pub local_port: u16,
	pub remote_port: u16,
	pub state: TcpState,
	pub snd_nxt: u32,
	pub rcv_nxt: u32,
	pub window: u16,
	receive_buffer: VecDeque<u8>,
}

struct TcpHeader {
	src_port: u16,
	dst_port: u16,
	seq: u32,
	ack: u32,
	flags: u8,
	window: u16,
}

fn encode_segment(header: &TcpHeader, payload: &[u8]) -> Vec<u8> {
	let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
	buf.extend_from_slice(&header.src_port.to_be_bytes());
	buf.extend_from_slice(&header.dst_port.to_be_bytes());
	buf.extend_from_slice(&header.seq.to_be_bytes());
	buf.extend_from_slice(&header.ack.to_be_bytes());
	buf.push(5 << 4); // data offset: 5 32-bit words, no options
	buf.push(header.flags);
	buf.extend_from_slice(&header.window.to_be_bytes());
	buf.extend_from_slice(&[0u8, 0u8]); // checksum placeholder
	buf.extend_from_slice(&[0u8, 0u8]); // urgent pointer
	buf.extend_from_slice(payload);

	let checksum = network::utils::calculate_checksum(&buf);
	buf[16] = (checksum >> 8) as u8;
	buf[17] = (checksum & 0xFF) as u8;
	buf
}

fn decode_segment(bytes: &[u8]) -> Option<(TcpHeader, &[u8])> {
	if bytes.len() < HEADER_LEN {
		return None;
	}
	let data_offset = ((bytes[12] >> 4) as usize) * 4;
	if data_offset < HEADER_LEN || bytes.len() < data_offset {
		return None;
	}
	let header = TcpHeader {
		src_port: u16::from_be_bytes(bytes[0..2].try_into().unwrap()),
		dst_port: u16::from_be_bytes(bytes[2..4].try_into().unwrap()),
		seq: u32::from_be_bytes(bytes[4..8].try_into().unwrap()),
		ack: u32::from_be_bytes(bytes[8..12].try_into().unwrap()),
		flags: bytes[13],
		window: u16::from_be_bytes(bytes[14..16].try_into().unwrap()),
	};
	Some((header, &bytes[data_offset..]))
}

static CONNECTIONS: Spinlock<BTreeMap<u64, TcpConnection>> = Spinlock::new(BTreeMap::new());
static LISTENERS: Spinlock<BTreeMap<u16, VecDeque<u64>>> = Spinlock::new(BTreeMap::new());
static NEXT_CONN_ID: AtomicU64 = AtomicU64::new(1);
static NEXT_EPHEMERAL_PORT: AtomicU16 = AtomicU16::new(EPHEMERAL_PORT_START);

pub fn init() -> Result<()> {
	CONNECTIONS.lock().clear();
	LISTENERS.lock().clear();
	Ok(())
}

fn alloc_ephemeral_port() -> u16 {
	let port = NEXT_EPHEMERAL_PORT.fetch_add(1, Ordering::Relaxed);
	if port == 0 {
		NEXT_EPHEMERAL_PORT.store(EPHEMERAL_PORT_START, Ordering::Relaxed);
		EPHEMERAL_PORT_START
	} else {
		port
	}
}

fn initial_seq() -> u32 {
	crate::time::get_time_ns() as u32
}

fn send_segment(
	local_port: u16,
	remote_port: u16,
	remote_ip: Ipv4Address,
	seq: u32,
	ack: u32,
	flags: u8,
	window: u16,
	payload: &[u8],
) -> Result<()> {
	let header = TcpHeader {
		src_port: local_port,
		dst_port: remote_port,
		seq,
		ack,
		flags,
		window,
	};
	let segment = encode_segment(&header, payload);
	network::send_packet(remote_ip, &segment, ProtocolType::TCP)
}

/// Drain whatever the network stack has queued and feed every TCP
/// segment through the state machine. Connect/accept/recv all call this
/// before inspecting connection state, mirroring the bounded-polling
/// idiom the rest of this kernel uses in place of real interrupts.
pub fn poll_incoming() {
	let mut stack_opt = network::NETWORK_STACK.lock();
	let Some(stack) = stack_opt.as_mut() else {
		return;
	};
	let Ok(packets) = stack.receive_and_handle_packets() else {
		return;
	};
	drop(stack_opt);

	for packet in packets {
		if packet.protocol() != ProtocolType::TCP {
			continue;
		}
		if let Some((header, payload)) = decode_segment(packet.data()) {
			handle_segment(packet.source_ip(), header, payload);
		}
	}
}

fn handle_segment(remote_ip: Option<Ipv4Address>, header: TcpHeader, payload: &[u8]) {
	let mut conns = CONNECTIONS.lock();
	if let Some((&id, conn)) = conns
		.iter_mut()
		.find(|(_, c)| c.local_port == header.dst_port && c.remote_port == header.src_port)
	{
		match conn.state {
			TcpState::SynSent => {
				if header.flags & (FLAG_SYN | FLAG_ACK) == (FLAG_SYN | FLAG_ACK) && header.ack == conn.snd_nxt {
					conn.rcv_nxt = header.seq.wrapping_add(1);
					conn.state = TcpState::Established;
					let (local_port, remote_port, remote_ip, snd_nxt, rcv_nxt, window) =
						(conn.local_port, conn.remote_port, conn.remote_ip, conn.snd_nxt, conn.rcv_nxt, conn.window);
					drop(conns);
					let _ = send_segment(local_port, remote_port, remote_ip, snd_nxt, rcv_nxt, FLAG_ACK, window, &[]);
				}
			}
			TcpState::SynReceived => {
				if header.flags & FLAG_ACK != 0 && header.ack == conn.snd_nxt {
					conn.state = TcpState::Established;
					let local_port = conn.local_port;
					drop(conns);
					LISTENERS.lock().entry(local_port).or_default().push_back(id);
				}
			}
			TcpState::Established => {
				if !payload.is_empty() {
					for &b in payload {
						if conn.receive_buffer.len() < RECEIVE_BUFFER_CAP {
							conn.receive_buffer.push_back(b);
						}
					}
					conn.rcv_nxt = header.seq.wrapping_add(payload.len() as u32);
				}
				if header.flags & FLAG_FIN != 0 {
					conn.rcv_nxt = conn.rcv_nxt.wrapping_add(1);
					conn.state = TcpState::CloseWait;
					let (local_port, remote_port, remote_ip, snd_nxt, rcv_nxt, window) =
						(conn.local_port, conn.remote_port, conn.remote_ip, conn.snd_nxt, conn.rcv_nxt, conn.window);
					drop(conns);
					let _ = send_segment(local_port, remote_port, remote_ip, snd_nxt, rcv_nxt, FLAG_ACK, window, &[]);
				}
			}
			TcpState::FinWait1 => {
				if header.flags & (FLAG_FIN | FLAG_ACK) == (FLAG_FIN | FLAG_ACK) {
					conn.state = TcpState::TimeWait;
				} else if header.flags & FLAG_ACK != 0 {
					conn.state = TcpState::FinWait2;
				}
			}
			TcpState::FinWait2 => {
				if header.flags & FLAG_FIN != 0 {
					conn.state = TcpState::TimeWait;
				}
			}
			TcpState::LastAck => {
				if header.flags & FLAG_ACK != 0 {
					conn.state = TcpState::Closed;
				}
			}
			_ => {}
		}
		return;
	}
	drop(conns);

	// No matching connection: a bare SYN to a listening port starts a
	// new passive-open connection.
	if header.flags & FLAG_SYN != 0 && header.flags & FLAG_ACK == 0 {
		let listening = LISTENERS.lock().contains_key(&header.dst_port);
		if listening {
			let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
			let isn = initial_seq();
			let conn = TcpConnection {
				local_ip: Ipv4Address::localhost(),
				remote_ip: remote_ip.unwrap_or(Ipv4Address::localhost()),
				local_port: header.dst_port,
				remote_port: header.src_port,
				state: TcpState::SynReceived,
				snd_nxt: isn.wrapping_add(1),
				rcv_nxt: header.seq.wrapping_add(1),
				window: RECEIVE_BUFFER_CAP as u16,
				receive_buffer: VecDeque::new(),
			};
			let remote_ip = conn.remote_ip;
			CONNECTIONS.lock().insert(id, conn);
			let _ = send_segment(
				header.dst_port,
				header.src_port,
				remote_ip,
				isn,
				header.seq.wrapping_add(1),
				FLAG_SYN | FLAG_ACK,
				RECEIVE_BUFFER_CAP as u16,
				&[],
			);
		}
	}
}

/// Active open: allocate an ephemeral local port, send a SYN, and drive
/// the handshake with bounded retries. Fails with `Timeout` rather than
/// ever assuming `Established` without a matching SYN-ACK.
pub fn connect(remote_ip: Ipv4Address, remote_port: u16) -> Result<u64> {
	let local_port = alloc_ephemeral_port();
	let isn = initial_seq();
	let id = NEXT_CONN_ID.fetch_add(1, Ordering::Relaxed);
	CONNECTIONS.lock().insert(
		id,
		TcpConnection {
			local_ip: Ipv4Address::localhost(),
			remote_ip,
			local_port,
			remote_port,
			state: TcpState::SynSent,
			snd_nxt: isn.wrapping_add(1),
			rcv_nxt: 0,
			window: RECEIVE_BUFFER_CAP as u16,
			receive_buffer: VecDeque::new(),
		},
	);

	for _ in 0..MAX_HANDSHAKE_RETRIES {
		send_segment(local_port, remote_port, remote_ip, isn, 0, FLAG_SYN, RECEIVE_BUFFER_CAP as u16, &[])?;
		poll_incoming();
		if matches!(CONNECTIONS.lock().get(&id).map(|c| c.state), Some(TcpState::Established)) {
			return Ok(id);
		}
	}

	CONNECTIONS.lock().remove(&id);
	Err(Error::Timeout)
}

/// Mark `port` as accepting connections.
pub fn listen(port: u16) -> Result<()> {
	LISTENERS.lock().entry(port).or_default();
	Ok(())
}

/// Pop the next fully-established connection for `port`. Non-blocking:
/// `WouldBlock` means no connection is ready yet.
pub fn accept(port: u16) -> Result<u64> {
	poll_incoming();
	let mut listeners = LISTENERS.lock();
	let queue = listeners.get_mut(&port).ok_or(Error::NotFound)?;
	queue.pop_front().ok_or(Error::WouldBlock)
}

pub fn send(conn_id: u64, data: &[u8]) -> Result<usize> {
	let mut conns = CONNECTIONS.lock();
	let conn = conns.get_mut(&conn_id).ok_or(Error::NotFound)?;
	if conn.state != TcpState::Established {
		return Err(Error::InvalidState);
	}
	let (local_port, remote_port, remote_ip, seq, ack, window) =
		(conn.local_port, conn.remote_port, conn.remote_ip, conn.snd_nxt, conn.rcv_nxt, conn.window);
	conn.snd_nxt = conn.snd_nxt.wrapping_add(data.len() as u32);
	drop(conns);
	send_segment(local_port, remote_port, remote_ip, seq, ack, FLAG_PSH | FLAG_ACK, window, data)?;
	Ok(data.len())
}

pub fn recv(conn_id: u64, buf: &mut [u8]) -> Result<usize> {
	poll_incoming();
	let mut conns = CONNECTIONS.lock();
	let conn = conns.get_mut(&conn_id).ok_or(Error::NotFound)?;
	if conn.receive_buffer.is_empty() {
		return match conn.state {
			TcpState::Established | TcpState::FinWait1 | TcpState::FinWait2 => Err(Error::WouldBlock),
			_ => Ok(0),
		};
	}
	let mut n = 0;
	while n < buf.len() {
		match conn.receive_buffer.pop_front() {
			Some(b) => {
				buf[n] = b;
				n += 1;
			}
			None => break,
		}
	}
	Ok(n)
}

/// Graceful close: send FIN and drive a bounded number of retries
/// toward `TimeWait`/`Closed`, then drop the connection regardless (this
/// teaching stack has no timer-driven `TimeWait` expiry).
pub fn close(conn_id: u64) -> Result<()> {
	let mut conns = CONNECTIONS.lock();
	let Some(conn) = conns.get_mut(&conn_id) else {
		return Ok(());
	};
	let (local_port, remote_port, remote_ip, seq, ack, window) =
		(conn.local_port, conn.remote_port, conn.remote_ip, conn.snd_nxt, conn.rcv_nxt, conn.window);

	match conn.state {
		TcpState::Established => conn.state = TcpState::FinWait1,
		TcpState::CloseWait => conn.state = TcpState::LastAck,
		_ => {}
	}
	drop(conns);

	send_segment(local_port, remote_port, remote_ip, seq, ack, FLAG_FIN | FLAG_ACK, window, &[])?;
	for _ in 0..MAX_CLOSE_RETRIES {
		poll_incoming();
		let done = matches!(
			CONNECTIONS.lock().get(&conn_id).map(|c| c.state),
			Some(TcpState::TimeWait) | Some(TcpState::Closed) | None
		);
		if done {
			break;
		}
	}
	CONNECTIONS.lock().remove(&conn_id);
	Ok(())
}

pub fn state_of(conn_id: u64) -> Option<TcpState> {
	CONNECTIONS.lock().get(&conn_id).map(|c| c.state)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn segment_round_trips_header_and_payload() {
		let header = TcpHeader {
			src_port: 1234,
			dst_port: 80,
			seq: 100,
			ack: 0,
			flags: FLAG_SYN,
			window: 4096,
		};
		let encoded = encode_segment(&header, b"hi");
		let (decoded, payload) = decode_segment(&encoded).unwrap();
		assert_eq!(decoded.src_port, 1234);
		assert_eq!(decoded.dst_port, 80);
		assert_eq!(decoded.seq, 100);
		assert_eq!(decoded.flags, FLAG_SYN);
		assert_eq!(payload, b"hi");
	}

	#[test]
	fn connect_without_peer_times_out() {
		init().unwrap();
		let result = connect(Ipv4Address::new(10, 0, 0, 5), 9999);
		assert_eq!(result.err(), Some(Error::Timeout));
	}
}
