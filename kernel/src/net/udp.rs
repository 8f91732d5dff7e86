// SPDX-License-Identifier: GPL-2.0

//! UDP datagram send/receive, filtered by destination port.

use alloc::collections::{BTreeMap, VecDeque};
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::network::{self, Ipv4Address, ProtocolType};
use crate::sync::Spinlock;

const HEADER_LEN: usize = 8;
const MAX_QUEUED_DATAGRAMS: usize = 64;

pub struct Datagram {
	pub source_ip: Ipv4Address,
	pub source_port: u16,
	pub data: Vec<u8>,
}

static INBOX: Spinlock<BTreeMap<u16, VecDeque<Datagram>>> = Spinlock::new(BTreeMap::new());

pub fn init() -> Result<()> {
	INBOX.lock().clear();
	Ok(())
}

fn encode(src_port: u16, dst_port: u16, payload: &[u8]) -> Vec<u8> {
	let mut buf = Vec::with_capacity(HEADER_LEN + payload.len());
	buf.extend_from_slice(&src_port.to_be_bytes());
	buf.extend_from_slice(&dst_port.to_be_bytes());
	buf.extend_from_slice(&((HEADER_LEN + payload.len()) as u16).to_be_bytes());
	buf.extend_from_slice(&[0u8, 0u8]); // checksum: not computed, UDP checksum is optional over IPv4
	buf.extend_from_slice(payload);
	buf
}

fn decode(bytes: &[u8]) -> Option<(u16, u16, &[u8])> {
	if bytes.len() < HEADER_LEN {
		return None;
	}
	let src_port = u16::from_be_bytes(bytes[0..2].try_into().unwrap());
	let dst_port = u16::from_be_bytes(bytes[2..4].try_into().unwrap());
	Some((src_port, dst_port, &bytes[HEADER_LEN..]))
}

/// Drain the network stack's unhandled-packet queue and file every UDP
/// datagram into the per-port inbox.
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
		if packet.protocol() != ProtocolType::UDP {
			continue;
		}
		if let Some((src_port, dst_port, payload)) = decode(packet.data()) {
			let mut inbox = INBOX.lock();
			let queue = inbox.entry(dst_port).or_default();
			if queue.len() < MAX_QUEUED_DATAGRAMS {
				queue.push_back(Datagram {
					source_ip: packet.source_ip().unwrap_or(Ipv4Address::localhost()),
					source_port: src_port,
					data: payload.to_vec(),
				});
			}
		}
	}
}

pub fn bind(port: u16) -> Result<()> {
	INBOX.lock().entry(port).or_default();
	Ok(())
}

pub fn send_to(local_port: u16, dest_ip: Ipv4Address, dest_port: u16, data: &[u8]) -> Result<usize> {
	let segment = encode(local_port, dest_port, data);
	network::send_packet(dest_ip, &segment, ProtocolType::UDP)?;
	Ok(data.len())
}

/// Non-blocking receive: `WouldBlock` when nothing is queued for `port`.
pub fn recv_from(port: u16, buf: &mut [u8]) -> Result<(usize, Ipv4Address, u16)> {
	poll_incoming();
	let mut inbox = INBOX.lock();
	let queue = inbox.get_mut(&port).ok_or(Error::NotFound)?;
	let datagram = queue.pop_front().ok_or(Error::WouldBlock)?;
	let n = datagram.data.len().min(buf.len());
	buf[..n].copy_from_slice(&datagram.data[..n]);
	Ok((n, datagram.source_ip, datagram.source_port))
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn segment_round_trips() {
		let encoded = encode(1234, 53, b"query");
		let (src, dst, payload) = decode(&encoded).unwrap();
		assert_eq!(src, 1234);
		assert_eq!(dst, 53);
		assert_eq!(payload, b"query");
	}

	#[test]
	fn recv_without_datagrams_would_block() {
		init().unwrap();
		bind(4000).unwrap();
		let mut buf = [0u8; 16];
		assert_eq!(recv_from(4000, &mut buf).err(), Some(Error::WouldBlock));
	}
}
