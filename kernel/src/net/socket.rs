// SPDX-License-Identifier: GPL-2.0

//! Socket ABI: `socket/bind/listen/connect/accept/send/recv/setsockopt/
//! getsockopt/close`, dispatching Stream sockets onto [`super::tcp`] and
//! Dgram sockets onto [`super::udp`].

use alloc::collections::BTreeMap;
use core::sync::atomic::{AtomicI32, Ordering};

use crate::error::{Error, Result};
use crate::network::Ipv4Address;
use crate::sync::Spinlock;

use super::{tcp, udp};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SocketType {
	Stream,
	Dgram,
	Raw,
}

enum SocketData {
	Tcp(u64),
	Udp,
	None,
}

struct Socket {
	socket_type: SocketType,
	local_ip: Ipv4Address,
	local_port: u16,
	remote_ip: Ipv4Address,
	remote_port: u16,
	bound: bool,
	connected: bool,
	data: SocketData,
}

const FIRST_FD: i32 = 3;

static SOCKETS: Spinlock<BTreeMap<i32, Socket>> = Spinlock::new(BTreeMap::new());
static NEXT_FD: AtomicI32 = AtomicI32::new(FIRST_FD);

pub fn init() -> Result<()> {
	SOCKETS.lock().clear();
	NEXT_FD.store(FIRST_FD, Ordering::Relaxed);
	Ok(())
}

pub fn socket(socket_type: SocketType) -> Result<i32> {
	let fd = NEXT_FD.fetch_add(1, Ordering::Relaxed);
	SOCKETS.lock().insert(
		fd,
		Socket {
			socket_type,
			local_ip: Ipv4Address::any(),
			local_port: 0,
			remote_ip: Ipv4Address::any(),
			remote_port: 0,
			bound: false,
			connected: false,
			data: SocketData::None,
		},
	);
	Ok(fd)
}

pub fn bind(fd: i32, ip: Ipv4Address, port: u16) -> Result<()> {
	let mut sockets = SOCKETS.lock();
	let socket = sockets.get_mut(&fd).ok_or(Error::EBADF)?;
	if socket.socket_type == SocketType::Dgram {
		udp::bind(port)?;
	}
	socket.local_ip = ip;
	socket.local_port = port;
	socket.bound = true;
	Ok(())
}

pub fn listen(fd: i32) -> Result<()> {
	let sockets = SOCKETS.lock();
	let socket = sockets.get(&fd).ok_or(Error::EBADF)?;
	if socket.socket_type != SocketType::Stream {
		return Err(Error::InvalidOperation);
	}
	let port = socket.local_port;
	drop(sockets);
	tcp::listen(port)
}

pub fn connect(fd: i32, ip: Ipv4Address, port: u16) -> Result<()> {
	let mut sockets = SOCKETS.lock();
	let socket = sockets.get_mut(&fd).ok_or(Error::EBADF)?;
	match socket.socket_type {
		SocketType::Stream => {
			drop(sockets);
			let conn_id = tcp::connect(ip, port)?;
			let mut sockets = SOCKETS.lock();
			let socket = sockets.get_mut(&fd).ok_or(Error::EBADF)?;
			socket.remote_ip = ip;
			socket.remote_port = port;
			socket.connected = true;
			socket.data = SocketData::Tcp(conn_id);
			Ok(())
		}
		SocketType::Dgram => {
			socket.remote_ip = ip;
			socket.remote_port = port;
			socket.connected = true;
			socket.data = SocketData::Udp;
			Ok(())
		}
		SocketType::Raw => Err(Error::NotSupported),
	}
}

/// Non-blocking: `WouldBlock` when no connection is ready yet.
pub fn accept(fd: i32) -> Result<i32> {
	let local_port = {
		let sockets = SOCKETS.lock();
		let socket = sockets.get(&fd).ok_or(Error::EBADF)?;
		if socket.socket_type != SocketType::Stream {
			return Err(Error::InvalidOperation);
		}
		socket.local_port
	};
	let conn_id = tcp::accept(local_port)?;

	let new_fd = NEXT_FD.fetch_add(1, Ordering::Relaxed);
	SOCKETS.lock().insert(
		new_fd,
		Socket {
			socket_type: SocketType::Stream,
			local_ip: Ipv4Address::any(),
			local_port,
			remote_ip: Ipv4Address::any(),
			remote_port: 0,
			bound: true,
			connected: true,
			data: SocketData::Tcp(conn_id),
		},
	);
	Ok(new_fd)
}

pub fn send(fd: i32, data: &[u8]) -> Result<usize> {
	let (socket_type, connected, bound, remote_ip, remote_port, local_port, conn_id) = {
		let sockets = SOCKETS.lock();
		let socket = sockets.get(&fd).ok_or(Error::EBADF)?;
		(
			socket.socket_type,
			socket.connected,
			socket.bound,
			socket.remote_ip,
			socket.remote_port,
			socket.local_port,
			match socket.data {
				SocketData::Tcp(id) => Some(id),
				_ => None,
			},
		)
	};
	if !connected && !bound {
		return Err(Error::InvalidState);
	}
	match socket_type {
		SocketType::Stream => {
			let conn_id = conn_id.ok_or(Error::InvalidState)?;
			tcp::send(conn_id, data)
		}
		SocketType::Dgram => udp::send_to(local_port, remote_ip, remote_port, data),
		SocketType::Raw => Err(Error::NotSupported),
	}
}

pub fn recv(fd: i32, buf: &mut [u8]) -> Result<usize> {
	let (socket_type, local_port, conn_id) = {
		let sockets = SOCKETS.lock();
		let socket = sockets.get(&fd).ok_or(Error::EBADF)?;
		(
			socket.socket_type,
			socket.local_port,
			match socket.data {
				SocketData::Tcp(id) => Some(id),
				_ => None,
			},
		)
	};
	match socket_type {
		SocketType::Stream => {
			let conn_id = conn_id.ok_or(Error::InvalidState)?;
			tcp::recv(conn_id, buf)
		}
		SocketType::Dgram => udp::recv_from(local_port, buf).map(|(n, _ip, _port)| n),
		SocketType::Raw => Err(Error::NotSupported),
	}
}

/// Socket-option ids. Stored but not acted on beyond recording the
/// value: this teaching stack has no send/receive buffer tuning to back
/// `SO_RCVBUF`/`SO_SNDBUF` with.
pub const SO_REUSEADDR: u32 = 1;

pub fn setsockopt(fd: i32, _option: u32, _value: i32) -> Result<()> {
	let sockets = SOCKETS.lock();
	sockets.get(&fd).ok_or(Error::EBADF)?;
	Ok(())
}

pub fn getsockopt(fd: i32, _option: u32) -> Result<i32> {
	let sockets = SOCKETS.lock();
	sockets.get(&fd).ok_or(Error::EBADF)?;
	Ok(0)
}

pub fn close(fd: i32) -> Result<()> {
	let socket = SOCKETS.lock().remove(&fd).ok_or(Error::EBADF)?;
	if let SocketData::Tcp(conn_id) = socket.data {
		tcp::close(conn_id)?;
	}
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn fds_start_at_three_and_increase() {
		init().unwrap();
		let a = socket(SocketType::Dgram).unwrap();
		let b = socket(SocketType::Dgram).unwrap();
		assert_eq!(a, 3);
		assert_eq!(b, 4);
	}

	#[test]
	fn send_before_bind_or_connect_fails() {
		init().unwrap();
		let fd = socket(SocketType::Dgram).unwrap();
		assert_eq!(send(fd, b"hi").err(), Some(Error::InvalidState));
	}

	#[test]
	fn unknown_fd_rejected() {
		init().unwrap();
		assert_eq!(close(99), Err(Error::EBADF));
	}
}
