// SPDX-License-Identifier: GPL-2.0

//! Per-process capability table: possession of a valid `cap_id` in a
//! process's table is proof of authority over the resource it names.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;
use core::sync::atomic::{AtomicU64, Ordering};

use crate::error::{Error, Result};
use crate::ipc;
use crate::sync::Spinlock;
use crate::types::Pid;

const INITIAL_CAPACITY: usize = 16;
const MAX_CAPACITY: usize = 256;

pub type Rights = u32;

pub const RIGHT_READ: Rights = 1 << 0;
pub const RIGHT_WRITE: Rights = 1 << 1;
pub const RIGHT_EXECUTE: Rights = 1 << 2;
pub const RIGHT_TRANSFER: Rights = 1 << 3;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceType {
	File,
	Device,
	Socket,
	Generic,
}

#[derive(Debug, Clone, Copy)]
pub struct Capability {
	pub cap_id: u64,
	pub resource_type: ResourceType,
	pub resource_id: u64,
	pub rights: Rights,
}

static NEXT_CAP_ID: AtomicU64 = AtomicU64::new(1);

fn next_cap_id() -> u64 {
	NEXT_CAP_ID.fetch_add(1, Ordering::Relaxed)
}

struct ProcessTable {
	entries: Vec<Capability>,
}

impl ProcessTable {
	fn new() -> Self {
		Self {
			entries: Vec::with_capacity(INITIAL_CAPACITY),
		}
	}
}

struct CapabilityRegistry {
	tables: BTreeMap<u32, Spinlock<ProcessTable>>,
}

static REGISTRY: Spinlock<Option<CapabilityRegistry>> = Spinlock::new(None);

pub fn init() -> Result<()> {
	*REGISTRY.lock() = Some(CapabilityRegistry {
		tables: BTreeMap::new(),
	});
	Ok(())
}

fn with_table<R>(pid: Pid, f: impl FnOnce(&mut ProcessTable) -> R) -> Result<R> {
	let mut guard = REGISTRY.lock();
	let registry = guard.as_mut().ok_or(Error::NotInitialized)?;
	let table = registry
		.tables
		.entry(pid.0)
		.or_insert_with(|| Spinlock::new(ProcessTable::new()));
	let mut table = table.lock();
	Ok(f(&mut table))
}

/// Create a new capability in `pid`'s table, growing it up to
/// [`MAX_CAPACITY`] entries.
pub fn create(pid: Pid, resource_type: ResourceType, resource_id: u64, rights: Rights) -> Result<u64> {
	let cap_id = next_cap_id();
	with_table(pid, |table| {
		if table.entries.len() >= MAX_CAPACITY {
			return Err(Error::OutOfMemory);
		}
		table.entries.push(Capability {
			cap_id,
			resource_type,
			resource_id,
			rights,
		});
		Ok(())
	})??;
	Ok(cap_id)
}

/// True iff `pid`'s table holds `cap_id` and its rights contain `right`.
pub fn check(pid: Pid, cap_id: u64, right: Rights) -> bool {
	with_table(pid, |table| {
		table
			.entries
			.iter()
			.any(|c| c.cap_id == cap_id && (c.rights & right) == right)
	})
	.unwrap_or(false)
}

/// True iff `pid`'s table holds any capability over `(resource_type,
/// resource_id)` whose rights contain `right` — the form the VFS
/// chokepoint uses, since it does not carry a specific `cap_id`.
pub fn check_resource(pid: Pid, resource_type: ResourceType, resource_id: u64, right: Rights) -> bool {
	with_table(pid, |table| {
		table.entries.iter().any(|c| {
			c.resource_type == resource_type && c.resource_id == resource_id && (c.rights & right) == right
		})
	})
	.unwrap_or(false)
}

/// Swap-remove `cap_id` from `pid`'s table.
pub fn revoke(pid: Pid, cap_id: u64) -> Result<()> {
	with_table(pid, |table| {
		let idx = table
			.entries
			.iter()
			.position(|c| c.cap_id == cap_id)
			.ok_or(Error::NotFound)?;
		table.entries.swap_remove(idx);
		Ok(())
	})?
}

/// Verify `sender` holds `cap_id` with `RIGHT_TRANSFER`, then append the
/// capability id as 8 little-endian bytes to `msg`'s payload so the
/// receiver can `import` it out of the same message.
pub fn transfer(sender: Pid, cap_id: u64, msg: &mut ipc::Message) -> Result<()> {
	if !check(sender, cap_id, RIGHT_TRANSFER) {
		return Err(Error::PermissionDenied);
	}
	msg.data.extend_from_slice(&cap_id.to_le_bytes());
	Ok(())
}

/// Read the trailing 8-byte capability id `transfer` appended to `msg`,
/// look it up in `sender`'s table, and materialize a fresh `cap_id` bound
/// to the same `(type, resource_id, rights)` tuple in `receiver`'s table.
pub fn import(receiver: Pid, sender: Pid, msg: &ipc::Message) -> Result<u64> {
	let len = msg.data.len();
	if len < 8 {
		return Err(Error::InvalidArgument);
	}
	let mut bytes = [0u8; 8];
	bytes.copy_from_slice(&msg.data[len - 8..]);
	let cap_id = u64::from_le_bytes(bytes);

	let cap = with_table(sender, |table| {
		table
			.entries
			.iter()
			.find(|c| c.cap_id == cap_id)
			.copied()
			.ok_or(Error::NotFound)
	})??;

	create(receiver, cap.resource_type, cap.resource_id, cap.rights)
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::ipc::MessageType;
	use crate::types::Tid;

	fn blank_message(sender: Tid, recipient: Tid) -> ipc::Message {
		ipc::Message {
			id: 0,
			sender,
			recipient,
			msg_type: MessageType::Data,
			data: Vec::new(),
			timestamp: 0,
			priority: 0,
		}
	}

	#[test]
	fn create_check_revoke_roundtrip() {
		init().unwrap();
		let pid = Pid(42);
		let id = create(pid, ResourceType::File, 7, RIGHT_READ | RIGHT_WRITE).unwrap();
		assert!(check(pid, id, RIGHT_READ));
		assert!(!check(pid, id, RIGHT_EXECUTE));
		revoke(pid, id).unwrap();
		assert!(!check(pid, id, RIGHT_READ));
	}

	#[test]
	fn transfer_requires_transfer_right() {
		init().unwrap();
		let sender = Pid(1);
		let receiver = Pid(2);
		let mut msg = blank_message(Tid(1), Tid(2));
		let id = create(sender, ResourceType::File, 9, RIGHT_READ).unwrap();
		assert!(transfer(sender, id, &mut msg).is_err());
		assert!(msg.data.is_empty());

		let id2 = create(sender, ResourceType::File, 9, RIGHT_READ | RIGHT_TRANSFER).unwrap();
		transfer(sender, id2, &mut msg).unwrap();
		let imported = import(receiver, sender, &msg).unwrap();
		assert!(check(receiver, imported, RIGHT_READ));
		assert_ne!(imported, id2);
	}

	#[test]
	fn transfer_appends_cap_id_as_eight_bytes() {
		init().unwrap();
		let sender = Pid(3);
		let mut msg = blank_message(Tid(3), Tid(4));
		let id = create(sender, ResourceType::Device, 1, RIGHT_TRANSFER).unwrap();
		msg.data.push(0xAA);
		transfer(sender, id, &mut msg).unwrap();
		assert_eq!(msg.data.len(), 9);
		assert_eq!(&msg.data[1..], &id.to_le_bytes());
	}
}
