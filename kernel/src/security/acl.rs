// SPDX-License-Identifier: GPL-2.0

//! Per-resource access control lists: up to 32 entries, evaluated in
//! order with the first matching `User` entry deciding outright.

use alloc::collections::BTreeMap;
use alloc::vec::Vec;

use crate::sync::Spinlock;
use crate::types::{Gid, Uid};

pub const MAX_ENTRIES: usize = 32;

pub const PERM_READ: u8 = 4;
pub const PERM_WRITE: u8 = 2;
pub const PERM_EXEC: u8 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKind {
	User,
	Group,
	Other,
	Mask,
}

#[derive(Debug, Clone, Copy)]
pub struct AclEntry {
	pub kind: EntryKind,
	pub id: u32,
	pub perms: u8,
}

#[derive(Debug, Clone, Default)]
pub struct Acl {
	entries: Vec<AclEntry>,
}

impl Acl {
	pub fn new() -> Self {
		Self { entries: Vec::new() }
	}

	/// Seed an ACL from mode bits and the creating uid/gid, matching the
	/// permissions a plain POSIX three-class check would grant.
	pub fn from_mode(mode: u32, uid: Uid, gid: Gid) -> Self {
		let mut acl = Self::new();
		let owner_perms = ((mode >> 6) & 0o7) as u8;
		let group_perms = ((mode >> 3) & 0o7) as u8;
		let other_perms = (mode & 0o7) as u8;
		let _ = acl.push(AclEntry {
			kind: EntryKind::User,
			id: uid.0,
			perms: owner_perms,
		});
		let _ = acl.push(AclEntry {
			kind: EntryKind::Group,
			id: gid.0,
			perms: group_perms,
		});
		let _ = acl.push(AclEntry {
			kind: EntryKind::Other,
			id: 0,
			perms: other_perms,
		});
		acl
	}

	pub fn push(&mut self, entry: AclEntry) -> Result<(), ()> {
		if self.entries.len() >= MAX_ENTRIES {
			return Err(());
		}
		self.entries.push(entry);
		Ok(())
	}

	/// Evaluate `(uid, gid)` against `requested` (a bitmask over
	/// `PERM_READ`/`PERM_WRITE`/`PERM_EXEC`). Order: first matching
	/// `User` entry decides outright; else the `Group` entry ANDed with
	/// a `Mask` entry if one is present; else `Other`.
	pub fn evaluate(&self, uid: Uid, gid: Gid, requested: u8) -> bool {
		if let Some(user_entry) = self
			.entries
			.iter()
			.find(|e| e.kind == EntryKind::User && e.id == uid.0)
		{
			return (user_entry.perms & requested) == requested;
		}

		if let Some(group_entry) = self
			.entries
			.iter()
			.find(|e| e.kind == EntryKind::Group && e.id == gid.0)
		{
			let mask = self
				.entries
				.iter()
				.find(|e| e.kind == EntryKind::Mask)
				.map(|e| e.perms)
				.unwrap_or(0b111);
			let effective = group_entry.perms & mask;
			return (effective & requested) == requested;
		}

		if let Some(other_entry) = self.entries.iter().find(|e| e.kind == EntryKind::Other) {
			return (other_entry.perms & requested) == requested;
		}

		false
	}
}

/// ACLs keyed by an opaque resource id (the inode number a filesystem's
/// `stat` reports); filesystems themselves carry no ACL storage.
static ACL_TABLE: Spinlock<BTreeMap<u64, Acl>> = Spinlock::new(BTreeMap::new());

pub fn set_acl(resource_id: u64, acl: Acl) {
	ACL_TABLE.lock().insert(resource_id, acl);
}

pub fn get_acl(resource_id: u64) -> Option<Acl> {
	ACL_TABLE.lock().get(&resource_id).cloned()
}

pub fn remove_acl(resource_id: u64) {
	ACL_TABLE.lock().remove(&resource_id);
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn user_entry_takes_precedence() {
		let mut acl = Acl::new();
		acl.push(AclEntry {
			kind: EntryKind::User,
			id: 1000,
			perms: PERM_READ,
		})
		.unwrap();
		acl.push(AclEntry {
			kind: EntryKind::Other,
			id: 0,
			perms: PERM_READ | PERM_WRITE,
		})
		.unwrap();
		assert!(!acl.evaluate(Uid(1000), Gid(1000), PERM_WRITE));
		assert!(acl.evaluate(Uid(2000), Gid(2000), PERM_READ | PERM_WRITE));
	}

	#[test]
	fn mask_limits_group_perms() {
		let mut acl = Acl::new();
		acl.push(AclEntry {
			kind: EntryKind::Group,
			id: 100,
			perms: PERM_READ | PERM_WRITE,
		})
		.unwrap();
		acl.push(AclEntry {
			kind: EntryKind::Mask,
			id: 0,
			perms: PERM_READ,
		})
		.unwrap();
		assert!(acl.evaluate(Uid(9), Gid(100), PERM_READ));
		assert!(!acl.evaluate(Uid(9), Gid(100), PERM_WRITE));
	}

	#[test]
	fn rejects_beyond_capacity() {
		let mut acl = Acl::new();
		for i in 0..MAX_ENTRIES {
			assert!(acl
				.push(AclEntry {
					kind: EntryKind::User,
					id: i as u32,
					perms: 0,
				})
				.is_ok());
		}
		assert!(acl
			.push(AclEntry {
				kind: EntryKind::User,
				id: 999,
				perms: 0,
			})
			.is_err());
	}
}
