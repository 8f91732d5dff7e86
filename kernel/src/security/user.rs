// SPDX-License-Identifier: GPL-2.0

//! User and group database: fixed-capacity active-record tables, disk
//! persistence under `/etc/passwd` and `/etc/group`, and argon2id
//! password hashing.

use alloc::format;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use argon2::Argon2;

use crate::error::{Error, Result};
use crate::fs;
use crate::sync::Spinlock;
use crate::types::{Gid, Uid};

pub const MAX_USERS: usize = 256;
pub const MAX_GROUPS: usize = 64;
pub const MAX_GROUP_MEMBERS: usize = 32;
const USERNAME_MAX: usize = 31;
const HASH_MAX: usize = 63;

#[derive(Debug, Clone)]
pub struct User {
	pub uid: Uid,
	pub gid: Gid,
	pub username: String,
	pub password_hash: String,
	pub active: bool,
}

#[derive(Debug, Clone)]
pub struct Group {
	pub gid: Gid,
	pub groupname: String,
	pub members: Vec<u32>,
}

struct UserDb {
	users: Vec<User>,
	groups: Vec<Group>,
	next_uid: u32,
	next_gid: u32,
}

impl UserDb {
	const fn new() -> Self {
		Self {
			users: Vec::new(),
			groups: Vec::new(),
			next_uid: 1000,
			next_gid: 1000,
		}
	}
}

static USER_DB: Spinlock<UserDb> = Spinlock::new(UserDb::new());

/// Seed the root user/group and reset counters. Called once from
/// `kernel::init`.
pub fn init() -> Result<()> {
	let mut db = USER_DB.lock();
	db.users.clear();
	db.groups.clear();
	db.next_uid = 1000;
	db.next_gid = 1000;
	db.users.push(User {
		uid: Uid(0),
		gid: Gid(0),
		username: "root".to_string(),
		password_hash: String::new(),
		active: true,
	});
	db.groups.push(Group {
		gid: Gid(0),
		groupname: "root".to_string(),
		members: Vec::new(),
	});
	crate::info!("security: user/group database initialized");
	Ok(())
}

/// Salt derivation is deterministic from the username rather than a
/// stored random value: this kernel has no `/etc/shadow`-style separate
/// salt store, so the username itself (padded/truncated to 16 bytes)
/// stands in. Acceptable for a single-host teaching kernel; a real
/// deployment would persist a random per-user salt.
fn salt_for(username: &str) -> [u8; 16] {
	let mut salt = [0x5Au8; 16];
	let bytes = username.as_bytes();
	let n = bytes.len().min(16);
	salt[..n].copy_from_slice(&bytes[..n]);
	salt
}

fn hex_encode(bytes: &[u8]) -> String {
	const HEX: &[u8; 16] = b"0123456789abcdef";
	let mut s = String::with_capacity(bytes.len() * 2);
	for b in bytes {
		s.push(HEX[(b >> 4) as usize] as char);
		s.push(HEX[(b & 0xF) as usize] as char);
	}
	s
}

/// Hash `password` with argon2id, truncated to 31 raw bytes (62 hex
/// characters) so the encoded form fits the 63-character field.
fn hash_password(username: &str, password: &str) -> Result<String> {
	let salt = salt_for(username);
	let mut out = [0u8; 31];
	Argon2::default()
		.hash_password_into(password.as_bytes(), &salt, &mut out)
		.map_err(|_| Error::InvalidArgument)?;
	Ok(hex_encode(&out))
}

fn verify_password(username: &str, password: &str, stored_hash: &str) -> bool {
	match hash_password(username, password) {
		Ok(h) => h == stored_hash,
		Err(_) => false,
	}
}

pub fn create_user(name: &str, password: &str) -> Result<Uid> {
	if name.is_empty() || name.len() > USERNAME_MAX {
		return Err(Error::InvalidArgument);
	}
	let hash = hash_password(name, password)?;
	if hash.len() > HASH_MAX {
		return Err(Error::InvalidArgument);
	}

	let mut db = USER_DB.lock();
	if db.users.iter().any(|u| u.active && u.username == name) {
		return Err(Error::AlreadyExists);
	}
	if db.users.len() >= MAX_USERS {
		return Err(Error::OutOfMemory);
	}

	let uid = Uid(db.next_uid);
	let gid = Gid(db.next_uid); // private-group convention: gid == uid
	db.next_uid += 1;

	db.users.push(User {
		uid,
		gid,
		username: name.to_string(),
		password_hash: hash,
		active: true,
	});
	if db.groups.len() < MAX_GROUPS {
		db.groups.push(Group {
			gid,
			groupname: name.to_string(),
			members: Vec::new(),
		});
	}
	Ok(uid)
}

pub fn delete_user(uid: Uid) -> Result<()> {
	if uid.0 == 0 {
		return Err(Error::PermissionDenied);
	}
	let mut db = USER_DB.lock();
	let user = db
		.users
		.iter_mut()
		.find(|u| u.uid == uid)
		.ok_or(Error::NotFound)?;
	user.active = false;
	Ok(())
}

pub fn authenticate(name: &str, password: &str) -> Result<Uid> {
	let db = USER_DB.lock();
	let user = db
		.users
		.iter()
		.find(|u| u.active && u.username == name)
		.ok_or(Error::NotFound)?;
	if verify_password(name, password, &user.password_hash) {
		Ok(user.uid)
	} else {
		Err(Error::PermissionDenied)
	}
}

pub fn lookup_by_uid(uid: Uid) -> Option<User> {
	USER_DB.lock().users.iter().find(|u| u.uid == uid).cloned()
}

pub fn create_group(name: &str) -> Result<Gid> {
	let mut db = USER_DB.lock();
	if db.groups.iter().any(|g| g.groupname == name) {
		return Err(Error::AlreadyExists);
	}
	if db.groups.len() >= MAX_GROUPS {
		return Err(Error::OutOfMemory);
	}
	let gid = Gid(db.next_gid);
	db.next_gid += 1;
	db.groups.push(Group {
		gid,
		groupname: name.to_string(),
		members: Vec::new(),
	});
	Ok(gid)
}

pub fn add_group_member(gid: Gid, uid: Uid) -> Result<()> {
	let mut db = USER_DB.lock();
	let group = db.groups.iter_mut().find(|g| g.gid == gid).ok_or(Error::NotFound)?;
	if group.members.len() >= MAX_GROUP_MEMBERS {
		return Err(Error::OutOfMemory);
	}
	if !group.members.contains(&uid.0) {
		group.members.push(uid.0);
	}
	Ok(())
}

/// Write `/etc/passwd` with lines `username:hash:uid:gid::/home/username:/bin/sh`,
/// creating `/etc` beforehand.
pub fn save_to_disk() -> Result<()> {
	let _ = fs::mkdir("/etc", 0o755);

	let db = USER_DB.lock();
	let mut passwd = String::new();
	for u in db.users.iter().filter(|u| u.active) {
		passwd.push_str(&format!(
			"{}:{}:{}:{}::/home/{}:/bin/sh\n",
			u.username, u.password_hash, u.uid.0, u.gid.0, u.username
		));
	}
	write_whole_file("/etc/passwd", passwd.as_bytes())?;

	let mut group = String::new();
	for g in db.groups.iter() {
		let members = g
			.members
			.iter()
			.map(|m| m.to_string())
			.collect::<Vec<_>>()
			.join(",");
		group.push_str(&format!("{}:x:{}:{}\n", g.groupname, g.gid.0, members));
	}
	write_whole_file("/etc/group", group.as_bytes())?;
	Ok(())
}

fn write_whole_file(path: &str, data: &[u8]) -> Result<()> {
	let fd = fs::open(
		path,
		fs::OpenFlags(fs::OpenFlags::WRITE | fs::OpenFlags::CREATE | fs::OpenFlags::TRUNC),
	)?;
	let res = fs::write(fd, data);
	fs::close(fd)?;
	res.map(|_| ())
}

/// Parse `/etc/passwd`/`/etc/group` back into the in-memory tables.
/// Absence of either file is not an error.
pub fn load_from_disk() -> Result<()> {
	if let Ok(contents) = read_whole_file("/etc/passwd") {
		let text = String::from_utf8_lossy(&contents);
		let mut db = USER_DB.lock();
		for line in text.lines() {
			let fields: Vec<&str> = line.split(':').collect();
			if fields.len() < 4 {
				continue;
			}
			let (Ok(uid), Ok(gid)) = (fields[2].parse::<u32>(), fields[3].parse::<u32>()) else {
				continue;
			};
			if db.users.iter().any(|u| u.uid.0 == uid) {
				continue;
			}
			db.users.push(User {
				uid: Uid(uid),
				gid: Gid(gid),
				username: fields[0].to_string(),
				password_hash: fields[1].to_string(),
				active: true,
			});
			if uid >= db.next_uid {
				db.next_uid = uid + 1;
			}
		}
	}

	if let Ok(contents) = read_whole_file("/etc/group") {
		let text = String::from_utf8_lossy(&contents);
		let mut db = USER_DB.lock();
		for line in text.lines() {
			let fields: Vec<&str> = line.split(':').collect();
			if fields.len() < 3 {
				continue;
			}
			let Ok(gid) = fields[2].parse::<u32>() else {
				continue;
			};
			if db.groups.iter().any(|g| g.gid.0 == gid) {
				continue;
			}
			let members = fields
				.get(3)
				.map(|m| m.split(',').filter_map(|s| s.parse::<u32>().ok()).collect())
				.unwrap_or_default();
			db.groups.push(Group {
				gid: Gid(gid),
				groupname: fields[0].to_string(),
				members,
			});
			if gid >= db.next_gid {
				db.next_gid = gid + 1;
			}
		}
	}

	Ok(())
}

fn read_whole_file(path: &str) -> Result<Vec<u8>> {
	let fd = fs::open(path, fs::OpenFlags(fs::OpenFlags::READ))?;
	let mut out = Vec::new();
	let mut buf = [0u8; 512];
	loop {
		match fs::read(fd, &mut buf) {
			Ok(0) => break,
			Ok(n) => out.extend_from_slice(&buf[..n]),
			Err(Error::EndOfFile) => break,
			Err(e) => {
				let _ = fs::close(fd);
				return Err(e);
			}
		}
	}
	fs::close(fd)?;
	Ok(out)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn create_user_assigns_private_group_and_hashes() {
		init().unwrap();
		let uid = create_user("alice", "hunter2").unwrap();
		assert_eq!(uid.0, 1000);
		let user = lookup_by_uid(uid).unwrap();
		assert_eq!(user.gid.0, 1000);
		assert_ne!(user.password_hash, "hunter2");
		assert!(authenticate("alice", "hunter2").is_ok());
		assert!(authenticate("alice", "wrong").is_err());
	}

	#[test]
	fn duplicate_username_rejected() {
		init().unwrap();
		create_user("bob", "pw").unwrap();
		assert_eq!(create_user("bob", "pw2"), Err(Error::AlreadyExists));
	}

	#[test]
	fn root_cannot_be_deleted() {
		init().unwrap();
		assert_eq!(delete_user(Uid(0)), Err(Error::PermissionDenied));
	}
}
