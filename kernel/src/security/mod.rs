// SPDX-License-Identifier: GPL-2.0

//! Security subsystem: users/groups, ACLs, RBAC and capabilities, wired
//! into the VFS as a single authorisation chokepoint.

pub mod acl;
pub mod capability;
pub mod rbac;
pub mod user;

use crate::error::{Error, Result};
use crate::fs::Stat;
use crate::process;
use crate::types::{Gid, Uid};

/// The VFS entrypoint being authorised; maps to both a capability right
/// and an RBAC permission id.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
	Open,
	Mkdir,
	Rmdir,
	Unlink,
	Rename,
}

impl Operation {
	fn permission_id(self) -> rbac::PermissionId {
		match self {
			Operation::Open => 1,
			Operation::Mkdir => 2,
			Operation::Rmdir => 3,
			Operation::Unlink => 4,
			Operation::Rename => 5,
		}
	}
}

/// Requested access, a bitmask over the ACL/mode-bit permission bits
/// (`4=R, 2=W, 1=X`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessMask(pub u8);

impl AccessMask {
	pub const READ: u8 = acl::PERM_READ;
	pub const WRITE: u8 = acl::PERM_WRITE;
	pub const EXECUTE: u8 = acl::PERM_EXEC;
}

fn capability_right_for(mask: AccessMask) -> capability::Rights {
	let mut rights = 0;
	if mask.0 & AccessMask::READ != 0 {
		rights |= capability::RIGHT_READ;
	}
	if mask.0 & AccessMask::WRITE != 0 {
		rights |= capability::RIGHT_WRITE;
	}
	if mask.0 & AccessMask::EXECUTE != 0 {
		rights |= capability::RIGHT_EXECUTE;
	}
	rights
}

fn current_identity() -> (Uid, Gid, u32) {
	match process::current_process() {
		// No scheduled process yet (early boot, kernel-internal calls):
		// treated as root so init-time mounts/mkdirs are never blocked.
		None => (Uid(0), Gid(0), 0),
		Some(p) => (p.uid, p.gid, p.pid.0),
	}
}

/// The uid/gid `authorize` would evaluate against right now. Used by the
/// VFS to seed a new entry's ACL from the creating identity.
pub fn current_uid_gid() -> (Uid, Gid) {
	let (uid, gid, _) = current_identity();
	(uid, gid)
}

fn mode_bits_permit(uid: Uid, gid: Gid, file_uid: u32, file_gid: u32, mode: u32, requested: u8) -> bool {
	let triad = if uid.0 == file_uid {
		(mode >> 6) & 0o7
	} else if gid.0 == file_gid {
		(mode >> 3) & 0o7
	} else {
		mode & 0o7
	};
	(triad as u8 & requested) == requested
}

/// The single authorisation chokepoint. Evaluated in order: root bypass,
/// capability, ACL, POSIX mode bits, RBAC, deny.
pub fn authorize(op: Operation, stat: &Stat, requested: AccessMask) -> Result<()> {
	let (uid, gid, pid) = current_identity();

	if uid.0 == 0 {
		return Ok(());
	}

	let cap_right = capability_right_for(requested);
	if cap_right != 0
		&& capability::check_resource(
			crate::types::Pid(pid),
			capability::ResourceType::File,
			stat.ino,
			cap_right,
		) {
		return Ok(());
	}

	if let Some(acl) = acl::get_acl(stat.ino) {
		if acl.evaluate(uid, gid, requested.0) {
			return Ok(());
		}
	}

	if mode_bits_permit(uid, gid, stat.uid, stat.gid, stat.mode, requested.0) {
		return Ok(());
	}

	if rbac::user_has_permission(uid, op.permission_id()) {
		return Ok(());
	}

	Err(Error::PermissionDenied)
}

/// Initialize the security subsystem: seed the root account and bring
/// up the per-process capability registry. Called once from
/// `kernel::init`.
pub fn init() -> Result<()> {
	user::init()?;
	capability::init()?;
	user::load_from_disk()?;
	crate::info!("security: subsystem initialized");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::fs::FileType;

	fn stat(uid: u32, gid: u32, mode: u32) -> Stat {
		Stat {
			ino: 1,
			size: 0,
			mode,
			uid,
			gid,
			file_type: FileType::File,
			atime: 0,
			mtime: 0,
			ctime: 0,
		}
	}

	#[test]
	fn mode_bits_owner_triad() {
		assert!(mode_bits_permit(Uid(5), Gid(5), 5, 5, 0o640, AccessMask::READ));
		assert!(!mode_bits_permit(Uid(5), Gid(5), 5, 5, 0o640, AccessMask::EXECUTE));
	}

	#[test]
	fn mode_bits_other_triad_when_no_match() {
		assert!(!mode_bits_permit(Uid(9), Gid(9), 5, 5, 0o640, AccessMask::READ));
		assert!(mode_bits_permit(Uid(9), Gid(9), 5, 5, 0o644, AccessMask::READ));
	}

	#[test]
	fn root_stat_ignored_by_mode_check_but_authorize_bypasses_earlier() {
		let s = stat(5, 5, 0o600);
		// uid 0 short-circuits before mode bits are even consulted; this
		// is exercised through authorize() in the user/process-backed
		// integration tests rather than here, since current_identity()
		// depends on process::current_process().
		let _ = s;
	}
}
