// SPDX-License-Identifier: GPL-2.0

//! Role-based access control: roles grant numeric permission ids, users
//! are assigned up to N roles, and a user holds a permission iff some
//! assigned role grants it.

use alloc::collections::BTreeMap;
use alloc::string::String;
use alloc::vec::Vec;

use crate::error::{Error, Result};
use crate::sync::Spinlock;
use crate::types::Uid;

pub const MAX_PERMISSIONS_PER_ROLE: usize = 64;
pub const MAX_ROLES_PER_USER: usize = 16;

pub type RoleId = u32;
pub type PermissionId = u32;

#[derive(Debug, Clone)]
pub struct Role {
	pub role_id: RoleId,
	pub name: String,
	pub permissions: Vec<PermissionId>,
}

struct Rbac {
	roles: BTreeMap<RoleId, Role>,
	user_roles: BTreeMap<u32, Vec<RoleId>>,
	next_role_id: RoleId,
}

impl Rbac {
	const fn new() -> Self {
		Self {
			roles: BTreeMap::new(),
			user_roles: BTreeMap::new(),
			next_role_id: 1,
		}
	}
}

static RBAC: Spinlock<Rbac> = Spinlock::new(Rbac::new());

pub fn create_role(name: &str) -> RoleId {
	let mut rbac = RBAC.lock();
	let role_id = rbac.next_role_id;
	rbac.next_role_id += 1;
	rbac.roles.insert(
		role_id,
		Role {
			role_id,
			name: alloc::string::ToString::to_string(name),
			permissions: Vec::new(),
		},
	);
	role_id
}

pub fn grant_permission(role_id: RoleId, permission: PermissionId) -> Result<()> {
	let mut rbac = RBAC.lock();
	let role = rbac.roles.get_mut(&role_id).ok_or(Error::NotFound)?;
	if role.permissions.len() >= MAX_PERMISSIONS_PER_ROLE {
		return Err(Error::OutOfMemory);
	}
	if !role.permissions.contains(&permission) {
		role.permissions.push(permission);
	}
	Ok(())
}

pub fn assign_role(uid: Uid, role_id: RoleId) -> Result<()> {
	let mut rbac = RBAC.lock();
	if !rbac.roles.contains_key(&role_id) {
		return Err(Error::NotFound);
	}
	let roles = rbac.user_roles.entry(uid.0).or_insert_with(Vec::new);
	if roles.len() >= MAX_ROLES_PER_USER {
		return Err(Error::OutOfMemory);
	}
	if !roles.contains(&role_id) {
		roles.push(role_id);
	}
	Ok(())
}

/// True iff any role assigned to `uid` grants `permission`.
pub fn user_has_permission(uid: Uid, permission: PermissionId) -> bool {
	let rbac = RBAC.lock();
	let Some(roles) = rbac.user_roles.get(&uid.0) else {
		return false;
	};
	roles.iter().any(|role_id| {
		rbac.roles
			.get(role_id)
			.map(|r| r.permissions.contains(&permission))
			.unwrap_or(false)
	})
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn role_grant_and_check() {
		let role = create_role("editor");
		grant_permission(role, 42).unwrap();
		assign_role(Uid(500), role).unwrap();
		assert!(user_has_permission(Uid(500), 42));
		assert!(!user_has_permission(Uid(500), 43));
		assert!(!user_has_permission(Uid(501), 42));
	}
}
