// SPDX-License-Identifier: GPL-2.0

//! Virtual file system: mount table, file-descriptor table, and the
//! filesystem vtable that FAT32/ext4/SFS implement against.

pub mod ext4;
pub mod fat32;
pub mod mode;
pub mod path;
pub mod sfs;

use alloc::boxed::Box;
use alloc::string::{String, ToString};
use alloc::sync::Arc as AllocArc;
use alloc::vec::Vec;
use core::any::Any;

use crate::console;
use crate::error::{Error, Result};
use crate::security::{self, AccessMask, Operation};
use crate::sync::Spinlock;

/// Flags passed to [`open`]. Matches the POSIX-ish bitset the original
/// kernel exposes to its shell and syscall layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct OpenFlags(pub u32);

impl OpenFlags {
	pub const READ: u32 = 1 << 0;
	pub const WRITE: u32 = 1 << 1;
	pub const CREATE: u32 = 1 << 2;
	pub const TRUNC: u32 = 1 << 3;
	pub const APPEND: u32 = 1 << 4;

	pub fn has(&self, bit: u32) -> bool {
		self.0 & bit != 0
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SeekWhence {
	Set,
	Cur,
	End,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileType {
	File,
	Directory,
	Unknown,
}

#[derive(Debug, Clone)]
pub struct DirEntry {
	pub ino: u64,
	pub name: String,
	pub file_type: FileType,
}

#[derive(Debug, Clone, Copy)]
pub struct Stat {
	pub ino: u64,
	pub size: u64,
	pub mode: u32,
	pub uid: u32,
	pub gid: u32,
	pub file_type: FileType,
	pub atime: u64,
	pub mtime: u64,
	pub ctime: u64,
}

/// Opaque per-open-file state a filesystem driver hands back from `open`
/// and `opendir`; the VFS never inspects its contents.
pub struct FileHandle(pub Box<dyn Any + Send>);

impl FileHandle {
	pub fn new<T: Any + Send>(data: T) -> Self {
		Self(Box::new(data))
	}

	pub fn downcast_mut<T: Any>(&mut self) -> Result<&mut T> {
		self.0.downcast_mut::<T>().ok_or(Error::InvalidState)
	}

	pub fn downcast_ref<T: Any>(&self) -> Result<&T> {
		self.0.downcast_ref::<T>().ok_or(Error::InvalidState)
	}
}

/// Filesystem vtable. A method a driver does not implement keeps the
/// default `NotSupported` body (ext4 is the main user of that escape
/// hatch: it is read-only).
pub trait FileSystem: Send + Sync {
	fn name(&self) -> &str;

	fn mount(&self, device_name: &str, mountpoint: &str) -> Result<()>;
	fn unmount(&self) -> Result<()> {
		Ok(())
	}

	fn open(&self, _path: &str, _flags: OpenFlags) -> Result<FileHandle> {
		Err(Error::NotSupported)
	}
	fn close(&self, _file: FileHandle) -> Result<()> {
		Ok(())
	}
	fn read(&self, _file: &mut FileHandle, _buf: &mut [u8], _offset: u64) -> Result<usize> {
		Err(Error::NotSupported)
	}
	fn write(&self, _file: &mut FileHandle, _buf: &[u8], _offset: u64) -> Result<usize> {
		Err(Error::NotSupported)
	}
	fn stat(&self, _path: &str) -> Result<Stat> {
		Err(Error::NotSupported)
	}
	fn mkdir(&self, _path: &str, _mode: u32) -> Result<()> {
		Err(Error::NotSupported)
	}
	fn rmdir(&self, _path: &str) -> Result<()> {
		Err(Error::NotSupported)
	}
	fn opendir(&self, _path: &str) -> Result<FileHandle> {
		Err(Error::NotSupported)
	}
	fn readdir(&self, _dir: &mut FileHandle) -> Result<DirEntry> {
		Err(Error::NotSupported)
	}
	fn closedir(&self, _dir: FileHandle) -> Result<()> {
		Ok(())
	}
	fn unlink(&self, _path: &str) -> Result<()> {
		Err(Error::NotSupported)
	}
	fn rename(&self, _old: &str, _new: &str) -> Result<()> {
		Err(Error::NotSupported)
	}
}

type FsFactory = fn() -> AllocArc<dyn FileSystem>;

struct MountEntry {
	path: String,
	fs: AllocArc<dyn FileSystem>,
}

struct Vfs {
	factories: alloc::collections::BTreeMap<String, FsFactory>,
	mounts: Vec<MountEntry>,
}

impl Vfs {
	const fn new() -> Self {
		Self {
			factories: alloc::collections::BTreeMap::new(),
			mounts: Vec::new(),
		}
	}
}

static VFS: Spinlock<Vfs> = Spinlock::new(Vfs::new());

/// File-descriptor slot. `fs`/`file_data` are populated between `open`
/// and `close`; fds 0-2 never get a slot, they are special-cased in
/// `read`/`write`/`close`.
struct FdSlot {
	used: bool,
	fs: Option<AllocArc<dyn FileSystem>>,
	file_data: Option<FileHandle>,
	position: u64,
	flags: OpenFlags,
	is_dir: bool,
	/// Path relative to the owning mount, kept so `seek(.., End)` can
	/// re-stat the file for its current size without a second resolve.
	rel_path: String,
}

const MAX_FDS: usize = 256;
const FD_RESERVED: usize = 3;

const EMPTY_SLOT: FdSlot = FdSlot {
	used: false,
	fs: None,
	file_data: None,
	position: 0,
	flags: OpenFlags(0),
	is_dir: false,
	rel_path: String::new(),
};

struct FdTable {
	slots: [FdSlot; MAX_FDS],
}

static FD_TABLE: Spinlock<FdTable> = Spinlock::new(FdTable {
	slots: [EMPTY_SLOT; MAX_FDS],
});

/// Register a filesystem driver factory under `fs_name`, callable later
/// from `mount`. Called once per driver at boot, matching the block
/// registry's init-time registration idiom.
pub fn register_filesystem(fs_name: &str, factory: FsFactory) -> Result<()> {
	let mut vfs = VFS.lock();
	if vfs.factories.contains_key(fs_name) {
		return Err(Error::AlreadyExists);
	}
	vfs.factories.insert(fs_name.to_string(), factory);
	Ok(())
}

pub fn mount(device_name: &str, mountpoint: &str, fs_name: &str) -> Result<()> {
	let factory = {
		let vfs = VFS.lock();
		*vfs.factories.get(fs_name).ok_or(Error::NotFound)?
	};
	let instance = factory();
	instance.mount(device_name, mountpoint)?;

	let mut vfs = VFS.lock();
	if vfs.mounts.iter().any(|m| m.path == mountpoint) {
		return Err(Error::AlreadyExists);
	}
	vfs.mounts.push(MountEntry {
		path: mountpoint.to_string(),
		fs: instance,
	});
	crate::info!("vfs: mounted {} ({}) at {}", fs_name, device_name, mountpoint);
	Ok(())
}

pub fn unmount(mountpoint: &str) -> Result<()> {
	let mut vfs = VFS.lock();
	let idx = vfs
		.mounts
		.iter()
		.position(|m| m.path == mountpoint)
		.ok_or(Error::NotFound)?;
	vfs.mounts[idx].fs.unmount()?;
	vfs.mounts.remove(idx);
	Ok(())
}

/// Resolve `path` to its mounted filesystem and the remainder of the
/// path after stripping the mountpoint's prefix, via longest-prefix
/// match. `/` is expected to always carry a mount.
fn resolve(full_path: &str) -> Result<(AllocArc<dyn FileSystem>, String)> {
	let vfs = VFS.lock();
	let mut best: Option<&MountEntry> = None;
	for m in &vfs.mounts {
		if path::is_prefix(&m.path, full_path) {
			if best.map_or(true, |b| m.path.len() > b.path.len()) {
				best = Some(m);
			}
		}
	}
	let entry = best.ok_or(Error::NotFound)?;
	let rel = path::strip_prefix(&entry.path, full_path);
	Ok((entry.fs.clone(), rel))
}

fn alloc_fd(table: &mut FdTable) -> Result<usize> {
	for (idx, slot) in table.slots.iter().enumerate() {
		if !slot.used {
			return Ok(idx + FD_RESERVED);
		}
	}
	Err(Error::OutOfMemory)
}

fn access_mask_for(flags: &OpenFlags) -> AccessMask {
	let mut mask = AccessMask(0);
	if flags.has(OpenFlags::READ) {
		mask.0 |= AccessMask::READ;
	}
	if flags.has(OpenFlags::WRITE) || flags.has(OpenFlags::CREATE) || flags.has(OpenFlags::TRUNC) {
		mask.0 |= AccessMask::WRITE;
	}
	mask
}

pub fn open(path_str: &str, flags: OpenFlags) -> Result<i32> {
	let (fs, rel) = resolve(path_str)?;

	let existing_stat = fs.stat(&rel).ok();
	if existing_stat.is_none() && !flags.has(OpenFlags::CREATE) {
		return Err(Error::ENOENT);
	}
	match &existing_stat {
		Some(stat) => security::authorize(Operation::Open, stat, access_mask_for(&flags))?,
		// Creating a new entry is authorized against its parent directory,
		// the same chokepoint mkdir() uses, since there is no stat yet for
		// the entry itself.
		None => {
			if let Some(parent) = path::parent_of(&rel) {
				if let Ok(parent_stat) = fs.stat(&parent) {
					security::authorize(Operation::Open, &parent_stat, AccessMask(AccessMask::WRITE))?;
				}
			}
		}
	}

	let file_data = fs.open(&rel, flags)?;
	if existing_stat.is_none() {
		if let Ok(stat) = fs.stat(&rel) {
			let (uid, gid) = security::current_uid_gid();
			security::acl::set_acl(stat.ino, security::acl::Acl::from_mode(stat.mode, uid, gid));
		}
	}

	let mut table = FD_TABLE.lock();
	let idx = alloc_fd(&mut table)?;
	table.slots[idx - FD_RESERVED] = FdSlot {
		used: true,
		fs: Some(fs),
		file_data: Some(file_data),
		position: 0,
		rel_path: rel,
		flags,
		is_dir: false,
	};
	Ok(idx as i32)
}

pub fn close(fd: i32) -> Result<()> {
	if (fd as usize) < FD_RESERVED {
		return Ok(());
	}
	let mut table = FD_TABLE.lock();
	let slot = slot_mut(&mut table, fd)?;
	let fs = slot.fs.take().ok_or(Error::EBADF)?;
	let file_data = slot.file_data.take().ok_or(Error::EBADF)?;
	*slot = EMPTY_SLOT;
	fs.close(file_data)
}

fn slot_mut(table: &mut FdTable, fd: i32) -> Result<&mut FdSlot> {
	if fd < FD_RESERVED as i32 {
		return Err(Error::EBADF);
	}
	let idx = fd as usize - FD_RESERVED;
	let slot = table.slots.get_mut(idx).ok_or(Error::EBADF)?;
	if !slot.used {
		return Err(Error::EBADF);
	}
	Ok(slot)
}

pub fn read(fd: i32, buf: &mut [u8]) -> Result<usize> {
	if (fd as usize) < FD_RESERVED {
		// Standard streams: stdin has no backing input source yet.
		return Err(Error::EndOfFile);
	}
	let mut table = FD_TABLE.lock();
	let slot = slot_mut(&mut table, fd)?;
	if !slot.flags.has(OpenFlags::READ) {
		return Err(Error::PermissionDenied);
	}
	let fs = slot.fs.as_ref().ok_or(Error::EBADF)?;
	let file_data = slot.file_data.as_mut().ok_or(Error::EBADF)?;
	let n = fs.read(file_data, buf, slot.position)?;
	slot.position += n as u64;
	Ok(n)
}

pub fn write(fd: i32, buf: &[u8]) -> Result<usize> {
	if fd == 1 || fd == 2 {
		console::write_str(&String::from_utf8_lossy(buf));
		return Ok(buf.len());
	}
	if fd == 0 {
		return Err(Error::EBADF);
	}
	let mut table = FD_TABLE.lock();
	let slot = slot_mut(&mut table, fd)?;
	if !slot.flags.has(OpenFlags::WRITE) {
		return Err(Error::PermissionDenied);
	}
	let fs = slot.fs.as_ref().ok_or(Error::EBADF)?;
	let file_data = slot.file_data.as_mut().ok_or(Error::EBADF)?;
	let n = fs.write(file_data, buf, slot.position)?;
	slot.position += n as u64;
	Ok(n)
}

pub fn seek(fd: i32, offset: i64, whence: SeekWhence) -> Result<u64> {
	let mut table = FD_TABLE.lock();
	let slot = slot_mut(&mut table, fd)?;
	let base = match whence {
		SeekWhence::Set => 0i64,
		SeekWhence::Cur => slot.position as i64,
		SeekWhence::End => {
			let fs = slot.fs.as_ref().ok_or(Error::EBADF)?;
			fs.stat(&slot.rel_path)?.size as i64
		}
	};
	let new_pos = base + offset;
	if new_pos < 0 {
		return Err(Error::InvalidArgument);
	}
	slot.position = new_pos as u64;
	Ok(slot.position)
}

pub fn tell(fd: i32) -> Result<u64> {
	let table = FD_TABLE.lock();
	let idx = fd as usize;
	if idx < FD_RESERVED {
		return Ok(0);
	}
	let slot = table
		.slots
		.get(idx - FD_RESERVED)
		.ok_or(Error::EBADF)?;
	if !slot.used {
		return Err(Error::EBADF);
	}
	Ok(slot.position)
}

pub fn stat(path_str: &str) -> Result<Stat> {
	let (fs, rel) = resolve(path_str)?;
	fs.stat(&rel)
}

pub fn mkdir(path_str: &str, mode: u32) -> Result<()> {
	let (fs, rel) = resolve(path_str)?;
	if let Some(parent) = path::parent_of(&rel) {
		if let Ok(stat) = fs.stat(&parent) {
			security::authorize(Operation::Mkdir, &stat, AccessMask(AccessMask::WRITE))?;
		}
	}
	fs.mkdir(&rel, mode)?;
	if let Ok(stat) = fs.stat(&rel) {
		let (uid, gid) = security::current_uid_gid();
		security::acl::set_acl(stat.ino, security::acl::Acl::from_mode(stat.mode, uid, gid));
	}
	Ok(())
}

pub fn rmdir(path_str: &str) -> Result<()> {
	let (fs, rel) = resolve(path_str)?;
	if let Ok(stat) = fs.stat(&rel) {
		security::authorize(Operation::Rmdir, &stat, AccessMask(AccessMask::WRITE))?;
	}
	fs.rmdir(&rel)
}

pub fn unlink(path_str: &str) -> Result<()> {
	let (fs, rel) = resolve(path_str)?;
	if let Ok(stat) = fs.stat(&rel) {
		security::authorize(Operation::Unlink, &stat, AccessMask(AccessMask::WRITE))?;
	}
	fs.unlink(&rel)
}

pub fn rename(old: &str, new: &str) -> Result<()> {
	let (fs_old, rel_old) = resolve(old)?;
	let (fs_new, rel_new) = resolve(new)?;
	if !AllocArc::ptr_eq(&fs_old, &fs_new) {
		return Err(Error::NotSupported); // cross-filesystem rename is not modelled
	}
	if let Ok(stat) = fs_old.stat(&rel_old) {
		security::authorize(Operation::Rename, &stat, AccessMask(AccessMask::WRITE))?;
	}
	fs_old.rename(&rel_old, &rel_new)
}

pub fn opendir(path_str: &str) -> Result<i32> {
	let (fs, rel) = resolve(path_str)?;
	let handle = fs.opendir(&rel)?;
	let mut table = FD_TABLE.lock();
	let idx = alloc_fd(&mut table)?;
	table.slots[idx - FD_RESERVED] = FdSlot {
		used: true,
		fs: Some(fs),
		file_data: Some(handle),
		position: 0,
		flags: OpenFlags(OpenFlags::READ),
		is_dir: true,
	};
	Ok(idx as i32)
}

pub fn readdir(fd: i32) -> Result<DirEntry> {
	let mut table = FD_TABLE.lock();
	let slot = slot_mut(&mut table, fd)?;
	if !slot.is_dir {
		return Err(Error::ENOTDIR);
	}
	let fs = slot.fs.as_ref().ok_or(Error::EBADF)?;
	let handle = slot.file_data.as_mut().ok_or(Error::EBADF)?;
	fs.readdir(handle)
}

pub fn closedir(fd: i32) -> Result<()> {
	close(fd)
}

/// Initialize the VFS: register the built-in filesystem drivers. Called
/// once from `kernel::init`; mounting the root filesystem is a separate,
/// later step once a block device has been probed.
pub fn init() -> Result<()> {
	register_filesystem("fat32", || AllocArc::new(fat32::Fat32::new()))?;
	register_filesystem("ext4", || AllocArc::new(ext4::Ext4::new()))?;
	register_filesystem("sfs", || AllocArc::new(sfs::Sfs::new()))?;
	crate::info!("vfs: filesystem drivers registered");
	Ok(())
}

#[cfg(test)]
mod tests {
	use super::*;

	struct MemFs;
	impl FileSystem for MemFs {
		fn name(&self) -> &str {
			"memfs"
		}
		fn mount(&self, _device_name: &str, _mountpoint: &str) -> Result<()> {
			Ok(())
		}
		fn stat(&self, _path: &str) -> Result<Stat> {
			Ok(Stat {
				ino: 1,
				size: 0,
				mode: 0o755,
				uid: 0,
				gid: 0,
				file_type: FileType::Directory,
				atime: 0,
				mtime: 0,
				ctime: 0,
			})
		}
	}

	fn reset() {
		let mut vfs = VFS.lock();
		vfs.factories.clear();
		vfs.mounts.clear();
	}

	#[test]
	fn longest_prefix_wins() {
		reset();
		register_filesystem("mem", || AllocArc::new(MemFs)).unwrap();
		mount("devA", "/", "mem").unwrap();
		mount("devB", "/mnt", "mem").unwrap();
		let (_, rel) = resolve("/mnt/data").unwrap();
		assert_eq!(rel, "/data");
		let (_, rel_root) = resolve("/etc/passwd").unwrap();
		assert_eq!(rel_root, "/etc/passwd");
	}

	#[test]
	fn open_missing_without_create_fails() {
		reset();
		struct Empty;
		impl FileSystem for Empty {
			fn name(&self) -> &str {
				"empty"
			}
			fn mount(&self, _d: &str, _m: &str) -> Result<()> {
				Ok(())
			}
		}
		register_filesystem("empty", || AllocArc::new(Empty)).unwrap();
		mount("devA", "/", "empty").unwrap();
		let r = open("/nope", OpenFlags(OpenFlags::READ));
		assert_eq!(r, Err(Error::ENOENT));
	}
}
