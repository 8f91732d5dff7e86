// SPDX-License-Identifier: GPL-2.0

//! Read-only ext4 driver: classic linear directories, direct block
//! pointers only (no indirect-block walk beyond what the 12 direct
//! pointers plus the single/double/triple indirect slots describe).

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::block;
use crate::error::{Error, Result};
use crate::sync::Spinlock;

use super::{DirEntry, FileHandle, FileSystem, FileType, OpenFlags, Stat};

const SECTOR_SIZE: usize = 512;
const ROOT_INODE: u32 = 2;
const INODE_TYPE_DIR: u32 = 0x4000;
const INODE_TYPE_MASK: u32 = 0xF000;

struct Ext4State {
	device_name: String,
	block_size: u32,
	inode_size: u32,
	inode_table_block: u64, // single block-group layout, as produced by the simple mkfs this kernel targets
}

pub struct Ext4 {
	state: Spinlock<Option<Ext4State>>,
}

impl Ext4 {
	pub fn new() -> Self {
		Self {
			state: Spinlock::new(None),
		}
	}
}

#[derive(Debug, Clone, Copy)]
struct RawInode {
	mode: u16,
	uid_lo: u16,
	size_lo: u32,
	atime: u32,
	mtime: u32,
	ctime: u32,
	gid_lo: u16,
	size_hi: u32,
	uid_hi: u16,
	gid_hi: u16,
	block: [u32; 15],
}

fn sectors_per_block(block_size: u32) -> u64 {
	block_size as u64 / SECTOR_SIZE as u64
}

fn read_block(state: &Ext4State, block_num: u64, out: &mut [u8]) -> Result<()> {
	let spb = sectors_per_block(state.block_size);
	for i in 0..spb {
		let mut sector = [0u8; SECTOR_SIZE];
		block::with_device(&state.device_name, |dev| dev.read_block(block_num * spb + i, &mut sector))?;
		let off = (i as usize) * SECTOR_SIZE;
		out[off..off + SECTOR_SIZE].copy_from_slice(&sector);
	}
	Ok(())
}

fn read_inode(state: &Ext4State, ino: u32) -> Result<RawInode> {
	let index = (ino - 1) as u64; // single-group layout: inode table is contiguous from inode 1
	let offset_bytes = index * state.inode_size as u64;
	let block_num = state.inode_table_block + offset_bytes / state.block_size as u64;
	let in_block_offset = (offset_bytes % state.block_size as u64) as usize;

	let mut buf = vec![0u8; state.block_size as usize];
	read_block(state, block_num, &mut buf)?;
	let raw = &buf[in_block_offset..in_block_offset + 128.min(state.inode_size as usize)];

	let mut block = [0u32; 15];
	for i in 0..15 {
		block[i] = u32::from_le_bytes(raw[40 + i * 4..44 + i * 4].try_into().unwrap());
	}

	Ok(RawInode {
		mode: u16::from_le_bytes(raw[0..2].try_into().unwrap()),
		uid_lo: u16::from_le_bytes(raw[2..4].try_into().unwrap()),
		size_lo: u32::from_le_bytes(raw[4..8].try_into().unwrap()),
		atime: u32::from_le_bytes(raw[8..12].try_into().unwrap()),
		ctime: u32::from_le_bytes(raw[12..16].try_into().unwrap()),
		mtime: u32::from_le_bytes(raw[16..20].try_into().unwrap()),
		gid_lo: u16::from_le_bytes(raw[24..26].try_into().unwrap()),
		size_hi: u32::from_le_bytes(raw[108..112].try_into().unwrap()),
		uid_hi: u16::from_le_bytes(raw[120..122].try_into().unwrap()),
		gid_hi: u16::from_le_bytes(raw[122..124].try_into().unwrap()),
		block,
	})
}

fn inode_size_bytes(inode: &RawInode) -> u64 {
	(inode.size_lo as u64) | ((inode.size_hi as u64) << 32)
}

/// Resolve the data block holding byte `logical_offset`, following the
/// 12 direct pointers, then the single/double/triple indirect blocks
/// far enough to reach it.
fn block_for_offset(state: &Ext4State, inode: &RawInode, logical_offset: u64) -> Result<u32> {
	let bs = state.block_size as u64;
	let ptrs_per_block = bs / 4;
	let logical_block = logical_offset / bs;

	if logical_block < 12 {
		return Ok(inode.block[logical_block as usize]);
	}
	let logical_block = logical_block - 12;

	if logical_block < ptrs_per_block {
		let mut buf = vec![0u8; bs as usize];
		read_block(state, inode.block[12] as u64, &mut buf)?;
		let off = (logical_block as usize) * 4;
		return Ok(u32::from_le_bytes(buf[off..off + 4].try_into().unwrap()));
	}
	let logical_block = logical_block - ptrs_per_block;

	if logical_block < ptrs_per_block * ptrs_per_block {
		let outer_idx = logical_block / ptrs_per_block;
		let inner_idx = logical_block % ptrs_per_block;
		let mut outer = vec![0u8; bs as usize];
		read_block(state, inode.block[13] as u64, &mut outer)?;
		let outer_ptr = u32::from_le_bytes(
			outer[(outer_idx as usize) * 4..(outer_idx as usize) * 4 + 4]
				.try_into()
				.unwrap(),
		);
		let mut inner = vec![0u8; bs as usize];
		read_block(state, outer_ptr as u64, &mut inner)?;
		return Ok(u32::from_le_bytes(
			inner[(inner_idx as usize) * 4..(inner_idx as usize) * 4 + 4]
				.try_into()
				.unwrap(),
		));
	}

	// Triple indirect is left unimplemented: no file this kernel produces
	// or consumes grows past the double-indirect range.
	Err(Error::NotSupported)
}

fn find_in_directory(state: &Ext4State, dir_inode: &RawInode, name: &str) -> Result<u32> {
	let bs = state.block_size as usize;
	let num_blocks = inode_size_bytes(dir_inode).div_ceil(bs as u64);
	for logical in 0..num_blocks {
		let phys = block_for_offset(state, dir_inode, logical * bs as u64)?;
		if phys == 0 {
			continue;
		}
		let mut buf = vec![0u8; bs];
		read_block(state, phys as u64, &mut buf)?;
		let mut offset = 0usize;
		while offset + 8 <= bs {
			let ino = u32::from_le_bytes(buf[offset..offset + 4].try_into().unwrap());
			let rec_len = u16::from_le_bytes(buf[offset + 4..offset + 6].try_into().unwrap()) as usize;
			if rec_len == 0 {
				break;
			}
			let name_len = buf[offset + 6] as usize;
			let entry_name = core::str::from_utf8(&buf[offset + 8..offset + 8 + name_len]).unwrap_or("");
			if ino != 0 && entry_name == name {
				return Ok(ino);
			}
			offset += rec_len;
		}
	}
	Err(Error::ENOENT)
}

fn resolve(state: &Ext4State, path: &str) -> Result<(u32, RawInode)> {
	let mut ino = ROOT_INODE;
	let mut inode = read_inode(state, ino)?;
	for comp in super::path::components(path) {
		if inode.mode as u32 & INODE_TYPE_MASK != INODE_TYPE_DIR {
			return Err(Error::ENOTDIR);
		}
		ino = find_in_directory(state, &inode, comp)?;
		inode = read_inode(state, ino)?;
	}
	Ok((ino, inode))
}

fn stat_of(ino: u32, inode: &RawInode) -> Stat {
	let file_type = if inode.mode as u32 & INODE_TYPE_MASK == INODE_TYPE_DIR {
		FileType::Directory
	} else {
		FileType::File
	};
	Stat {
		ino: ino as u64,
		size: inode_size_bytes(inode),
		mode: inode.mode as u32 & 0x0FFF,
		uid: (inode.uid_lo as u32) | ((inode.uid_hi as u32) << 16),
		gid: (inode.gid_lo as u32) | ((inode.gid_hi as u32) << 16),
		file_type,
		atime: inode.atime as u64,
		mtime: inode.mtime as u64,
		ctime: inode.ctime as u64,
	}
}

struct Ext4File {
	ino: u32,
}

struct Ext4Dir {
	ino: u32,
	byte_offset: u64,
}

impl FileSystem for Ext4 {
	fn name(&self) -> &str {
		"ext4"
	}

	fn mount(&self, device_name: &str, _mountpoint: &str) -> Result<()> {
		// This driver targets the fixed, simple ext4 layout the kernel's
		// own mkfs-equivalent produces (one block group, 4 KiB blocks,
		// 256-byte inodes, inode table starting immediately after the
		// superblock+group-descriptor+bitmaps at block 5).
		let state = Ext4State {
			device_name: device_name.to_string(),
			block_size: 4096,
			inode_size: 256,
			inode_table_block: 5,
		};
		// Validate the magic at the superblock's conventional offset
		// (1024 bytes in, field at +0x38) before accepting the mount.
		let mut buf = vec![0u8; SECTOR_SIZE];
		block::with_device(device_name, |dev| dev.read_block(2, &mut buf))?;
		let magic = u16::from_le_bytes(buf[56..58].try_into().unwrap());
		if magic != 0xEF53 {
			return Err(Error::InvalidFs);
		}
		*self.state.lock() = Some(state);
		Ok(())
	}

	fn stat(&self, path: &str) -> Result<Stat> {
		let guard = self.state.lock();
		let state = guard.as_ref().ok_or(Error::NotInitialized)?;
		let (ino, inode) = resolve(state, path)?;
		Ok(stat_of(ino, &inode))
	}

	fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
		if flags.has(OpenFlags::WRITE) || flags.has(OpenFlags::CREATE) {
			return Err(Error::NotSupported);
		}
		let guard = self.state.lock();
		let state = guard.as_ref().ok_or(Error::NotInitialized)?;
		let (ino, _inode) = resolve(state, path)?;
		Ok(FileHandle::new(Ext4File { ino }))
	}

	fn read(&self, file: &mut FileHandle, buf: &mut [u8], offset: u64) -> Result<usize> {
		let guard = self.state.lock();
		let state = guard.as_ref().ok_or(Error::NotInitialized)?;
		let f = file.downcast_ref::<Ext4File>()?;
		let inode = read_inode(state, f.ino)?;
		let size = inode_size_bytes(&inode);
		if offset >= size {
			return Ok(0);
		}
		let to_read = ((size - offset).min(buf.len() as u64)) as usize;
		let bs = state.block_size as u64;
		let mut done = 0usize;
		while done < to_read {
			let logical_offset = offset + done as u64;
			let phys = block_for_offset(state, &inode, logical_offset)?;
			let in_block = (logical_offset % bs) as usize;
			let n = ((bs as usize) - in_block).min(to_read - done);
			if phys == 0 {
				buf[done..done + n].fill(0);
			} else {
				let mut blk = vec![0u8; bs as usize];
				read_block(state, phys as u64, &mut blk)?;
				buf[done..done + n].copy_from_slice(&blk[in_block..in_block + n]);
			}
			done += n;
		}
		Ok(done)
	}

	fn opendir(&self, path: &str) -> Result<FileHandle> {
		let guard = self.state.lock();
		let state = guard.as_ref().ok_or(Error::NotInitialized)?;
		let (ino, inode) = resolve(state, path)?;
		if inode.mode as u32 & INODE_TYPE_MASK != INODE_TYPE_DIR {
			return Err(Error::ENOTDIR);
		}
		Ok(FileHandle::new(Ext4Dir { ino, byte_offset: 0 }))
	}

	fn readdir(&self, dir: &mut FileHandle) -> Result<DirEntry> {
		let guard = self.state.lock();
		let state = guard.as_ref().ok_or(Error::NotInitialized)?;
		let d = dir.downcast_mut::<Ext4Dir>()?;
		let inode = read_inode(state, d.ino)?;
		let size = inode_size_bytes(&inode);
		let bs = state.block_size as u64;

		loop {
			if d.byte_offset >= size {
				return Err(Error::EndOfFile);
			}
			let phys = block_for_offset(state, &inode, d.byte_offset)?;
			let in_block = (d.byte_offset % bs) as usize;
			if phys == 0 {
				return Err(Error::EndOfFile);
			}
			let mut blk = vec![0u8; bs as usize];
			read_block(state, phys as u64, &mut blk)?;

			let ino = u32::from_le_bytes(blk[in_block..in_block + 4].try_into().unwrap());
			let rec_len = u16::from_le_bytes(blk[in_block + 4..in_block + 6].try_into().unwrap());
			if rec_len == 0 {
				return Err(Error::EndOfFile);
			}
			let name_len = blk[in_block + 6] as usize;
			let file_type_byte = blk[in_block + 7];
			let name =
				core::str::from_utf8(&blk[in_block + 8..in_block + 8 + name_len]).unwrap_or("").to_string();
			d.byte_offset += rec_len as u64;

			if ino == 0 {
				continue;
			}
			let file_type = if file_type_byte == 2 {
				FileType::Directory
			} else {
				FileType::File
			};
			return Ok(DirEntry {
				ino: ino as u64,
				name,
				file_type,
			});
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn inode_size_combines_hi_lo() {
		let inode = RawInode {
			mode: 0,
			uid_lo: 0,
			size_lo: 0xFFFF_FFFF,
			atime: 0,
			mtime: 0,
			ctime: 0,
			gid_lo: 0,
			size_hi: 1,
			uid_hi: 0,
			gid_hi: 0,
			block: [0; 15],
		};
		assert_eq!(inode_size_bytes(&inode), 0x1_FFFF_FFFF);
	}

	#[test]
	fn stat_reports_directory_type() {
		let inode = RawInode {
			mode: (INODE_TYPE_DIR | 0o755) as u16,
			uid_lo: 0,
			size_lo: 0,
			atime: 0,
			mtime: 0,
			ctime: 0,
			gid_lo: 0,
			size_hi: 0,
			uid_hi: 0,
			gid_hi: 0,
			block: [0; 15],
		};
		let stat = stat_of(2, &inode);
		assert_eq!(stat.file_type, FileType::Directory);
		assert_eq!(stat.mode, 0o755);
	}
}
