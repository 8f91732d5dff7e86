// SPDX-License-Identifier: GPL-2.0

//! SFS ("Scarlett File System"): a small teaching filesystem with an
//! explicit superblock, bitmap allocator, and direct-block-only inodes.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::block;
use crate::error::{Error, Result};
use crate::sync::Spinlock;

use super::{DirEntry, FileHandle, FileSystem, FileType, OpenFlags, Stat};

const SECTOR_SIZE: usize = 512;
const MAGIC: u32 = 0x5346_5321;
const ROOT_INODE: u32 = 1;
const NAME_MAX: usize = 59;
const DIRENT_SIZE: usize = 64; // 4-byte inode + 59-byte name + 1 pad
const DIRECT_BLOCKS: usize = 12;
const INODE_SIZE: usize = 96;

#[derive(Clone, Copy)]
struct Superblock {
	block_size: u32,
	blocks_count: u32,
	inodes_count: u32,
	inode_bitmap_block: u32,
	block_bitmap_block: u32,
	inode_table_block: u32,
	data_block_start: u32,
}

struct SfsState {
	device_name: String,
	sb: Superblock,
}

pub struct Sfs {
	state: Spinlock<Option<SfsState>>,
}

impl Sfs {
	pub fn new() -> Self {
		Self {
			state: Spinlock::new(None),
		}
	}
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum InodeType {
	File,
	Directory,
}

#[derive(Debug, Clone, Copy)]
struct RawInode {
	itype: InodeType,
	mode: u32,
	size: u64,
	uid: u32,
	gid: u32,
	atime: u64,
	mtime: u64,
	ctime: u64,
	blocks: [u32; DIRECT_BLOCKS],
}

fn sectors_per_block(block_size: u32) -> u64 {
	block_size as u64 / SECTOR_SIZE as u64
}

fn read_device_block(device_name: &str, block_size: u32, block_num: u64, out: &mut [u8]) -> Result<()> {
	let spb = sectors_per_block(block_size);
	for i in 0..spb {
		let mut sector = [0u8; SECTOR_SIZE];
		block::with_device(device_name, |dev| dev.read_block(block_num * spb + i, &mut sector))?;
		let off = (i as usize) * SECTOR_SIZE;
		out[off..off + SECTOR_SIZE].copy_from_slice(&sector);
	}
	Ok(())
}

fn write_device_block(device_name: &str, block_size: u32, block_num: u64, data: &[u8]) -> Result<()> {
	let spb = sectors_per_block(block_size);
	for i in 0..spb {
		let off = (i as usize) * SECTOR_SIZE;
		let mut sector = [0u8; SECTOR_SIZE];
		sector.copy_from_slice(&data[off..off + SECTOR_SIZE]);
		block::with_device(device_name, |dev| dev.write_block(block_num * spb + i, &sector))?;
	}
	Ok(())
}

fn parse_superblock(buf: &[u8]) -> Result<Superblock> {
	let magic = u32::from_le_bytes(buf[0..4].try_into().unwrap());
	if magic != MAGIC {
		return Err(Error::InvalidFs);
	}
	Ok(Superblock {
		block_size: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
		blocks_count: u32::from_le_bytes(buf[8..12].try_into().unwrap()),
		inodes_count: u32::from_le_bytes(buf[12..16].try_into().unwrap()),
		inode_bitmap_block: u32::from_le_bytes(buf[24..28].try_into().unwrap()),
		block_bitmap_block: u32::from_le_bytes(buf[28..32].try_into().unwrap()),
		inode_table_block: u32::from_le_bytes(buf[32..36].try_into().unwrap()),
		data_block_start: u32::from_le_bytes(buf[36..40].try_into().unwrap()),
	})
}

fn write_superblock(buf: &mut [u8], sb: &Superblock, free_blocks: u32, free_inodes: u32) {
	buf[0..4].copy_from_slice(&MAGIC.to_le_bytes());
	buf[4..8].copy_from_slice(&sb.block_size.to_le_bytes());
	buf[8..12].copy_from_slice(&sb.blocks_count.to_le_bytes());
	buf[12..16].copy_from_slice(&sb.inodes_count.to_le_bytes());
	buf[16..20].copy_from_slice(&free_blocks.to_le_bytes());
	buf[20..24].copy_from_slice(&free_inodes.to_le_bytes());
	buf[24..28].copy_from_slice(&sb.inode_bitmap_block.to_le_bytes());
	buf[28..32].copy_from_slice(&sb.block_bitmap_block.to_le_bytes());
	buf[32..36].copy_from_slice(&sb.inode_table_block.to_le_bytes());
	buf[36..40].copy_from_slice(&sb.data_block_start.to_le_bytes());
	buf[40..44].copy_from_slice(&ROOT_INODE.to_le_bytes());
}

/// Format `device_name` as a fresh SFS volume: write the superblock,
/// zero both bitmaps, mark inode 1 used, and write the root directory
/// inode.
pub fn format(device_name: &str, device_size_bytes: u64) -> Result<()> {
	let block_size: u32 = 4096;
	let total_blocks = (device_size_bytes / block_size as u64) as u32;
	let inodes_count = total_blocks / 4;
	let inode_table_blocks = ((inodes_count as u64 * INODE_SIZE as u64).div_ceil(block_size as u64)) as u32;
	let data_start = 3 + inode_table_blocks;

	let sb = Superblock {
		block_size,
		blocks_count: total_blocks.saturating_sub(data_start),
		inodes_count,
		inode_bitmap_block: 1,
		block_bitmap_block: 2,
		inode_table_block: 3,
		data_block_start: data_start,
	};

	let mut sb_buf = vec![0u8; block_size as usize];
	write_superblock(&mut sb_buf, &sb, sb.blocks_count, inodes_count - 1);
	write_device_block(device_name, block_size, 0, &sb_buf)?;

	let mut inode_bitmap = vec![0u8; block_size as usize];
	inode_bitmap[0] |= 0x01; // inode 1 (bit 0) used
	write_device_block(device_name, block_size, 1, &inode_bitmap)?;

	let block_bitmap = vec![0u8; block_size as usize];
	write_device_block(device_name, block_size, 2, &block_bitmap)?;

	let mut table = vec![0u8; (inode_table_blocks * block_size) as usize];
	let root = RawInode {
		itype: InodeType::Directory,
		mode: 0o755,
		size: 0,
		uid: 0,
		gid: 0,
		atime: 0,
		mtime: 0,
		ctime: 0,
		blocks: [0; DIRECT_BLOCKS],
	};
	write_inode_into(&mut table[0..INODE_SIZE], &root);
	for b in 0..inode_table_blocks {
		let off = (b * block_size) as usize;
		write_device_block(device_name, block_size, 3 + b as u64, &table[off..off + block_size as usize])?;
	}

	Ok(())
}

fn write_inode_into(buf: &mut [u8], inode: &RawInode) {
	buf[0] = match inode.itype {
		InodeType::File => 0,
		InodeType::Directory => 1,
	};
	buf[4..8].copy_from_slice(&inode.mode.to_le_bytes());
	buf[8..16].copy_from_slice(&inode.size.to_le_bytes());
	buf[16..20].copy_from_slice(&inode.uid.to_le_bytes());
	buf[20..24].copy_from_slice(&inode.gid.to_le_bytes());
	buf[24..32].copy_from_slice(&inode.atime.to_le_bytes());
	buf[32..40].copy_from_slice(&inode.mtime.to_le_bytes());
	buf[40..48].copy_from_slice(&inode.ctime.to_le_bytes());
	for (i, b) in inode.blocks.iter().enumerate() {
		let off = 48 + i * 4;
		buf[off..off + 4].copy_from_slice(&b.to_le_bytes());
	}
}

fn read_inode_from(buf: &[u8]) -> RawInode {
	let itype = if buf[0] == 1 { InodeType::Directory } else { InodeType::File };
	let mut blocks = [0u32; DIRECT_BLOCKS];
	for i in 0..DIRECT_BLOCKS {
		let off = 48 + i * 4;
		blocks[i] = u32::from_le_bytes(buf[off..off + 4].try_into().unwrap());
	}
	RawInode {
		itype,
		mode: u32::from_le_bytes(buf[4..8].try_into().unwrap()),
		size: u64::from_le_bytes(buf[8..16].try_into().unwrap()),
		uid: u32::from_le_bytes(buf[16..20].try_into().unwrap()),
		gid: u32::from_le_bytes(buf[20..24].try_into().unwrap()),
		atime: u64::from_le_bytes(buf[24..32].try_into().unwrap()),
		mtime: u64::from_le_bytes(buf[32..40].try_into().unwrap()),
		ctime: u64::from_le_bytes(buf[40..48].try_into().unwrap()),
		blocks,
	}
}

fn inodes_per_block(sb: &Superblock) -> u32 {
	sb.block_size / INODE_SIZE as u32
}

fn read_inode(state: &SfsState, ino: u32) -> Result<RawInode> {
	let idx = ino - 1;
	let per_block = inodes_per_block(&state.sb);
	let block_num = state.sb.inode_table_block as u64 + (idx / per_block) as u64;
	let in_block_offset = (idx % per_block) as usize * INODE_SIZE;

	let mut buf = vec![0u8; state.sb.block_size as usize];
	read_device_block(&state.device_name, state.sb.block_size, block_num, &mut buf)?;
	Ok(read_inode_from(&buf[in_block_offset..in_block_offset + INODE_SIZE]))
}

fn write_inode(state: &SfsState, ino: u32, inode: &RawInode) -> Result<()> {
	let idx = ino - 1;
	let per_block = inodes_per_block(&state.sb);
	let block_num = state.sb.inode_table_block as u64 + (idx / per_block) as u64;
	let in_block_offset = (idx % per_block) as usize * INODE_SIZE;

	let mut buf = vec![0u8; state.sb.block_size as usize];
	read_device_block(&state.device_name, state.sb.block_size, block_num, &mut buf)?;
	write_inode_into(&mut buf[in_block_offset..in_block_offset + INODE_SIZE], inode);
	write_device_block(&state.device_name, state.sb.block_size, block_num, &buf)
}

/// Scan the bitmap starting at bit 0, claim the first clear bit, and
/// persist the bitmap. Returns the bit index (not yet offset into the
/// inode/data-block number space).
fn alloc_bit(state: &SfsState, bitmap_block: u32, count: u32) -> Result<u32> {
	let mut buf = vec![0u8; state.sb.block_size as usize];
	read_device_block(&state.device_name, state.sb.block_size, bitmap_block as u64, &mut buf)?;
	for bit in 0..count {
		let byte = (bit / 8) as usize;
		let mask = 1u8 << (bit % 8);
		if buf[byte] & mask == 0 {
			buf[byte] |= mask;
			write_device_block(&state.device_name, state.sb.block_size, bitmap_block as u64, &buf)?;
			return Ok(bit);
		}
	}
	Err(Error::ENOSPC)
}

fn alloc_data_block(state: &SfsState) -> Result<u32> {
	let bit = alloc_bit(state, state.sb.block_bitmap_block, state.sb.blocks_count)?;
	Ok(bit + state.sb.data_block_start)
}

fn alloc_inode(state: &SfsState) -> Result<u32> {
	let bit = alloc_bit(state, state.sb.inode_bitmap_block, state.sb.inodes_count)?;
	Ok(bit + 1)
}

fn read_data_block(state: &SfsState, block_num: u32, out: &mut [u8]) -> Result<()> {
	read_device_block(&state.device_name, state.sb.block_size, block_num as u64, out)
}

fn write_data_block(state: &SfsState, block_num: u32, data: &[u8]) -> Result<()> {
	write_device_block(&state.device_name, state.sb.block_size, block_num as u64, data)
}

fn parse_dirent(buf: &[u8]) -> Option<(u32, String)> {
	let ino = u32::from_le_bytes(buf[0..4].try_into().unwrap());
	if ino == 0 {
		return None;
	}
	let raw = &buf[4..4 + NAME_MAX];
	let len = raw.iter().position(|&b| b == 0).unwrap_or(NAME_MAX);
	let name = core::str::from_utf8(&raw[..len]).ok()?.to_string();
	Some((ino, name))
}

fn write_dirent(buf: &mut [u8], ino: u32, name: &str) {
	buf[0..4].copy_from_slice(&ino.to_le_bytes());
	buf[4..4 + NAME_MAX].fill(0);
	let bytes = name.as_bytes();
	let n = bytes.len().min(NAME_MAX);
	buf[4..4 + n].copy_from_slice(&bytes[..n]);
}

fn find_in_directory(state: &SfsState, dir: &RawInode, name: &str) -> Result<u32> {
	let per_block = (state.sb.block_size as usize) / DIRENT_SIZE;
	let num_blocks = (dir.size as usize).div_ceil(state.sb.block_size as usize).max(1);
	for b in 0..num_blocks.min(DIRECT_BLOCKS) {
		let blk = dir.blocks[b];
		if blk == 0 {
			continue;
		}
		let mut buf = vec![0u8; state.sb.block_size as usize];
		read_data_block(state, blk, &mut buf)?;
		for i in 0..per_block {
			let off = i * DIRENT_SIZE;
			if let Some((ino, entry_name)) = parse_dirent(&buf[off..off + DIRENT_SIZE]) {
				if entry_name == name {
					return Ok(ino);
				}
			}
		}
	}
	Err(Error::NotFound)
}

/// Find the first free directory-entry slot in `dir`, extending the
/// chain by one block if every existing block is full. Returns
/// `(block_num, byte_offset_within_block)`.
fn find_free_dirent(state: &mut SfsState, dir: &mut RawInode) -> Result<(u32, usize)> {
	let per_block = (state.sb.block_size as usize) / DIRENT_SIZE;
	for b in 0..DIRECT_BLOCKS {
		if dir.blocks[b] == 0 {
			let new_block = alloc_data_block(state)?;
			dir.blocks[b] = new_block;
			let zeros = vec![0u8; state.sb.block_size as usize];
			write_data_block(state, new_block, &zeros)?;
			return Ok((new_block, 0));
		}
		let blk = dir.blocks[b];
		let mut buf = vec![0u8; state.sb.block_size as usize];
		read_data_block(state, blk, &mut buf)?;
		for i in 0..per_block {
			let off = i * DIRENT_SIZE;
			if parse_dirent(&buf[off..off + DIRENT_SIZE]).is_none() {
				return Ok((blk, off));
			}
		}
	}
	Err(Error::ENOSPC)
}

struct SfsFile {
	ino: u32,
}

struct SfsDir {
	ino: u32,
	block_idx: usize,
	entry_idx: usize,
}

fn stat_of(ino: u32, inode: &RawInode) -> Stat {
	Stat {
		ino: ino as u64,
		size: inode.size,
		mode: inode.mode,
		uid: inode.uid,
		gid: inode.gid,
		file_type: match inode.itype {
			InodeType::Directory => FileType::Directory,
			InodeType::File => FileType::File,
		},
		atime: inode.atime,
		mtime: inode.mtime,
		ctime: inode.ctime,
	}
}

impl FileSystem for Sfs {
	fn name(&self) -> &str {
		"sfs"
	}

	fn mount(&self, device_name: &str, _mountpoint: &str) -> Result<()> {
		let mut buf = [0u8; SECTOR_SIZE];
		block::with_device(device_name, |dev| dev.read_block(0, &mut buf))?;
		let sb = parse_superblock(&buf)?;
		*self.state.lock() = Some(SfsState {
			device_name: device_name.to_string(),
			sb,
		});
		Ok(())
	}

	fn stat(&self, path: &str) -> Result<Stat> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let (ino, inode) = resolve(state, path)?;
		Ok(stat_of(ino, &inode))
	}

	fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;

		match resolve(state, path) {
			Ok((ino, mut inode)) => {
				if flags.has(OpenFlags::TRUNC) {
					inode.size = 0;
					inode.blocks = [0; DIRECT_BLOCKS];
					write_inode(state, ino, &inode)?;
				}
				Ok(FileHandle::new(SfsFile { ino }))
			}
			Err(Error::NotFound) if flags.has(OpenFlags::CREATE) => {
				let ino = create_entry(state, path, InodeType::File, 0o644)?;
				Ok(FileHandle::new(SfsFile { ino }))
			}
			Err(e) => Err(e),
		}
	}

	fn read(&self, file: &mut FileHandle, buf: &mut [u8], offset: u64) -> Result<usize> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let f = file.downcast_ref::<SfsFile>()?;
		let inode = read_inode(state, f.ino)?;
		if offset >= inode.size {
			return Ok(0);
		}
		let bs = state.sb.block_size as u64;
		let to_read = ((inode.size - offset).min(buf.len() as u64)) as usize;
		let mut done = 0usize;
		while done < to_read {
			let logical = offset + done as u64;
			let idx = (logical / bs) as usize;
			if idx >= DIRECT_BLOCKS {
				break;
			}
			let in_block = (logical % bs) as usize;
			let n = ((bs as usize) - in_block).min(to_read - done);
			let blk = inode.blocks[idx];
			if blk == 0 {
				buf[done..done + n].fill(0);
			} else {
				let mut data = vec![0u8; bs as usize];
				read_data_block(state, blk, &mut data)?;
				buf[done..done + n].copy_from_slice(&data[in_block..in_block + n]);
			}
			done += n;
		}
		Ok(done)
	}

	fn write(&self, file: &mut FileHandle, buf: &[u8], offset: u64) -> Result<usize> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let f = file.downcast_ref::<SfsFile>()?;
		let mut inode = read_inode(state, f.ino)?;

		let bs = state.sb.block_size as u64;
		let mut done = 0usize;
		while done < buf.len() {
			let logical = offset + done as u64;
			let idx = (logical / bs) as usize;
			if idx >= DIRECT_BLOCKS {
				return Err(Error::ENOSPC); // max file size = 12 * block_size
			}
			let in_block = (logical % bs) as usize;
			let n = ((bs as usize) - in_block).min(buf.len() - done);

			if inode.blocks[idx] == 0 {
				inode.blocks[idx] = alloc_data_block(state)?;
			}
			let blk = inode.blocks[idx];

			let mut data = vec![0u8; bs as usize];
			if n < bs as usize {
				read_data_block(state, blk, &mut data)?;
			}
			data[in_block..in_block + n].copy_from_slice(&buf[done..done + n]);
			write_data_block(state, blk, &data)?;

			done += n;
			let end = logical + n as u64;
			if end > inode.size {
				inode.size = end;
			}
		}

		write_inode(state, f.ino, &inode)?;
		Ok(done)
	}

	fn mkdir(&self, path: &str, mode: u32) -> Result<()> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		match resolve(state, path) {
			Ok(_) => Err(Error::AlreadyExists),
			Err(Error::NotFound) => {
				create_entry(state, path, InodeType::Directory, mode)?;
				Ok(())
			}
			Err(e) => Err(e),
		}
	}

	fn unlink(&self, path: &str) -> Result<()> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let (ino, inode) = resolve(state, path)?;
		if inode.itype == InodeType::Directory {
			return Err(Error::EISDIR);
		}
		remove_entry(state, path, ino)
	}

	fn opendir(&self, path: &str) -> Result<FileHandle> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let (ino, inode) = resolve(state, path)?;
		if inode.itype != InodeType::Directory {
			return Err(Error::ENOTDIR);
		}
		Ok(FileHandle::new(SfsDir {
			ino,
			block_idx: 0,
			entry_idx: 0,
		}))
	}

	fn readdir(&self, dir: &mut FileHandle) -> Result<DirEntry> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let d = dir.downcast_mut::<SfsDir>()?;
		let inode = read_inode(state, d.ino)?;
		let per_block = (state.sb.block_size as usize) / DIRENT_SIZE;

		loop {
			if d.block_idx >= DIRECT_BLOCKS {
				return Err(Error::EndOfFile);
			}
			let blk = inode.blocks[d.block_idx];
			if blk == 0 {
				return Err(Error::EndOfFile);
			}
			let mut buf = vec![0u8; state.sb.block_size as usize];
			read_data_block(state, blk, &mut buf)?;

			if d.entry_idx >= per_block {
				d.entry_idx = 0;
				d.block_idx += 1;
				continue;
			}
			let off = d.entry_idx * DIRENT_SIZE;
			d.entry_idx += 1;
			if let Some((ino, name)) = parse_dirent(&buf[off..off + DIRENT_SIZE]) {
				let entry_inode = read_inode(state, ino)?;
				return Ok(DirEntry {
					ino: ino as u64,
					name,
					file_type: match entry_inode.itype {
						InodeType::Directory => FileType::Directory,
						InodeType::File => FileType::File,
					},
				});
			}
		}
	}
}

/// Resolve a multi-component path. Every intermediate component must
/// already exist as a directory: SFS does not auto-vivify parents.
fn resolve(state: &mut SfsState, path: &str) -> Result<(u32, RawInode)> {
	let mut ino = ROOT_INODE;
	let mut inode = read_inode(state, ino)?;
	for comp in super::path::components(path) {
		if inode.itype != InodeType::Directory {
			return Err(Error::ENOTDIR);
		}
		ino = find_in_directory(state, &inode, comp)?;
		inode = read_inode(state, ino)?;
	}
	Ok((ino, inode))
}

/// Create a new file or directory entry at `path`. Per the format's
/// single-level creation rule, every component up to the last must
/// already exist; only the final component is newly created, and it may
/// be created directly under root or under any already-existing
/// directory reached by walking the intermediate components.
fn create_entry(state: &mut SfsState, path: &str, itype: InodeType, mode: u32) -> Result<u32> {
	let comps = super::path::components(path);
	let Some((&leaf, parents)) = comps.split_last() else {
		return Err(Error::InvalidArgument);
	};
	if leaf.len() > NAME_MAX {
		return Err(Error::InvalidArgument);
	}

	let mut parent_ino = ROOT_INODE;
	let mut parent_inode = read_inode(state, parent_ino)?;
	for comp in parents {
		if parent_inode.itype != InodeType::Directory {
			return Err(Error::ENOTDIR);
		}
		parent_ino = find_in_directory(state, &parent_inode, comp)?;
		parent_inode = read_inode(state, parent_ino)?;
	}
	if parent_inode.itype != InodeType::Directory {
		return Err(Error::ENOTDIR);
	}

	let new_ino = alloc_inode(state)?;
	let new_inode = RawInode {
		itype,
		mode,
		size: 0,
		uid: 0,
		gid: 0,
		atime: 0,
		mtime: 0,
		ctime: 0,
		blocks: [0; DIRECT_BLOCKS],
	};
	write_inode(state, new_ino, &new_inode)?;

	let (blk, off) = find_free_dirent(state, &mut parent_inode)?;
	let mut buf = vec![0u8; state.sb.block_size as usize];
	read_data_block(state, blk, &mut buf)?;
	write_dirent(&mut buf[off..off + DIRENT_SIZE], new_ino, leaf);
	write_data_block(state, blk, &buf)?;
	if off as u64 + DIRENT_SIZE as u64 > parent_inode.size {
		parent_inode.size = off as u64 + DIRENT_SIZE as u64;
	}
	write_inode(state, parent_ino, &parent_inode)?;

	Ok(new_ino)
}

fn remove_entry(state: &mut SfsState, path: &str, _ino: u32) -> Result<()> {
	let comps = super::path::components(path);
	let Some((&leaf, parents)) = comps.split_last() else {
		return Err(Error::InvalidArgument);
	};

	let mut parent_ino = ROOT_INODE;
	let mut parent_inode = read_inode(state, parent_ino)?;
	for comp in parents {
		parent_ino = find_in_directory(state, &parent_inode, comp)?;
		parent_inode = read_inode(state, parent_ino)?;
	}
	let _ = parent_ino;

	let per_block = (state.sb.block_size as usize) / DIRENT_SIZE;
	for b in 0..DIRECT_BLOCKS {
		let blk = parent_inode.blocks[b];
		if blk == 0 {
			continue;
		}
		let mut buf = vec![0u8; state.sb.block_size as usize];
		read_data_block(state, blk, &mut buf)?;
		for i in 0..per_block {
			let off = i * DIRENT_SIZE;
			if let Some((_ino, name)) = parse_dirent(&buf[off..off + DIRENT_SIZE]) {
				if name == leaf {
					buf[off..off + 4].copy_from_slice(&0u32.to_le_bytes());
					write_data_block(state, blk, &buf)?;
					return Ok(());
				}
			}
		}
	}
	Err(Error::NotFound)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn superblock_round_trips() {
		let sb = Superblock {
			block_size: 4096,
			blocks_count: 100,
			inodes_count: 25,
			inode_bitmap_block: 1,
			block_bitmap_block: 2,
			inode_table_block: 3,
			data_block_start: 6,
		};
		let mut buf = vec![0u8; 4096];
		write_superblock(&mut buf, &sb, 90, 20);
		let parsed = parse_superblock(&buf).unwrap();
		assert_eq!(parsed.block_size, 4096);
		assert_eq!(parsed.blocks_count, 100);
		assert_eq!(parsed.data_block_start, 6);
	}

	#[test]
	fn dirent_round_trips_name() {
		let mut buf = [0u8; DIRENT_SIZE];
		write_dirent(&mut buf, 7, "hello.txt");
		let (ino, name) = parse_dirent(&buf).unwrap();
		assert_eq!(ino, 7);
		assert_eq!(name, "hello.txt");
	}

	#[test]
	fn inode_round_trips() {
		let inode = RawInode {
			itype: InodeType::Directory,
			mode: 0o755,
			size: 128,
			uid: 1000,
			gid: 1000,
			atime: 1,
			mtime: 2,
			ctime: 3,
			blocks: [1, 2, 0, 0, 0, 0, 0, 0, 0, 0, 0, 0],
		};
		let mut buf = [0u8; INODE_SIZE];
		write_inode_into(&mut buf, &inode);
		let parsed = read_inode_from(&buf);
		assert_eq!(parsed.itype, InodeType::Directory);
		assert_eq!(parsed.size, 128);
		assert_eq!(parsed.blocks[1], 2);
	}
}
