// SPDX-License-Identifier: GPL-2.0

//! FAT32 filesystem driver: 8.3 directory entries, a single-sector FAT
//! cache, and linear free-cluster scanning.

use alloc::string::{String, ToString};
use alloc::vec;
use alloc::vec::Vec;

use crate::block;
use crate::error::{Error, Result};
use crate::sync::Spinlock;

use super::{DirEntry, FileHandle, FileSystem, FileType, OpenFlags, Stat};

const SECTOR_SIZE: usize = 512;
const DIR_ENTRY_SIZE: usize = 32;
const ATTR_LFN: u8 = 0x0F;
const ATTR_DIRECTORY: u8 = 0x10;
const ATTR_ARCHIVE: u8 = 0x20;
const ENTRY_FREE: u8 = 0x00;
const ENTRY_DELETED: u8 = 0xE5;
const END_OF_CHAIN_MIN: u32 = 0x0FFF_FFF8;
const CLUSTER_MASK: u32 = 0x0FFF_FFFF;

struct Layout {
	bytes_per_sector: u32,
	sectors_per_cluster: u32,
	reserved_sectors: u32,
	num_fats: u32,
	fat_size: u32,
	data_start: u32,
	total_clusters: u32,
	root_cluster: u32,
}

struct FatCache {
	sector: Option<u64>,
	data: [u8; SECTOR_SIZE],
}

struct Fat32State {
	device_name: String,
	layout: Layout,
	cache: FatCache,
}

pub struct Fat32 {
	state: Spinlock<Option<Fat32State>>,
}

impl Fat32 {
	pub fn new() -> Self {
		Self {
			state: Spinlock::new(None),
		}
	}
}

struct Fat32File {
	first_cluster: u32,
	size: u32,
	// (cluster, dir_sector, offset_in_sector) of the directory entry that
	// describes this file, needed to persist a new size on write.
	dirent_location: Option<(u64, usize)>,
}

struct Fat32Dir {
	cluster: u32,
	cluster_byte_offset: u32,
}

fn read_sector(device_name: &str, sector: u64, out: &mut [u8; SECTOR_SIZE]) -> Result<()> {
	block::with_device(device_name, |dev| dev.read_block(sector, out))?;
	Ok(())
}

fn write_sector(device_name: &str, sector: u64, data: &[u8; SECTOR_SIZE]) -> Result<()> {
	block::with_device(device_name, |dev| dev.write_block(sector, data))?;
	Ok(())
}

impl Fat32State {
	fn cluster_to_sector(&self, cluster: u32) -> u64 {
		self.layout.data_start as u64 + (cluster as u64 - 2) * self.layout.sectors_per_cluster as u64
	}

	fn bytes_per_cluster(&self) -> u32 {
		self.layout.sectors_per_cluster * self.layout.bytes_per_sector
	}

	fn fat_sector_for(&self, cluster: u32) -> u64 {
		let fat_offset = cluster as u64 * 4;
		self.layout.reserved_sectors as u64 + fat_offset / self.layout.bytes_per_sector as u64
	}

	fn ensure_cached(&mut self, sector: u64) -> Result<()> {
		if self.cache.sector != Some(sector) {
			let mut buf = [0u8; SECTOR_SIZE];
			read_sector(&self.device_name, sector, &mut buf)?;
			self.cache.data = buf;
			self.cache.sector = Some(sector);
		}
		Ok(())
	}

	fn next_cluster(&mut self, cluster: u32) -> Result<u32> {
		let sector = self.fat_sector_for(cluster);
		self.ensure_cached(sector)?;
		let offset = ((cluster as u64 * 4) % self.layout.bytes_per_sector as u64) as usize;
		let raw = u32::from_le_bytes(self.cache.data[offset..offset + 4].try_into().unwrap());
		Ok(raw & CLUSTER_MASK)
	}

	fn set_next_cluster(&mut self, cluster: u32, next: u32) -> Result<()> {
		let sector = self.fat_sector_for(cluster);
		self.ensure_cached(sector)?;
		let offset = ((cluster as u64 * 4) % self.layout.bytes_per_sector as u64) as usize;
		let old = u32::from_le_bytes(self.cache.data[offset..offset + 4].try_into().unwrap());
		let preserved_top = old & !CLUSTER_MASK;
		let new_value = preserved_top | (next & CLUSTER_MASK);
		self.cache.data[offset..offset + 4].copy_from_slice(&new_value.to_le_bytes());

		// Mirror to every FAT copy: each copy is `fat_size` sectors apart.
		let sector_within_fat = sector - self.layout.reserved_sectors as u64;
		for fat_index in 0..self.layout.num_fats as u64 {
			let target = self.layout.reserved_sectors as u64
				+ fat_index * self.layout.fat_size as u64
				+ sector_within_fat;
			write_sector(&self.device_name, target, &self.cache.data)?;
		}
		Ok(())
	}

	fn alloc_cluster(&mut self) -> Result<u32> {
		for c in 2..self.layout.total_clusters + 2 {
			if self.next_cluster(c)? == 0 {
				self.set_next_cluster(c, END_OF_CHAIN_MIN)?;
				return Ok(c);
			}
		}
		Err(Error::ENOSPC)
	}

	fn free_cluster_chain(&mut self, start: u32) -> Result<()> {
		let mut c = start;
		while c < END_OF_CHAIN_MIN && c >= 2 {
			let next = self.next_cluster(c)?;
			self.set_next_cluster(c, 0)?;
			if next >= END_OF_CHAIN_MIN || next < 2 {
				break;
			}
			c = next;
		}
		Ok(())
	}

	fn read_cluster(&self, cluster: u32, out: &mut [u8]) -> Result<()> {
		let sector0 = self.cluster_to_sector(cluster);
		for i in 0..self.layout.sectors_per_cluster as u64 {
			let mut buf = [0u8; SECTOR_SIZE];
			read_sector(&self.device_name, sector0 + i, &mut buf)?;
			let off = (i as usize) * SECTOR_SIZE;
			out[off..off + SECTOR_SIZE].copy_from_slice(&buf);
		}
		Ok(())
	}

	fn write_cluster(&self, cluster: u32, data: &[u8]) -> Result<()> {
		let sector0 = self.cluster_to_sector(cluster);
		for i in 0..self.layout.sectors_per_cluster as u64 {
			let off = (i as usize) * SECTOR_SIZE;
			let mut buf = [0u8; SECTOR_SIZE];
			buf.copy_from_slice(&data[off..off + SECTOR_SIZE]);
			write_sector(&self.device_name, sector0 + i, &buf)?;
		}
		Ok(())
	}
}

/// Format an 8.3 name: uppercase, padded to 8+3, split on the final `.`.
fn format_83(name: &str) -> [u8; 11] {
	let mut out = [b' '; 11];
	let upper = name.to_ascii_uppercase();
	let (base, ext) = match upper.rfind('.') {
		Some(idx) => (&upper[..idx], &upper[idx + 1..]),
		None => (upper.as_str(), ""),
	};
	let base_bytes = base.as_bytes();
	let n = base_bytes.len().min(8);
	out[..n].copy_from_slice(&base_bytes[..n]);
	let ext_bytes = ext.as_bytes();
	let n = ext_bytes.len().min(3);
	out[8..8 + n].copy_from_slice(&ext_bytes[..n]);
	out
}

fn name_from_83(raw: &[u8; 11]) -> String {
	let base = core::str::from_utf8(&raw[..8]).unwrap_or("").trim_end();
	let ext = core::str::from_utf8(&raw[8..11]).unwrap_or("").trim_end();
	if ext.is_empty() {
		base.to_string()
	} else {
		alloc::format!("{}.{}", base, ext)
	}
}

struct RawDirEntry {
	name: [u8; 11],
	attr: u8,
	first_cluster: u32,
	size: u32,
}

fn parse_dirent(raw: &[u8]) -> RawDirEntry {
	let mut name = [0u8; 11];
	name.copy_from_slice(&raw[0..11]);
	let attr = raw[11];
	let hi = u16::from_le_bytes(raw[20..22].try_into().unwrap()) as u32;
	let lo = u16::from_le_bytes(raw[26..28].try_into().unwrap()) as u32;
	let first_cluster = (hi << 16) | lo;
	let size = u32::from_le_bytes(raw[28..32].try_into().unwrap());
	RawDirEntry {
		name,
		attr,
		first_cluster,
		size,
	}
}

fn write_dirent(raw: &mut [u8], name: &[u8; 11], attr: u8, first_cluster: u32, size: u32) {
	raw[0..11].copy_from_slice(name);
	raw[11] = attr;
	raw[20..22].copy_from_slice(&((first_cluster >> 16) as u16).to_le_bytes());
	raw[26..28].copy_from_slice(&(first_cluster as u16).to_le_bytes());
	raw[28..32].copy_from_slice(&size.to_le_bytes());
}

impl Fat32State {
	/// Walk `dir_cluster`'s chain looking for `target_name`. Returns the
	/// parsed entry plus its location (cluster, byte offset within
	/// cluster) for callers that need to rewrite it.
	fn find_entry(&mut self, dir_cluster: u32, target_name: &str) -> Result<(RawDirEntry, u32, u32)> {
		let target = format_83(target_name);
		let bpc = self.bytes_per_cluster() as usize;
		let mut cluster = dir_cluster;
		loop {
			let mut buf = vec![0u8; bpc];
			self.read_cluster(cluster, &mut buf)?;
			for offset in (0..bpc).step_by(DIR_ENTRY_SIZE) {
				let raw = &buf[offset..offset + DIR_ENTRY_SIZE];
				if raw[0] == ENTRY_FREE {
					return Err(Error::ENOENT);
				}
				if raw[0] == ENTRY_DELETED || raw[11] == ATTR_LFN {
					continue;
				}
				let entry = parse_dirent(raw);
				if entry.name == target {
					return Ok((entry, cluster, offset as u32));
				}
			}
			let next = self.next_cluster(cluster)?;
			if next >= END_OF_CHAIN_MIN {
				return Err(Error::ENOENT);
			}
			cluster = next;
		}
	}

	/// Find the first free (`0x00` or `0xE5`) slot in `dir_cluster`'s
	/// chain, extending the chain with a freshly allocated cluster if
	/// every existing one is full.
	fn find_free_dir_entry(&mut self, dir_cluster: u32) -> Result<(u32, u32)> {
		let bpc = self.bytes_per_cluster() as usize;
		let mut cluster = dir_cluster;
		loop {
			let mut buf = vec![0u8; bpc];
			self.read_cluster(cluster, &mut buf)?;
			for offset in (0..bpc).step_by(DIR_ENTRY_SIZE) {
				let byte0 = buf[offset];
				if byte0 == ENTRY_FREE || byte0 == ENTRY_DELETED {
					return Ok((cluster, offset as u32));
				}
			}
			let next = self.next_cluster(cluster)?;
			if next >= END_OF_CHAIN_MIN {
				let new_cluster = self.alloc_cluster()?;
				self.set_next_cluster(cluster, new_cluster)?;
				let zeros = vec![0u8; bpc];
				self.write_cluster(new_cluster, &zeros)?;
				return Ok((new_cluster, 0));
			}
			cluster = next;
		}
	}

	fn resolve_path(&mut self, path: &str) -> Result<(RawDirEntry, u32, u32)> {
		let comps = super::path::components(path);
		let mut dir_cluster = self.layout.root_cluster;
		if comps.is_empty() {
			return Err(Error::ENOENT);
		}
		for (i, comp) in comps.iter().enumerate() {
			let (entry, cluster, offset) = self.find_entry(dir_cluster, comp)?;
			if i + 1 == comps.len() {
				return Ok((entry, cluster, offset));
			}
			if entry.attr & ATTR_DIRECTORY == 0 {
				return Err(Error::ENOTDIR);
			}
			dir_cluster = entry.first_cluster;
		}
		Err(Error::ENOENT)
	}

	fn parent_cluster(&mut self, path: &str) -> Result<u32> {
		let comps = super::path::components(path);
		let mut dir_cluster = self.layout.root_cluster;
		if comps.len() <= 1 {
			return Ok(dir_cluster);
		}
		for comp in &comps[..comps.len() - 1] {
			let (entry, _, _) = self.find_entry(dir_cluster, comp)?;
			if entry.attr & ATTR_DIRECTORY == 0 {
				return Err(Error::ENOTDIR);
			}
			dir_cluster = entry.first_cluster;
		}
		Ok(dir_cluster)
	}
}

impl FileSystem for Fat32 {
	fn name(&self) -> &str {
		"fat32"
	}

	fn mount(&self, device_name: &str, _mountpoint: &str) -> Result<()> {
		let mut sector0 = [0u8; SECTOR_SIZE];
		read_sector(device_name, 0, &mut sector0)?;

		let signature = u16::from_le_bytes([sector0[510], sector0[511]]);
		let fs_type = &sector0[82..87];
		if signature != 0xAA55 || fs_type != b"FAT32" {
			return Err(Error::InvalidFs);
		}

		let bytes_per_sector = u16::from_le_bytes(sector0[11..13].try_into().unwrap()) as u32;
		let sectors_per_cluster = sector0[13] as u32;
		let reserved_sectors = u16::from_le_bytes(sector0[14..16].try_into().unwrap()) as u32;
		let num_fats = sector0[16] as u32;
		let total_sectors_32 = u32::from_le_bytes(sector0[32..36].try_into().unwrap());
		let sectors_per_fat_32 = u32::from_le_bytes(sector0[36..40].try_into().unwrap());
		let root_cluster = u32::from_le_bytes(sector0[44..48].try_into().unwrap());

		let data_start = reserved_sectors + num_fats * sectors_per_fat_32;
		let total_clusters = if sectors_per_cluster == 0 {
			0
		} else {
			(total_sectors_32.saturating_sub(data_start)) / sectors_per_cluster
		};

		let layout = Layout {
			bytes_per_sector,
			sectors_per_cluster,
			reserved_sectors,
			num_fats,
			fat_size: sectors_per_fat_32,
			data_start,
			total_clusters,
			root_cluster,
		};

		*self.state.lock() = Some(Fat32State {
			device_name: device_name.to_string(),
			layout,
			cache: FatCache {
				sector: None,
				data: [0u8; SECTOR_SIZE],
			},
		});
		Ok(())
	}

	fn open(&self, path: &str, flags: OpenFlags) -> Result<FileHandle> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;

		match state.resolve_path(path) {
			Ok((entry, dir_cluster, dir_offset)) => {
				if flags.has(OpenFlags::TRUNC) {
					state.free_cluster_chain(entry.first_cluster)?;
					let bpc = state.bytes_per_cluster() as usize;
					let mut buf = vec![0u8; bpc];
					state.read_cluster(dir_cluster, &mut buf)?;
					write_dirent(
						&mut buf[dir_offset as usize..dir_offset as usize + DIR_ENTRY_SIZE],
						&entry.name,
						ATTR_ARCHIVE,
						0,
						0,
					);
					state.write_cluster(dir_cluster, &buf)?;
					return Ok(FileHandle::new(Fat32File {
						first_cluster: 0,
						size: 0,
						dirent_location: Some((dir_cluster as u64, dir_offset as usize)),
					}));
				}
				Ok(FileHandle::new(Fat32File {
					first_cluster: entry.first_cluster,
					size: entry.size,
					dirent_location: Some((dir_cluster as u64, dir_offset as usize)),
				}))
			}
			Err(Error::ENOENT) if flags.has(OpenFlags::CREATE) => {
				let parent = state.parent_cluster(path)?;
				let name = super::path::file_name(path);
				let (dir_cluster, dir_offset) = state.find_free_dir_entry(parent)?;
				let first_cluster = state.alloc_cluster()?;
				let name83 = format_83(name);

				let bpc = state.bytes_per_cluster() as usize;
				let mut buf = vec![0u8; bpc];
				state.read_cluster(dir_cluster, &mut buf)?;
				write_dirent(
					&mut buf[dir_offset as usize..dir_offset as usize + DIR_ENTRY_SIZE],
					&name83,
					ATTR_ARCHIVE,
					first_cluster,
					0,
				);
				state.write_cluster(dir_cluster, &buf)?;

				Ok(FileHandle::new(Fat32File {
					first_cluster,
					size: 0,
					dirent_location: Some((dir_cluster as u64, dir_offset as usize)),
				}))
			}
			Err(e) => Err(e),
		}
	}

	fn close(&self, _file: FileHandle) -> Result<()> {
		Ok(())
	}

	fn read(&self, file: &mut FileHandle, buf: &mut [u8], offset: u64) -> Result<usize> {
		let f = file.downcast_ref::<Fat32File>()?;
		if offset >= f.size as u64 {
			return Ok(0);
		}
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let bpc = state.bytes_per_cluster() as u64;

		let to_read = (f.size as u64 - offset).min(buf.len() as u64) as usize;
		let mut done = 0usize;
		let mut cluster = f.first_cluster;
		let mut skip_clusters = offset / bpc;
		while skip_clusters > 0 {
			cluster = state.next_cluster(cluster)?;
			skip_clusters -= 1;
		}
		let mut cluster_pos = (offset % bpc) as usize;

		while done < to_read {
			let mut cbuf = vec![0u8; bpc as usize];
			state.read_cluster(cluster, &mut cbuf)?;
			let n = (bpc as usize - cluster_pos).min(to_read - done);
			buf[done..done + n].copy_from_slice(&cbuf[cluster_pos..cluster_pos + n]);
			done += n;
			cluster_pos = 0;
			if done < to_read {
				cluster = state.next_cluster(cluster)?;
			}
		}
		Ok(done)
	}

	fn write(&self, file: &mut FileHandle, buf: &[u8], offset: u64) -> Result<usize> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let bpc = state.bytes_per_cluster() as u64;

		let f = file.downcast_mut::<Fat32File>()?;
		let mut cluster = f.first_cluster;
		if cluster == 0 {
			cluster = state.alloc_cluster()?;
			f.first_cluster = cluster;
		}

		let mut skip_clusters = offset / bpc;
		while skip_clusters > 0 {
			let next = state.next_cluster(cluster)?;
			cluster = if next >= END_OF_CHAIN_MIN {
				let new_c = state.alloc_cluster()?;
				state.set_next_cluster(cluster, new_c)?;
				new_c
			} else {
				next
			};
			skip_clusters -= 1;
		}

		let mut done = 0usize;
		let mut cluster_pos = (offset % bpc) as usize;
		while done < buf.len() {
			let mut cbuf = vec![0u8; bpc as usize];
			state.read_cluster(cluster, &mut cbuf)?;
			let n = (bpc as usize - cluster_pos).min(buf.len() - done);
			cbuf[cluster_pos..cluster_pos + n].copy_from_slice(&buf[done..done + n]);
			state.write_cluster(cluster, &cbuf)?;
			done += n;
			cluster_pos = 0;
			if done < buf.len() {
				let next = state.next_cluster(cluster)?;
				cluster = if next >= END_OF_CHAIN_MIN {
					let new_c = state.alloc_cluster()?;
					state.set_next_cluster(cluster, new_c)?;
					new_c
				} else {
					next
				};
			}
		}

		let new_size = (offset + done as u64).max(f.size as u64) as u32;
		f.size = new_size;
		if let Some((dc, doff)) = f.dirent_location {
			let mut dirbuf = vec![0u8; bpc as usize];
			state.read_cluster(dc as u32, &mut dirbuf)?;
			dirbuf[doff + 20..doff + 22].copy_from_slice(&((f.first_cluster >> 16) as u16).to_le_bytes());
			dirbuf[doff + 26..doff + 28].copy_from_slice(&(f.first_cluster as u16).to_le_bytes());
			dirbuf[doff + 28..doff + 32].copy_from_slice(&new_size.to_le_bytes());
			state.write_cluster(dc as u32, &dirbuf)?;
		}
		Ok(done)
	}

	fn stat(&self, path: &str) -> Result<Stat> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		if super::path::components(path).is_empty() {
			return Ok(Stat {
				ino: state.layout.root_cluster as u64,
				size: 0,
				mode: 0o755,
				uid: 0,
				gid: 0,
				file_type: FileType::Directory,
				atime: 0,
				mtime: 0,
				ctime: 0,
			});
		}
		let (entry, _, _) = state.resolve_path(path)?;
		let file_type = if entry.attr & ATTR_DIRECTORY != 0 {
			FileType::Directory
		} else {
			FileType::File
		};
		Ok(Stat {
			ino: entry.first_cluster as u64,
			size: entry.size as u64,
			mode: if file_type == FileType::Directory {
				0o755
			} else {
				0o644
			},
			uid: 0,
			gid: 0,
			file_type,
			atime: 0,
			mtime: 0,
			ctime: 0,
		})
	}

	fn opendir(&self, path: &str) -> Result<FileHandle> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let cluster = if super::path::components(path).is_empty() {
			state.layout.root_cluster
		} else {
			let (entry, _, _) = state.resolve_path(path)?;
			if entry.attr & ATTR_DIRECTORY == 0 {
				return Err(Error::ENOTDIR);
			}
			entry.first_cluster
		};
		Ok(FileHandle::new(Fat32Dir {
			cluster,
			cluster_byte_offset: 0,
		}))
	}

	fn readdir(&self, dir: &mut FileHandle) -> Result<DirEntry> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let d = dir.downcast_mut::<Fat32Dir>()?;
		let bpc = state.bytes_per_cluster();

		loop {
			if d.cluster_byte_offset as u64 >= bpc as u64 {
				let next = state.next_cluster(d.cluster)?;
				if next >= END_OF_CHAIN_MIN {
					return Err(Error::EndOfFile);
				}
				d.cluster = next;
				d.cluster_byte_offset = 0;
			}
			let mut buf = vec![0u8; bpc as usize];
			state.read_cluster(d.cluster, &mut buf)?;
			let offset = d.cluster_byte_offset as usize;
			let raw = &buf[offset..offset + DIR_ENTRY_SIZE];
			d.cluster_byte_offset += DIR_ENTRY_SIZE as u32;

			if raw[0] == ENTRY_FREE {
				return Err(Error::EndOfFile);
			}
			if raw[0] == ENTRY_DELETED || raw[11] == ATTR_LFN {
				continue;
			}
			let entry = parse_dirent(raw);
			let file_type = if entry.attr & ATTR_DIRECTORY != 0 {
				FileType::Directory
			} else {
				FileType::File
			};
			return Ok(DirEntry {
				ino: entry.first_cluster as u64,
				name: name_from_83(&entry.name),
				file_type,
			});
		}
	}

	fn unlink(&self, path: &str) -> Result<()> {
		let mut guard = self.state.lock();
		let state = guard.as_mut().ok_or(Error::NotInitialized)?;
		let (entry, dir_cluster, dir_offset) = state.resolve_path(path)?;
		state.free_cluster_chain(entry.first_cluster)?;

		let bpc = state.bytes_per_cluster() as usize;
		let mut buf = vec![0u8; bpc];
		state.read_cluster(dir_cluster, &mut buf)?;
		buf[dir_offset as usize] = ENTRY_DELETED;
		state.write_cluster(dir_cluster, &buf)?;
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn format_83_pads_and_uppercases() {
		assert_eq!(&format_83("readme.txt"), b"README  TXT");
		assert_eq!(&format_83("a"), b"A          ");
	}

	#[test]
	fn name_from_83_trims_and_joins() {
		assert_eq!(name_from_83(b"README  TXT"), "README.TXT");
		assert_eq!(name_from_83(b"A          "), "A");
	}
}
