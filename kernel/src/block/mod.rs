// SPDX-License-Identifier: GPL-2.0

//! Generic block device layer.
//!
//! A block device is named, has a fixed block size and block count, and is
//! reachable through its registered [`BlockDevice`] wrapper for as long as
//! the kernel runs -- there is no removal, matching the rest of the source
//! hardware (ATA/AHCI disks never disappear once probed).

pub mod ahci;
pub mod ata;

use alloc::boxed::Box;
use alloc::collections::BTreeMap;
use alloc::string::{String, ToString};
use alloc::vec::Vec;

use crate::driver::BlockDriverOps;
use crate::error::{Error, Result};
use crate::sync::Spinlock;

/// A registered block device: a name, the driver callbacks behind it, and
/// the geometry the driver reports.
pub struct BlockDevice {
	name: String,
	block_size: u32,
	block_count: u64,
	ops: Box<dyn BlockDriverOps>,
}

impl BlockDevice {
	pub fn new(name: impl Into<String>, ops: Box<dyn BlockDriverOps>) -> Result<Self> {
		let block_size = ops.get_block_size();
		let block_count = ops.get_total_blocks();
		if block_size == 0 || block_count == 0 {
			return Err(Error::InvalidArgument);
		}
		Ok(Self {
			name: name.into(),
			block_size,
			block_count,
			ops,
		})
	}

	pub fn name(&self) -> &str {
		&self.name
	}

	pub fn block_size(&self) -> u32 {
		self.block_size
	}

	pub fn block_count(&self) -> u64 {
		self.block_count
	}

	/// Read a single block.
	pub fn read_block(&self, block_num: u64, buffer: &mut [u8]) -> Result<usize> {
		if block_num >= self.block_count {
			return Err(Error::Io);
		}
		self.ops.read_block(block_num, buffer)
	}

	/// Write a single block.
	pub fn write_block(&self, block_num: u64, buffer: &[u8]) -> Result<usize> {
		if block_num >= self.block_count {
			return Err(Error::Io);
		}
		self.ops.write_block(block_num, buffer)
	}

	/// Read `n` consecutive blocks. The default implementation calls
	/// `read_block` repeatedly and stops at the first failure; any partial
	/// progress made before the failing block is not rolled back.
	pub fn read_blocks(&self, start_block: u64, count: u64, buffer: &mut [u8]) -> Result<usize> {
		let bs = self.block_size as usize;
		if buffer.len() < bs * count as usize {
			return Err(Error::InvalidArgument);
		}
		let mut total = 0usize;
		for i in 0..count {
			let off = (i as usize) * bs;
			let n = self.read_block(start_block + i, &mut buffer[off..off + bs])?;
			total += n;
		}
		Ok(total)
	}

	/// Write `n` consecutive blocks, same partial-progress semantics as
	/// [`read_blocks`](Self::read_blocks).
	pub fn write_blocks(&self, start_block: u64, count: u64, buffer: &[u8]) -> Result<usize> {
		let bs = self.block_size as usize;
		if buffer.len() < bs * count as usize {
			return Err(Error::InvalidArgument);
		}
		let mut total = 0usize;
		for i in 0..count {
			let off = (i as usize) * bs;
			let n = self.write_block(start_block + i, &buffer[off..off + bs])?;
			total += n;
		}
		Ok(total)
	}

	pub fn flush(&self) -> Result<()> {
		self.ops.flush()
	}
}

struct BlockRegistry {
	devices: BTreeMap<String, Spinlock<BlockDevice>>,
}

impl BlockRegistry {
	const fn new() -> Self {
		Self {
			devices: BTreeMap::new(),
		}
	}
}

static BLOCK_REGISTRY: Spinlock<Option<BlockRegistry>> = Spinlock::new(None);

/// Initialize the block-device registry. Called once from `kernel::init`.
pub fn init() -> Result<()> {
	*BLOCK_REGISTRY.lock() = Some(BlockRegistry::new());
	crate::info!("block: registry initialized");
	Ok(())
}

/// Register a block device under a unique name.
pub fn register(name: impl Into<String>, ops: Box<dyn BlockDriverOps>) -> Result<()> {
	let name = name.into();
	let device = BlockDevice::new(name.clone(), ops)?;
	let mut guard = BLOCK_REGISTRY.lock();
	let registry = guard.as_mut().ok_or(Error::NotInitialized)?;
	if registry.devices.contains_key(&name) {
		return Err(Error::AlreadyExists);
	}
	registry.devices.insert(name.clone(), Spinlock::new(device));
	crate::info!("block: registered device {}", name);
	Ok(())
}

/// List registered block device names.
pub fn list() -> Vec<String> {
	let guard = BLOCK_REGISTRY.lock();
	match guard.as_ref() {
		Some(r) => r.devices.keys().cloned().collect(),
		None => Vec::new(),
	}
}

/// Run `f` with exclusive access to a named block device.
pub fn with_device<R>(name: &str, f: impl FnOnce(&BlockDevice) -> Result<R>) -> Result<R> {
	let guard = BLOCK_REGISTRY.lock();
	let registry = guard.as_ref().ok_or(Error::NotInitialized)?;
	let dev_lock = registry.devices.get(name).ok_or(Error::DeviceNotFound)?;
	let dev = dev_lock.lock();
	f(&dev)
}

#[cfg(test)]
mod tests {
	use super::*;

	struct FakeDisk {
		block_size: u32,
		block_count: u64,
	}

	impl BlockDriverOps for FakeDisk {
		fn read_block(&self, _block: u64, buffer: &mut [u8]) -> Result<usize> {
			buffer.fill(0);
			Ok(buffer.len())
		}
		fn write_block(&self, _block: u64, buffer: &[u8]) -> Result<usize> {
			Ok(buffer.len())
		}
		fn get_block_size(&self) -> u32 {
			self.block_size
		}
		fn get_total_blocks(&self) -> u64 {
			self.block_count
		}
		fn flush(&self) -> Result<()> {
			Ok(())
		}
	}

	#[test]
	fn rejects_zero_geometry() {
		let dev = BlockDevice::new(
			"zero",
			Box::new(FakeDisk {
				block_size: 0,
				block_count: 10,
			}),
		);
		assert!(dev.is_err());
	}

	#[test]
	fn out_of_range_block_is_io_error() {
		let dev = BlockDevice::new(
			"d0",
			Box::new(FakeDisk {
				block_size: 512,
				block_count: 4,
			}),
		)
		.unwrap();
		let mut buf = [0u8; 512];
		assert_eq!(dev.read_block(4, &mut buf), Err(Error::Io));
		assert!(dev.read_block(3, &mut buf).is_ok());
	}

	#[test]
	fn multi_block_read_stops_at_failure() {
		let dev = BlockDevice::new(
			"d1",
			Box::new(FakeDisk {
				block_size: 512,
				block_count: 2,
			}),
		)
		.unwrap();
		let mut buf = [0u8; 512 * 4];
		assert!(dev.read_blocks(0, 4, &mut buf).is_err());
	}
}
