// SPDX-License-Identifier: GPL-2.0

//! Socket layer built on top of the kernel's existing `network` module:
//! TCP state machine, UDP datagrams, and the socket ABI that ties both
//! to file descriptors.

pub mod socket;
pub mod tcp;
pub mod udp;

use crate::error::Result;

/// Initialize the socket layer. Must run after `network::init` has
/// brought up the loopback interface and routing table.
pub fn init() -> Result<()> {
	tcp::init()?;
	udp::init()?;
	socket::init()?;
	crate::info!("net: socket layer initialized");
	Ok(())
}
