// Copyright 2015, 2016 Ethcore (UK) Ltd.
// This file is part of Parity.

// Parity is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.

// Parity is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.

// You should have received a copy of the GNU General Public License
// along with Parity.  If not, see <http://www.gnu.org/licenses/>.

//! The explicit event bus the engine dispatches to, replacing the implicit
//! composite listener of the original design.

use log::{debug, info};

use crate::peer::PeerId;

/// Hooks the engine calls out on. `on_sync_done` is the load-bearing one;
/// the other two exist so a host can log/meter without reaching into the
/// engine's internals.
pub trait SyncEvents: Send + Sync {
	/// Called exactly once per process, the first time an announced block
	/// imports as the new best head.
	fn on_sync_done(&self) {}

	/// Called whenever a batch of headers is accepted into the queue.
	fn on_headers_received(&self, _peer: PeerId, _count: usize) {}

	/// Called whenever blocks are handed off to the chain importer.
	fn on_blocks_imported(&self, _count: usize) {}
}

/// Discards every event. Useful in tests that don't care about them.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullEvents;

impl SyncEvents for NullEvents {}

/// Logs every event at `info`/`debug`. A reasonable default for a host that
/// has nothing more specific to do.
#[derive(Debug, Default, Clone, Copy)]
pub struct LoggingEvents;

impl SyncEvents for LoggingEvents {
	fn on_sync_done(&self) {
		info!(target: "sync", "sync done: caught up with peer-announced head");
	}

	fn on_headers_received(&self, peer: PeerId, count: usize) {
		debug!(target: "sync", "accepted {} headers from peer {}", count, peer);
	}

	fn on_blocks_imported(&self, count: usize) {
		debug!(target: "sync", "handed {} blocks to the importer", count);
	}
}
