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

//! Header fetch loop: keeps asking an idle peer for the next header window
//! until the backlog cap is hit, then waits for room to open back up.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::config::SyncConfig;
use crate::peer::{PeerHandler, PeerId, PeerPool};
use crate::queue::SyncQueue;
use crate::signal::Arrival;

/// Runs the header fetch loop until `shutdown` is set. Meant to be run on
/// its own thread by [`crate::engine::SyncEngine`].
pub fn run<P, H>(
	queue: Arc<Mutex<SyncQueue>>,
	peers: Arc<P>,
	handler: Arc<H>,
	config: SyncConfig,
	arrival: Arc<Arrival>,
	shutdown: Arc<AtomicBool>,
) where
	P: PeerPool + 'static,
	H: PeerHandler + 'static,
{
	while !shutdown.load(Ordering::Relaxed) {
		let backlog = queue.lock().headers_count();
		if backlog >= config.header_backlog_cap {
			trace!(target: "sync", "header backlog at cap ({}), waiting", backlog);
			arrival.wait(config.fetch_wait_timeout);
			continue;
		}

		let Some(peer) = peers.any_idle() else {
			arrival.wait(config.fetch_wait_timeout);
			continue;
		};

		let request = queue.lock().request_headers();
		if let Err(err) = handler.send_get_block_headers(peer, request) {
			warn!(target: "sync", "failed to request headers from peer {}: {}", peer, err);
			on_peer_failed(peer);
		} else {
			debug!(target: "sync", "requested headers from peer {} starting at {:?}", peer, request.start);
		}

		arrival.wait(config.fetch_wait_timeout);
	}
}

/// Marks `peer` as the originator of a disconnect or protocol violation.
/// Exists so a future retry/ban policy has a single call site; today it
/// only logs.
pub fn on_peer_failed(peer: PeerId) {
	debug!(target: "sync", "peer {} failed a header request", peer);
}
