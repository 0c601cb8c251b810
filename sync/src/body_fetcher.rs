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

//! Body fetch loop: asks idle peers for bodies of headers the queue already
//! knows about, fanning a single backlog out across as many peers as are
//! idle, bounded by the configured import queue cap.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use log::{debug, trace, warn};
use parking_lot::Mutex;

use crate::config::SyncConfig;
use crate::peer::{PeerHandler, PeerPool};
use crate::queue::SyncQueue;
use crate::signal::Arrival;

/// Runs the body fetch loop until `shutdown` is set.
pub fn run<P, H>(
	queue: Arc<Mutex<SyncQueue>>,
	peers: Arc<P>,
	handler: Arc<H>,
	config: SyncConfig,
	import_queue_len: Arc<dyn Fn() -> usize + Send + Sync>,
	arrival: Arc<Arrival>,
	shutdown: Arc<AtomicBool>,
) where
	P: PeerPool + 'static,
	H: PeerHandler + 'static,
{
	while !shutdown.load(Ordering::Relaxed) {
		if import_queue_len() >= config.import_queue_cap {
			trace!(target: "sync", "import queue at cap, body fetcher waiting");
			// Still wake promptly on any progress, since the cap may have
			// been what was blocking the previous cycle's chunks.
			arrival.wait_for(1, config.fetch_wait_timeout);
			continue;
		}

		let request = queue.lock().request_blocks(config.body_request_batch);
		if request.is_empty() {
			arrival.wait(config.fetch_wait_timeout);
			continue;
		}

		let chunks = request.split(config.body_request_chunk);
		let mut dispatched = 0;
		for chunk in chunks {
			let Some(peer) = peers.any_idle() else { break };
			match handler.send_get_block_bodies(peer, chunk) {
				Ok(()) => dispatched += 1,
				Err(err) => warn!(target: "sync", "failed to request bodies from peer {}: {}", peer, err),
			}
		}
		debug!(target: "sync", "dispatched {} body request chunks", dispatched);

		// Arm the arrival signal as a down-counter over the number of
		// outstanding chunk requests, so the loop wakes as soon as any one
		// of them completes rather than waiting out the full timeout.
		arrival.wait_for(dispatched, config.fetch_wait_timeout);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::SyncError;
	use crate::request::{BlocksRequest, HeaderRef, HeadersRequest};
	use crate::wrapper::HeaderWrapper;
	use chain_types::{BlockHeader, H256};
	use std::sync::Mutex as StdMutex;
	use std::thread;
	use std::time::Duration;

	struct OnePeer;
	impl PeerPool for OnePeer {
		fn any_idle(&self) -> Option<crate::peer::PeerId> {
			Some(1)
		}
	}

	struct RecordingHandler {
		seen: StdMutex<Vec<HeaderRef>>,
	}
	impl PeerHandler for RecordingHandler {
		fn send_get_block_headers(&self, _peer: crate::peer::PeerId, _request: HeadersRequest) -> Result<(), SyncError> {
			Ok(())
		}
		fn send_get_block_bodies(&self, _peer: crate::peer::PeerId, request: BlocksRequest) -> Result<(), SyncError> {
			self.seen.lock().unwrap().extend(request.headers);
			Ok(())
		}
	}

	#[test]
	fn requests_bodies_for_known_headers_only() {
		let mut config = SyncConfig::default();
		config.fetch_wait_timeout = Duration::from_millis(20);
		config.body_request_chunk = 2;

		let queue = Arc::new(Mutex::new(SyncQueue::new(0, H256::zero(), config.header_request_window)));
		{
			let mut q = queue.lock();
			let h1 = BlockHeader::new(1, H256::from_low_u64_be(1), H256::zero(), 1);
			let h2 = BlockHeader::new(2, H256::from_low_u64_be(2), h1.hash, 2);
			q.add_headers(vec![HeaderWrapper::new(h1, 1), HeaderWrapper::new(h2, 1)]);
		}

		let peers = Arc::new(OnePeer);
		let handler = Arc::new(RecordingHandler { seen: StdMutex::new(Vec::new()) });
		let arrival = Arc::new(Arrival::new());
		let shutdown = Arc::new(AtomicBool::new(false));
		let import_len: Arc<dyn Fn() -> usize + Send + Sync> = Arc::new(|| 0usize);

		let t = {
			let queue = queue.clone();
			let peers = peers.clone();
			let handler = handler.clone();
			let import_len = import_len.clone();
			let arrival = arrival.clone();
			let shutdown = shutdown.clone();
			thread::spawn(move || run(queue, peers, handler, config, import_len, arrival, shutdown))
		};

		thread::sleep(Duration::from_millis(60));
		shutdown.store(true, Ordering::Relaxed);
		arrival.notify();
		t.join().unwrap();

		let seen = handler.seen.lock().unwrap();
		assert!(seen.iter().any(|h| h.number == 1));
		assert!(seen.iter().any(|h| h.number == 2));
	}

	#[test]
	fn waits_when_import_queue_is_full() {
		let mut config = SyncConfig::default();
		config.fetch_wait_timeout = Duration::from_millis(20);
		config.import_queue_cap = 1;

		let queue = Arc::new(Mutex::new(SyncQueue::new(0, H256::zero(), config.header_request_window)));
		let peers = Arc::new(OnePeer);
		let handler = Arc::new(RecordingHandler { seen: StdMutex::new(Vec::new()) });
		let arrival = Arc::new(Arrival::new());
		let shutdown = Arc::new(AtomicBool::new(false));
		let import_len: Arc<dyn Fn() -> usize + Send + Sync> = Arc::new(|| 5usize);

		let t = {
			let queue = queue.clone();
			let peers = peers.clone();
			let handler = handler.clone();
			let import_len = import_len.clone();
			let arrival = arrival.clone();
			let shutdown = shutdown.clone();
			thread::spawn(move || run(queue, peers, handler, config, import_len, arrival, shutdown))
		};

		thread::sleep(Duration::from_millis(60));
		shutdown.store(true, Ordering::Relaxed);
		arrival.notify();
		t.join().unwrap();

		assert!(handler.seen.lock().unwrap().is_empty());
	}
}
