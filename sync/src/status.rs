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

//! Periodic status logging: one `info!` line every `log_interval`,
//! replacing ad-hoc logging scattered through the fetch loops with a single
//! clear heartbeat an operator can grep for.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chain_types::Chain;
use log::info;
use parking_lot::Mutex;

use crate::config::SyncConfig;
use crate::queue::SyncQueue;

/// Runs the status loop until `shutdown` is set. Emits one heartbeat line
/// per `config.log_interval` summarizing backlog size, ready-chain depth
/// and whether `on_sync_done` has already fired.
pub fn run<C>(
	queue: Arc<Mutex<SyncQueue>>,
	chain: Arc<C>,
	config: SyncConfig,
	sync_done: Arc<AtomicBool>,
	shutdown: Arc<AtomicBool>,
) where
	C: Chain + 'static,
{
	while !shutdown.load(Ordering::Relaxed) {
		let (backlog, ready) = {
			let q = queue.lock();
			(q.headers_count(), q.ready_count())
		};
		info!(
			target: "sync",
			"chain head #{} ({:?}), {} headers in backlog, {} blocks ready, sync_done={}",
			chain.head_number(),
			chain.head_hash(),
			backlog,
			ready,
			sync_done.load(Ordering::Relaxed),
		);
		sleep_in_ticks(config.log_interval, &shutdown);
	}
}

/// Sleeps for `total`, but in short ticks so `shutdown` is noticed promptly
/// instead of only at the next full interval boundary.
fn sleep_in_ticks(total: std::time::Duration, shutdown: &AtomicBool) {
	const TICK: std::time::Duration = std::time::Duration::from_millis(100);
	let mut remaining = total;
	while !remaining.is_zero() {
		if shutdown.load(Ordering::Relaxed) {
			return;
		}
		let step = remaining.min(TICK);
		std::thread::sleep(step);
		remaining -= step;
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_types::{BlockNumber, H256};
	use std::thread;
	use std::time::Duration;

	struct FakeChain;
	impl Chain for FakeChain {
		fn try_connect(&self, _block: chain_types::Block) -> chain_types::ImportResult {
			unimplemented!()
		}
		fn head_number(&self) -> BlockNumber {
			42
		}
		fn head_hash(&self) -> H256 {
			H256::zero()
		}
	}

	#[test]
	fn stops_promptly_on_shutdown() {
		let mut config = SyncConfig::default();
		config.log_interval = Duration::from_secs(60);
		let queue = Arc::new(Mutex::new(SyncQueue::new(0, H256::zero(), 192)));
		let chain = Arc::new(FakeChain);
		let sync_done = Arc::new(AtomicBool::new(false));
		let shutdown = Arc::new(AtomicBool::new(false));

		let handle = {
			let queue = queue.clone();
			let chain = chain.clone();
			let sync_done = sync_done.clone();
			let shutdown = shutdown.clone();
			thread::spawn(move || run(queue, chain, config, sync_done, shutdown))
		};

		thread::sleep(Duration::from_millis(50));
		let start = std::time::Instant::now();
		shutdown.store(true, Ordering::Relaxed);
		handle.join().unwrap();
		assert!(start.elapsed() < Duration::from_secs(1));
	}
}
