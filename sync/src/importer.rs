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

//! Chain importer: the single thread allowed to call into [`Chain`]. Pulls
//! prefetched blocks off the bounded import queue and hands them to the
//! chain one at a time, in order, so the chain never has to deal with
//! concurrent `try_connect` calls.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use chain_types::{Chain, ImportResult};
use crossbeam_channel::Receiver;
use log::{debug, error, warn};

use crate::events::SyncEvents;
use crate::wrapper::BlockWrapper;

/// Runs the import loop until the input channel closes or `shutdown` is set.
///
/// `sync_done` latches to `true` the first time an announced block (as
/// opposed to ordinary backfill) imports as the new best head, and
/// `events.on_sync_done()` fires exactly once at that transition.
pub fn run<C, E>(
	input: Receiver<Vec<BlockWrapper>>,
	chain: Arc<C>,
	events: Arc<E>,
	sync_done: Arc<AtomicBool>,
	shutdown: Arc<AtomicBool>,
) where
	C: Chain + 'static,
	E: SyncEvents + 'static,
{
	loop {
		if shutdown.load(Ordering::Relaxed) {
			break;
		}
		let batch = match input.recv_timeout(std::time::Duration::from_millis(200)) {
			Ok(batch) => batch,
			Err(crossbeam_channel::RecvTimeoutError::Timeout) => continue,
			Err(crossbeam_channel::RecvTimeoutError::Disconnected) => break,
		};
		import_batch(batch, &*chain, &*events, &sync_done);
	}
}

fn import_batch<C: Chain, E: SyncEvents>(
	batch: Vec<BlockWrapper>,
	chain: &C,
	events: &E,
	sync_done: &AtomicBool,
) {
	let mut imported = 0;
	for wrapper in batch {
		let number = wrapper.block.number();
		let is_new_block = wrapper.is_new_block;
		match chain.try_connect(wrapper.block) {
			ImportResult::ImportedBest => {
				imported += 1;
				debug!(target: "sync", "imported block {} as new best", number);
				if is_new_block && !sync_done.swap(true, Ordering::SeqCst) {
					events.on_sync_done();
				}
			}
			ImportResult::ImportedNotBest => {
				imported += 1;
				debug!(target: "sync", "imported block {} (not best)", number);
			}
			ImportResult::Exists => {
				debug!(target: "sync", "block {} already imported, skipping", number);
			}
			ImportResult::NoParent => {
				// The reassembly queue is supposed to guarantee this never
				// happens; surfacing it loudly instead of silently dropping
				// is deliberate, since it means that invariant broke.
				error!(target: "sync", "block {} has no known parent in the chain; queue invariant violated", number);
			}
			ImportResult::InvalidBlock => {
				warn!(target: "sync", "block {} failed validation, dropping", number);
			}
			ImportResult::Error(msg) => {
				error!(target: "sync", "block {} import failed: {}", number, msg);
			}
		}
	}
	if imported > 0 {
		events.on_blocks_imported(imported);
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_types::{Block, BlockHeader, BlockNumber, Tx, H256};
	use crossbeam_channel::bounded;
	use parking_lot::Mutex;
	use std::sync::atomic::AtomicUsize;
	use std::thread;
	use std::time::Duration;

	struct FakeChain {
		head: Mutex<(BlockNumber, H256)>,
		events_seen: AtomicUsize,
	}

	impl Chain for FakeChain {
		fn try_connect(&self, block: Block) -> ImportResult {
			let mut head = self.head.lock();
			if block.parent_hash() == head.1 {
				*head = (block.number(), block.hash());
				self.events_seen.fetch_add(1, Ordering::Relaxed);
				ImportResult::ImportedBest
			} else {
				ImportResult::NoParent
			}
		}
		fn head_number(&self) -> BlockNumber {
			self.head.lock().0
		}
		fn head_hash(&self) -> H256 {
			self.head.lock().1
		}
	}

	#[derive(Default)]
	struct CountingEvents {
		sync_done_calls: AtomicUsize,
		imported_calls: AtomicUsize,
	}
	impl SyncEvents for CountingEvents {
		fn on_sync_done(&self) {
			self.sync_done_calls.fetch_add(1, Ordering::Relaxed);
		}
		fn on_blocks_imported(&self, _count: usize) {
			self.imported_calls.fetch_add(1, Ordering::Relaxed);
		}
	}

	fn block(n: u64, parent: H256) -> Block {
		let header = BlockHeader::new(n, H256::from_low_u64_be(n), parent, n);
		Block::new(header, vec![Tx::new([n as u8; 65])])
	}

	#[test]
	fn sync_done_fires_once_on_first_announced_import() {
		let chain = Arc::new(FakeChain { head: Mutex::new((0, H256::zero())), events_seen: AtomicUsize::new(0) });
		let events = Arc::new(CountingEvents::default());
		let sync_done = Arc::new(AtomicBool::new(false));
		let shutdown = Arc::new(AtomicBool::new(false));
		let (tx, rx) = bounded(8);

		let handle = {
			let chain = chain.clone();
			let events = events.clone();
			let sync_done = sync_done.clone();
			let shutdown = shutdown.clone();
			thread::spawn(move || run(rx, chain, events, sync_done, shutdown))
		};

		tx.send(vec![BlockWrapper::backfill(block(1, H256::zero()), 1)]).unwrap();
		tx.send(vec![BlockWrapper::announced(block(2, H256::from_low_u64_be(1)), 1)]).unwrap();
		tx.send(vec![BlockWrapper::announced(block(3, H256::from_low_u64_be(2)), 1)]).unwrap();

		thread::sleep(Duration::from_millis(100));
		shutdown.store(true, Ordering::Relaxed);
		drop(tx);
		handle.join().unwrap();

		assert_eq!(events.sync_done_calls.load(Ordering::Relaxed), 1);
		assert_eq!(chain.head_number(), 3);
	}

	#[test]
	fn no_parent_does_not_panic_or_advance_head() {
		let chain = Arc::new(FakeChain { head: Mutex::new((0, H256::zero())), events_seen: AtomicUsize::new(0) });
		let events = Arc::new(CountingEvents::default());
		let sync_done = Arc::new(AtomicBool::new(false));

		import_batch(
			vec![BlockWrapper::backfill(block(5, H256::repeat_byte(9)), 1)],
			&*chain,
			&*events,
			&sync_done,
		);

		assert_eq!(chain.head_number(), 0);
		assert_eq!(events.imported_calls.load(Ordering::Relaxed), 0);
	}
}
