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

//! Sender prefetch: recovers each transaction's sender address off the
//! import thread so the importer never pays for ECDSA recovery itself.
//!
//! A pool of worker threads pulls batches of [`BlockWrapper`]s, calls
//! `tx.sender()` on every transaction (populating the cache the importer
//! will read for free later), and hands the batch to an ordering tail.
//! Workers run batches out of order across each other; the tail reassembles
//! them back into submission order before they reach the bounded import
//! queue, using a per-batch sequence number and a small reorder buffer —
//! the same shape as the fetcher loops' request/response matching, just
//! applied to CPU work instead of network round-trips.

use std::collections::{HashMap, VecDeque};
use std::panic;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{bounded, Receiver, Sender};
use log::{error, warn};
use parking_lot::Mutex;

use crate::wrapper::BlockWrapper;

type BatchId = u64;

struct Batch {
	id: BatchId,
	items: Vec<BlockWrapper>,
}

/// A running prefetch pipeline. Dropping the handle stops accepting new
/// batches and joins the worker and ordering-tail threads.
pub struct SenderPrefetch {
	submit_tx: Mutex<Option<Sender<Batch>>>,
	next_batch_id: AtomicU64,
	workers: Mutex<Vec<JoinHandle<()>>>,
	tail: Mutex<Option<JoinHandle<()>>>,
}

impl SenderPrefetch {
	/// Spawns `workers` recovery threads plus one ordering-tail thread.
	/// `output` is the bounded channel batches are pushed onto, in the order
	/// they were submitted.
	pub fn spawn(workers: usize, buffer: usize, output: Sender<Vec<BlockWrapper>>) -> Arc<Self> {
		let (submit_tx, submit_rx) = bounded::<Batch>(buffer);
		let (done_tx, done_rx) = bounded::<Batch>(buffer);

		let mut handles = Vec::with_capacity(workers.max(1));
		for worker_id in 0..workers.max(1) {
			let submit_rx = submit_rx.clone();
			let done_tx = done_tx.clone();
			handles.push(
				thread::Builder::new()
					.name(format!("sender-prefetch-{}", worker_id))
					.spawn(move || sender_prefetch_worker(worker_id, submit_rx, done_tx))
					.expect("failed to spawn sender prefetch worker"),
			);
		}
		drop(done_tx);

		let tail = thread::Builder::new()
			.name("sender-prefetch-tail".into())
			.spawn(move || ordering_tail(done_rx, output))
			.expect("failed to spawn sender prefetch ordering tail");

		Arc::new(SenderPrefetch {
			submit_tx: Mutex::new(Some(submit_tx)),
			next_batch_id: AtomicU64::new(0),
			workers: Mutex::new(handles),
			tail: Mutex::new(Some(tail)),
		})
	}

	/// Submits a batch for sender recovery. Blocks if the input buffer is
	/// full, providing backpressure all the way back to the body fetcher.
	/// A no-op once [`SenderPrefetch::shutdown`] has been called.
	pub fn submit(&self, items: Vec<BlockWrapper>) {
		if items.is_empty() {
			return;
		}
		let id = self.next_batch_id.fetch_add(1, Ordering::Relaxed);
		if let Some(tx) = self.submit_tx.lock().as_ref() {
			// A closed channel means the pipeline is shutting down; dropping
			// the batch silently is correct, there is nowhere left to send it.
			let _ = tx.send(Batch { id, items });
		}
	}

	/// Stops accepting new batches and waits for in-flight work to drain.
	pub fn shutdown(&self) {
		// Dropping the sender end lets workers observe a closed channel and
		// exit their receive loops.
		self.submit_tx.lock().take();
		for handle in self.workers.lock().drain(..) {
			let _ = handle.join();
		}
		if let Some(handle) = self.tail.lock().take() {
			let _ = handle.join();
		}
	}
}

fn sender_prefetch_worker(worker_id: usize, input: Receiver<Batch>, output: Sender<Batch>) {
	for mut batch in input {
		let batch_id = batch.id;
		batch.items.retain(|wrapper| {
			let number = wrapper.block.number();
			let result = panic::catch_unwind(panic::AssertUnwindSafe(|| {
				for tx in &wrapper.block.transactions {
					let _ = tx.sender();
				}
			}));
			if result.is_err() {
				error!(
					target: "sync",
					"sender prefetch worker {} panicked recovering block {} in batch {}; dropping it",
					worker_id, number, batch_id,
				);
			}
			result.is_ok()
		});
		if output.send(batch).is_err() {
			break;
		}
	}
}

fn ordering_tail(input: Receiver<Batch>, output: Sender<Vec<BlockWrapper>>) {
	let mut next_expected: BatchId = 0;
	let mut pending: HashMap<BatchId, Vec<BlockWrapper>> = HashMap::new();
	let mut seen_order: VecDeque<BatchId> = VecDeque::new();

	for batch in input {
		seen_order.push_back(batch.id);
		pending.insert(batch.id, batch.items);

		while let Some(items) = pending.remove(&next_expected) {
			if output.send(items).is_err() {
				warn!(target: "sync", "sender prefetch output closed; draining remaining batches");
				return;
			}
			next_expected += 1;
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_types::{Block, BlockHeader, Tx, H256};
	use std::time::Duration;

	fn wrapper(n: u64) -> BlockWrapper {
		let header = BlockHeader::new(n, H256::from_low_u64_be(n), H256::zero(), n);
		let block = Block::new(header, vec![Tx::new([n as u8; 65])]);
		BlockWrapper::backfill(block, 1)
	}

	#[test]
	fn recovers_senders_and_preserves_batch_order() {
		let (output_tx, output_rx) = bounded(16);
		let pipeline = SenderPrefetch::spawn(4, 16, output_tx);

		for batch_start in 0..20u64 {
			pipeline.submit(vec![wrapper(batch_start)]);
		}

		let mut seen = Vec::new();
		for _ in 0..20 {
			let items = output_rx.recv_timeout(Duration::from_secs(5)).expect("batch");
			seen.extend(items);
		}
		for (i, w) in seen.iter().enumerate() {
			assert_eq!(w.block.number(), i as u64, "ordering tail must preserve submission order");
			assert!(w.block.transactions[0].sender_is_cached());
		}
		pipeline.shutdown();
	}

	#[test]
	fn empty_submission_is_a_no_op() {
		let (output_tx, output_rx) = bounded(4);
		let pipeline = SenderPrefetch::spawn(2, 4, output_tx);
		pipeline.submit(Vec::new());
		assert!(output_rx.recv_timeout(Duration::from_millis(100)).is_err());
		pipeline.shutdown();
	}
}
