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

//! The reassembly queue: the central data structure of the sync engine.
//!
//! Tracks known headers by height, bodies awaiting a contiguous chain, and
//! decides what to request next. Every method here is meant to be called
//! with a single lock held by the caller (see [`crate::engine::SyncEngine`])
//! — the queue itself does no locking, it only maintains its own
//! invariants under the assumption calls are serialized.

use std::collections::{BTreeMap, HashMap, VecDeque};

use chain_types::{Block, BlockNumber, H256};
use log::trace;

use crate::request::{BlockId, BlocksRequest, HeaderRef, HeadersRequest};
use crate::wrapper::HeaderWrapper;

/// In-memory reassembly structure. See module docs.
pub struct SyncQueue {
	/// Known headers by height; more than one candidate may be pending at a
	/// height until disambiguated by parent linkage.
	headers: BTreeMap<BlockNumber, HashMap<H256, HeaderWrapper>>,
	/// Bodies (as full blocks) waiting to be attached to their header and
	/// walked into the ready chain.
	bodies: HashMap<H256, Block>,
	/// Contiguous blocks assembled but not yet drained by the caller.
	ready: VecDeque<Block>,
	chain_head_number: BlockNumber,
	chain_head_hash: H256,
	window: u64,
}

impl SyncQueue {
	/// Creates a queue anchored at the chain's current head.
	pub fn new(chain_head_number: BlockNumber, chain_head_hash: H256, window: u64) -> Self {
		SyncQueue {
			headers: BTreeMap::new(),
			bodies: HashMap::new(),
			ready: VecDeque::new(),
			chain_head_number,
			chain_head_hash,
			window,
		}
	}

	/// Current header backlog: headers known but not yet assembled into the
	/// ready chain.
	pub fn headers_count(&self) -> usize {
		self.headers.values().map(|m| m.len()).sum()
	}

	/// Assembled blocks waiting to be drained by [`SyncQueue::poll_ready`] or
	/// the return value of [`SyncQueue::add_blocks`]. Used only for status
	/// reporting; production callers drain `add_blocks`' return value
	/// directly and never let this build up.
	pub fn ready_count(&self) -> usize {
		self.ready.len()
	}

	pub fn chain_head_number(&self) -> BlockNumber {
		self.chain_head_number
	}

	pub fn chain_head_hash(&self) -> H256 {
		self.chain_head_hash
	}

	/// Inserts headers, ignoring any at or below the chain head and any
	/// exact `(number, hash)` duplicate. Does not validate PoW or parent
	/// linkage — that's the caller's job before this is called.
	pub fn add_headers(&mut self, wrappers: Vec<HeaderWrapper>) {
		for wrapper in wrappers {
			let number = wrapper.header.number;
			if number <= self.chain_head_number {
				trace!(target: "sync", "ignoring header {} at or below chain head {}", number, self.chain_head_number);
				continue;
			}
			let hash = wrapper.header.hash;
			self.headers.entry(number).or_default().entry(hash).or_insert(wrapper);
		}
	}

	/// Attaches bodies to their headers and walks the ready chain forward as
	/// far as contiguity allows. Returns the newly-ready prefix in ascending
	/// order; the same blocks remain available via [`SyncQueue::poll_ready`]
	/// if the caller doesn't use the return value.
	pub fn add_blocks(&mut self, blocks: Vec<Block>) -> Vec<Block> {
		for block in blocks {
			let number = block.number();
			let hash = block.hash();
			if number <= self.chain_head_number {
				trace!(target: "sync", "ignoring block {} at or below chain head", number);
				continue;
			}
			if !self.headers.get(&number).map_or(false, |m| m.contains_key(&hash)) {
				trace!(target: "sync", "discarding body for unknown header {} ({:?})", number, hash);
				continue;
			}
			self.bodies.insert(hash, block);
		}
		self.advance_ready_chain();
		self.ready.drain(..).collect()
	}

	/// Pops one assembled block, if any are waiting. Most callers use the
	/// return value of [`SyncQueue::add_blocks`] instead; this exists for
	/// incremental consumption.
	pub fn poll_ready(&mut self) -> Option<Block> {
		self.ready.pop_front()
	}

	fn advance_ready_chain(&mut self) {
		loop {
			let next = self.chain_head_number + 1;
			let Some(candidates) = self.headers.get(&next) else { break };
			let chosen = candidates
				.values()
				.find(|hw| hw.header.parent_hash == self.chain_head_hash && self.bodies.contains_key(&hw.header.hash))
				.map(|hw| hw.header.hash);
			let Some(hash) = chosen else { break };
			let block = match self.bodies.remove(&hash) {
				Some(b) => b,
				None => break,
			};
			self.headers.remove(&next);
			self.chain_head_number = next;
			self.chain_head_hash = hash;
			trace!(target: "sync", "assembled block {} ({:?})", next, hash);
			self.ready.push_back(block);
		}
	}

	/// Computes the next header range to request: the lowest gap above the
	/// chain head, bounded by the request window. An empty queue yields a
	/// forward request anchored at `chain_head + 1`.
	pub fn request_headers(&self) -> HeadersRequest {
		let mut start = self.chain_head_number + 1;
		while self.headers.contains_key(&start) {
			start += 1;
		}
		let mut count = 0u64;
		let mut n = start;
		while count < self.window && !self.headers.contains_key(&n) {
			count += 1;
			n += 1;
		}
		HeadersRequest { start: BlockId::Number(start), count: count.max(1), reverse: false }
	}

	/// Returns up to `max_count` headers (ascending) whose bodies are not
	/// yet present.
	pub fn request_blocks(&self, max_count: usize) -> BlocksRequest {
		let mut headers = Vec::with_capacity(max_count.min(self.headers_count()));
		'outer: for (&number, candidates) in self.headers.iter() {
			for (&hash, _) in candidates.iter() {
				if self.bodies.contains_key(&hash) {
					continue;
				}
				headers.push(HeaderRef { number, hash });
				if headers.len() >= max_count {
					break 'outer;
				}
			}
		}
		BlocksRequest { headers }
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use chain_types::{Block, BlockHeader, Tx};

	fn header(number: BlockNumber, parent: H256) -> BlockHeader {
		let hash = H256::from_low_u64_be(number);
		BlockHeader::new(number, hash, parent, 1000 + number)
	}

	fn block(header: BlockHeader) -> Block {
		Block::new(header, vec![Tx::new([0u8; 65])])
	}

	fn wrapper(header: BlockHeader) -> HeaderWrapper {
		HeaderWrapper::new(header, 1)
	}

	fn genesis_hash() -> H256 {
		H256::zero()
	}

	#[test]
	fn linear_fetch_assembles_in_order() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let mut parent = genesis_hash();
		let mut headers = Vec::new();
		let mut blocks = Vec::new();
		for n in 1..=10 {
			let h = header(n, parent);
			parent = h.hash;
			headers.push(wrapper(h.clone()));
			blocks.push(block(h));
		}
		q.add_headers(headers);
		assert_eq!(q.headers_count(), 10);

		let ready = q.add_blocks(blocks);
		assert_eq!(ready.len(), 10);
		for (i, b) in ready.iter().enumerate() {
			assert_eq!(b.number(), (i + 1) as u64);
		}
		assert_eq!(q.chain_head_number(), 10);
		assert_eq!(q.headers_count(), 0);
	}

	#[test]
	fn announced_block_waits_for_backfill() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		// Block 5 announced first, parent chain unknown.
		let mut parent = genesis_hash();
		let mut all_headers = Vec::new();
		for n in 1..=5 {
			let h = header(n, parent);
			parent = h.hash;
			all_headers.push(h);
		}
		let block5 = all_headers[4].clone();
		q.add_headers(vec![wrapper(block5.clone())]);
		let ready = q.add_blocks(vec![block(block5.clone())]);
		assert!(ready.is_empty(), "block 5 cannot be ready without 1..4");
		assert_eq!(q.chain_head_number(), 0);

		// Now headers 1..4 arrive, plus their bodies.
		let backfill_headers: Vec<_> = all_headers[..4].iter().cloned().map(wrapper).collect();
		q.add_headers(backfill_headers);
		let backfill_blocks: Vec<_> = all_headers[..4].iter().cloned().map(block).collect();
		let ready = q.add_blocks(backfill_blocks);
		assert_eq!(ready.len(), 5, "1..4 plus the already-held block 5");
		assert_eq!(ready.last().unwrap().number(), 5);
		assert_eq!(q.chain_head_number(), 5);
	}

	#[test]
	fn duplicate_blocks_emit_once() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let h = header(1, genesis_hash());
		q.add_headers(vec![wrapper(h.clone())]);
		let ready1 = q.add_blocks(vec![block(h.clone())]);
		assert_eq!(ready1.len(), 1);
		// Redelivery after the chain head has already advanced is a no-op.
		let ready2 = q.add_blocks(vec![block(h)]);
		assert!(ready2.is_empty());
	}

	#[test]
	fn idempotent_header_insertion() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let h = header(1, genesis_hash());
		q.add_headers(vec![wrapper(h.clone())]);
		q.add_headers(vec![wrapper(h)]);
		assert_eq!(q.headers_count(), 1);
	}

	#[test]
	fn competing_headers_wait_for_disambiguation() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let good = header(1, genesis_hash());
		let mut bad = header(1, genesis_hash());
		bad.hash = H256::repeat_byte(0xee);
		q.add_headers(vec![wrapper(good.clone()), wrapper(bad.clone())]);
		assert_eq!(q.headers_count(), 2);
		// Only the body matching the eventual parent-linked header assembles.
		let ready = q.add_blocks(vec![block(bad), block(good.clone())]);
		assert_eq!(ready.len(), 1);
		assert_eq!(ready[0].hash(), good.hash);
	}

	#[test]
	fn request_headers_finds_lowest_gap() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let h5 = header(5, H256::repeat_byte(9));
		q.add_headers(vec![wrapper(h5)]);
		let req = q.request_headers();
		assert_eq!(req.start, BlockId::Number(1));
		assert_eq!(req.count, 4);
	}

	#[test]
	fn request_headers_anchors_forward_when_empty() {
		let q = SyncQueue::new(10, genesis_hash(), 192);
		let req = q.request_headers();
		assert_eq!(req.start, BlockId::Number(11));
		assert_eq!(req.count, 192);
	}

	#[test]
	fn request_blocks_skips_bodies_already_present() {
		let mut q = SyncQueue::new(0, genesis_hash(), 192);
		let h1 = header(1, genesis_hash());
		let h2 = header(2, h1.hash);
		q.add_headers(vec![wrapper(h1.clone()), wrapper(h2.clone())]);
		// Only block 1's body shows up; its parent isn't the chain head tail
		// until block... actually block 1's parent IS genesis, so it alone
		// would assemble. Use a body for header 2 instead to keep both headers
		// pending in the backlog for the request_blocks check below.
		q.bodies.insert(h2.hash, block(h2.clone()));
		let req = q.request_blocks(10);
		assert_eq!(req.headers.len(), 1);
		assert_eq!(req.headers[0].number, 1);
	}
}
