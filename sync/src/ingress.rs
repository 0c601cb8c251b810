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

//! The engine's inbound API: where the network layer hands received wire
//! data to the engine. Everything here validates what it cheaply can
//! (header PoW/timestamp) and discards the rest rather than returning an
//! error — a peer sending garbage is a peer problem, not a caller problem.

use std::sync::Arc;

use chain_types::HeaderValidator;
use log::{debug, warn};
use parking_lot::Mutex;

use crate::events::SyncEvents;
use crate::peer::PeerId;
use crate::prefetch::SenderPrefetch;
use crate::queue::SyncQueue;
use crate::signal::Arrival;
use crate::wrapper::{BlockWrapper, HeaderWrapper};

/// Entry point the network layer calls into with received wire data.
pub struct Ingress<V, E> {
	queue: Arc<Mutex<SyncQueue>>,
	validator: Arc<V>,
	prefetch: Arc<SenderPrefetch>,
	events: Arc<E>,
	header_arrival: Arc<Arrival>,
	body_arrival: Arc<Arrival>,
}

impl<V, E> Ingress<V, E>
where
	V: HeaderValidator,
	E: SyncEvents,
{
	pub fn new(
		queue: Arc<Mutex<SyncQueue>>,
		validator: Arc<V>,
		prefetch: Arc<SenderPrefetch>,
		events: Arc<E>,
		header_arrival: Arc<Arrival>,
		body_arrival: Arc<Arrival>,
	) -> Self {
		Ingress { queue, validator, prefetch, events, header_arrival, body_arrival }
	}

	/// Validates a batch of headers received from `peer` as a response to a
	/// `GetHeaders` request. A single invalid header rejects the whole
	/// batch — nothing from it is inserted — since the batch came from one
	/// peer and a partially-bad response is as suspect as a fully-bad one.
	/// Returns whether the batch was accepted.
	pub fn validate_and_add_headers(&self, peer: PeerId, headers: Vec<chain_types::BlockHeader>) -> bool {
		if headers.is_empty() {
			return true;
		}
		let mut wrapped = Vec::with_capacity(headers.len());
		for header in headers {
			if let Err(err) = self.validator.validate(&header) {
				warn!(target: "sync", "rejecting header batch from peer {}: {}", peer, err);
				return false;
			}
			wrapped.push(HeaderWrapper::new(header, peer));
		}
		let count = wrapped.len();
		self.queue.lock().add_headers(wrapped);
		self.events.on_headers_received(peer, count);
		self.header_arrival.notify();
		self.body_arrival.notify();
		true
	}

	/// Feeds backfill bodies (matched against already-known headers) into
	/// the queue, then forwards whatever assembled into a contiguous chain
	/// on to sender prefetch.
	pub fn add_blocks(&self, peer: PeerId, blocks: Vec<chain_types::Block>) {
		let assembled = self.queue.lock().add_blocks(blocks);
		if assembled.is_empty() {
			return;
		}
		debug!(target: "sync", "{} blocks assembled into the ready chain from peer {}", assembled.len(), peer);
		let wrappers = assembled.into_iter().map(|b| BlockWrapper::backfill(b, peer)).collect();
		self.prefetch.submit(wrappers);
		self.header_arrival.notify();
		self.body_arrival.notify();
	}

	/// Handles a spontaneously announced new block (as opposed to a
	/// response to a body request): validates its header, inserts it, and —
	/// if it completes the ready chain — forwards it marked as
	/// peer-announced so the importer can fire `on_sync_done`. Returns
	/// whether the header passed validation (the block may still be held
	/// pending backfill rather than imported immediately).
	pub fn validate_and_add_new_block(&self, peer: PeerId, block: chain_types::Block) -> bool {
		if let Err(err) = self.validator.validate(&block.header) {
			warn!(target: "sync", "rejected announced block from peer {}: {}", peer, err);
			return false;
		}
		let header = HeaderWrapper::new(block.header.clone(), peer);
		let hash = block.hash();
		self.queue.lock().add_headers(vec![header]);
		let assembled = self.queue.lock().add_blocks(vec![block]);
		if assembled.is_empty() {
			return true;
		}
		let wrappers = assembled
			.into_iter()
			.map(|b| if b.hash() == hash { BlockWrapper::announced(b, peer) } else { BlockWrapper::backfill(b, peer) })
			.collect();
		self.prefetch.submit(wrappers);
		self.header_arrival.notify();
		true
	}
}
