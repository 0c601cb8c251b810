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

//! Wires every piece together: the queue, the two fetch loops, sender
//! prefetch, the importer and the status logger, each on its own OS
//! thread. Real threads rather than an async runtime because the importer
//! may block on chain I/O and must never be starved by — or itself
//! starve — the fetch loops; they need to make forward progress in
//! parallel, not cooperatively.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use chain_types::{Chain, HeaderValidator};
use crossbeam_channel::bounded;
use log::info;
use parking_lot::Mutex;

use crate::config::SyncConfig;
use crate::error::SyncError;
use crate::events::SyncEvents;
use crate::ingress::Ingress;
use crate::peer::{PeerHandler, PeerPool};
use crate::prefetch::SenderPrefetch;
use crate::queue::SyncQueue;
use crate::signal::Arrival;
use crate::wrapper::BlockWrapper;
use crate::{body_fetcher, header_fetcher, importer, status};

/// Builds and, on [`SyncEngine::start`], runs the full sync pipeline.
pub struct SyncEngine<C, V, P, H, E> {
	config: SyncConfig,
	chain: Arc<C>,
	validator: Arc<V>,
	peers: Arc<P>,
	handler: Arc<H>,
	events: Arc<E>,
}

impl<C, V, P, H, E> SyncEngine<C, V, P, H, E>
where
	C: Chain + 'static,
	V: HeaderValidator + 'static,
	P: PeerPool + 'static,
	H: PeerHandler + 'static,
	E: SyncEvents + 'static,
{
	pub fn new(config: SyncConfig, chain: Arc<C>, validator: Arc<V>, peers: Arc<P>, handler: Arc<H>, events: Arc<E>) -> Self {
		SyncEngine { config, chain, validator, peers, handler, events }
	}

	/// Waits for the chain to report readiness (bounded by
	/// `config.startup_window`), then spawns every worker thread and
	/// returns an [`Ingress`] for the network layer to feed and a
	/// [`ShutdownHandle`] to stop everything cleanly.
	///
	/// If `config.sync_enabled` is false, spawns nothing and returns a
	/// handle whose `shutdown` is a no-op, plus an `Ingress` that quietly
	/// discards everything handed to it (the queue is simply never
	/// drained by any fetch loop).
	pub fn start(self) -> Result<(Arc<Ingress<V, E>>, ShutdownHandle), SyncError> {
		if !self.config.sync_enabled {
			info!(target: "sync", "sync disabled by configuration, not starting");
			let queue = Arc::new(Mutex::new(SyncQueue::new(self.chain.head_number(), self.chain.head_hash(), self.config.header_request_window)));
			let (out_tx, _out_rx) = bounded(1);
			let prefetch = SenderPrefetch::spawn(1, 1, out_tx);
			let header_arrival = Arc::new(Arrival::new());
			let body_arrival = Arc::new(Arrival::new());
			let ingress = Arc::new(Ingress::new(queue, self.validator, prefetch, self.events, header_arrival, body_arrival));
			return Ok((ingress, ShutdownHandle::noop()));
		}

		wait_for_chain_ready(&*self.chain, self.config.startup_window)?;

		let queue = Arc::new(Mutex::new(SyncQueue::new(self.chain.head_number(), self.chain.head_hash(), self.config.header_request_window)));
		let header_arrival = Arc::new(Arrival::new());
		let body_arrival = Arc::new(Arrival::new());
		let shutdown = Arc::new(AtomicBool::new(false));

		let (import_tx, import_rx) = bounded::<Vec<BlockWrapper>>(self.config.import_queue_cap.max(1));
		let prefetch = SenderPrefetch::spawn(self.config.prefetch_workers, self.config.prefetch_buffer, import_tx.clone());

		let import_queue_len = {
			let import_tx = import_tx.clone();
			Arc::new(move || import_tx.len()) as Arc<dyn Fn() -> usize + Send + Sync>
		};

		let sync_done = Arc::new(AtomicBool::new(false));

		let mut threads: Vec<JoinHandle<()>> = Vec::new();

		threads.push({
			let queue = queue.clone();
			let peers = self.peers.clone();
			let handler = self.handler.clone();
			let config = self.config;
			let arrival = header_arrival.clone();
			let shutdown = shutdown.clone();
			thread::Builder::new()
				.name("header-fetcher".into())
				.spawn(move || header_fetcher::run(queue, peers, handler, config, arrival, shutdown))
				.expect("failed to spawn header fetcher")
		});

		threads.push({
			let queue = queue.clone();
			let peers = self.peers.clone();
			let handler = self.handler.clone();
			let config = self.config;
			let import_queue_len = import_queue_len.clone();
			let arrival = body_arrival.clone();
			let shutdown = shutdown.clone();
			thread::Builder::new()
				.name("body-fetcher".into())
				.spawn(move || body_fetcher::run(queue, peers, handler, config, import_queue_len, arrival, shutdown))
				.expect("failed to spawn body fetcher")
		});

		threads.push({
			let chain = self.chain.clone();
			let events = self.events.clone();
			let sync_done = sync_done.clone();
			let shutdown = shutdown.clone();
			thread::Builder::new()
				.name("importer".into())
				.spawn(move || importer::run(import_rx, chain, events, sync_done, shutdown))
				.expect("failed to spawn importer")
		});

		threads.push({
			let queue = queue.clone();
			let chain = self.chain.clone();
			let config = self.config;
			let sync_done = sync_done.clone();
			let shutdown = shutdown.clone();
			thread::Builder::new()
				.name("sync-status".into())
				.spawn(move || status::run(queue, chain, config, sync_done, shutdown))
				.expect("failed to spawn status logger")
		});

		let ingress = Arc::new(Ingress::new(queue, self.validator, prefetch.clone(), self.events, header_arrival, body_arrival));

		Ok((ingress, ShutdownHandle { shutdown, threads, prefetch: Some(prefetch) }))
	}
}

fn wait_for_chain_ready<C: Chain>(chain: &C, window: Duration) -> Result<(), SyncError> {
	let deadline = Instant::now() + window;
	const POLL: Duration = Duration::from_millis(50);
	loop {
		if chain.is_ready() {
			return Ok(());
		}
		if Instant::now() >= deadline {
			return Err(SyncError::ChainNotReady);
		}
		thread::sleep(POLL.min(deadline.saturating_duration_since(Instant::now())));
	}
}

/// Stops every worker thread started by [`SyncEngine::start`] and waits for
/// them to finish. Consumes itself so it can only be used once.
pub struct ShutdownHandle {
	shutdown: Arc<AtomicBool>,
	threads: Vec<JoinHandle<()>>,
	prefetch: Option<Arc<SenderPrefetch>>,
}

impl ShutdownHandle {
	fn noop() -> Self {
		ShutdownHandle { shutdown: Arc::new(AtomicBool::new(true)), threads: Vec::new(), prefetch: None }
	}

	/// Signals every loop to stop, joins the fetch/import/status threads,
	/// then drains and joins the sender-prefetch pipeline.
	pub fn shutdown(mut self) {
		self.shutdown.store(true, Ordering::Relaxed);
		for handle in self.threads.drain(..) {
			let _ = handle.join();
		}
		if let Some(prefetch) = self.prefetch.take() {
			prefetch.shutdown();
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::error::SyncError as E;
	use crate::events::NullEvents;
	use crate::peer::PeerId;
	use crate::request::{BlocksRequest, HeadersRequest};
	use chain_types::{BlockHeader, BlockNumber, HeaderValidationError, H256};
	use std::sync::atomic::AtomicBool as StdAtomicBool;

	struct InstantChain {
		ready: StdAtomicBool,
	}
	impl Chain for InstantChain {
		fn try_connect(&self, _block: chain_types::Block) -> chain_types::ImportResult {
			chain_types::ImportResult::Exists
		}
		fn head_number(&self) -> BlockNumber {
			0
		}
		fn head_hash(&self) -> H256 {
			H256::zero()
		}
		fn is_ready(&self) -> bool {
			self.ready.load(Ordering::Relaxed)
		}
	}

	struct AcceptAll;
	impl HeaderValidator for AcceptAll {
		fn validate(&self, _header: &BlockHeader) -> Result<(), HeaderValidationError> {
			Ok(())
		}
	}

	struct NoPeers;
	impl PeerPool for NoPeers {
		fn any_idle(&self) -> Option<PeerId> {
			None
		}
	}

	struct NullHandler;
	impl PeerHandler for NullHandler {
		fn send_get_block_headers(&self, _peer: PeerId, _request: HeadersRequest) -> Result<(), E> {
			Ok(())
		}
		fn send_get_block_bodies(&self, _peer: PeerId, _request: BlocksRequest) -> Result<(), E> {
			Ok(())
		}
	}

	#[test]
	fn start_times_out_if_chain_never_becomes_ready() {
		let mut config = SyncConfig::default();
		config.startup_window = Duration::from_millis(100);
		let chain = Arc::new(InstantChain { ready: StdAtomicBool::new(false) });
		let engine = SyncEngine::new(config, chain, Arc::new(AcceptAll), Arc::new(NoPeers), Arc::new(NullHandler), Arc::new(NullEvents));

		let result = engine.start();
		assert!(matches!(result, Err(SyncError::ChainNotReady)));
	}

	#[test]
	fn start_and_shutdown_when_disabled_is_a_clean_no_op() {
		let mut config = SyncConfig::default();
		config.sync_enabled = false;
		let chain = Arc::new(InstantChain { ready: StdAtomicBool::new(true) });
		let engine = SyncEngine::new(config, chain, Arc::new(AcceptAll), Arc::new(NoPeers), Arc::new(NullHandler), Arc::new(NullEvents));

		let (_ingress, handle) = engine.start().expect("disabled start never fails");
		handle.shutdown();
	}

	#[test]
	fn start_spawns_threads_and_shuts_down_cleanly() {
		let chain = Arc::new(InstantChain { ready: StdAtomicBool::new(true) });
		let engine = SyncEngine::new(SyncConfig::default(), chain, Arc::new(AcceptAll), Arc::new(NoPeers), Arc::new(NullHandler), Arc::new(NullEvents));

		let (_ingress, handle) = engine.start().expect("chain is ready immediately");
		std::thread::sleep(Duration::from_millis(50));
		handle.shutdown();
	}
}
