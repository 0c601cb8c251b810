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

//! Minimal host binary: wires a toy in-memory chain and a single always-idle
//! peer to the sync engine so the pipeline can be exercised end to end
//! without a real network stack.

use std::sync::Arc;
use std::time::Duration;

use chain_types::{
	Block, BlockHeader, BlockNumber, Chain, HeaderValidationError, HeaderValidator, ImportResult, H256,
};
use clap::Parser;
use ethsync::{LoggingEvents, PeerHandler, PeerId, PeerPool, SyncConfig, SyncEngine};
use parking_lot::Mutex;

/// Run the block synchronization engine against a demo in-memory chain.
#[derive(Debug, Parser)]
#[command(name = "node", about = "Demo host for the block synchronization engine")]
struct Cli {
	/// Disable the sync engine entirely.
	#[arg(long)]
	no_sync: bool,

	/// Max headers held in the backlog before the header fetcher pauses.
	#[arg(long)]
	header_backlog_cap: Option<usize>,

	/// Max batches held in the import queue before the body fetcher pauses.
	#[arg(long)]
	import_queue_cap: Option<usize>,

	/// Number of sender-prefetch worker threads.
	#[arg(long)]
	prefetch_workers: Option<usize>,

	/// Seconds between status log lines.
	#[arg(long)]
	log_interval_secs: Option<u64>,

	/// Seconds to wait for the chain to become ready at startup.
	#[arg(long)]
	startup_window_secs: Option<u64>,

	/// Seconds to run before shutting down. There is no real network
	/// transport in this demo, so there is nothing else to wait on.
	#[arg(long, default_value_t = 60)]
	run_secs: u64,
}

impl Cli {
	fn apply(&self, mut config: SyncConfig) -> SyncConfig {
		config.sync_enabled = !self.no_sync;
		if let Some(v) = self.header_backlog_cap {
			config.header_backlog_cap = v;
		}
		if let Some(v) = self.import_queue_cap {
			config.import_queue_cap = v;
		}
		if let Some(v) = self.prefetch_workers {
			config.prefetch_workers = v;
		}
		if let Some(v) = self.log_interval_secs {
			config.log_interval = Duration::from_secs(v);
		}
		if let Some(v) = self.startup_window_secs {
			config.startup_window = Duration::from_secs(v);
		}
		config
	}
}

/// A chain with no consensus or persistence: it accepts anything whose
/// parent hash matches its current head and otherwise reports `NoParent`.
/// Ready from construction; real hosts would flip this once genesis and
/// state storage finish loading.
struct DemoChain {
	head: Mutex<(BlockNumber, H256)>,
}

impl DemoChain {
	fn new() -> Self {
		DemoChain { head: Mutex::new((0, H256::zero())) }
	}
}

impl Chain for DemoChain {
	fn try_connect(&self, block: Block) -> ImportResult {
		let mut head = self.head.lock();
		if block.number() <= head.0 {
			return ImportResult::Exists;
		}
		if block.parent_hash() != head.1 {
			return ImportResult::NoParent;
		}
		*head = (block.number(), block.hash());
		ImportResult::ImportedBest
	}

	fn head_number(&self) -> BlockNumber {
		self.head.lock().0
	}

	fn head_hash(&self) -> H256 {
		self.head.lock().1
	}
}

/// Accepts every header. A real validator checks proof-of-work, difficulty
/// and timestamp bounds against its parent.
struct DemoValidator;

impl HeaderValidator for DemoValidator {
	fn validate(&self, _header: &BlockHeader) -> Result<(), HeaderValidationError> {
		Ok(())
	}
}

/// A single peer, always reported idle. Stands in for a real connection
/// pool that tracks outstanding requests per peer.
struct SinglePeer;

impl PeerPool for SinglePeer {
	fn any_idle(&self) -> Option<PeerId> {
		Some(0)
	}
}

/// A handler with nowhere to send: there is no real network transport in
/// this demo, so requests are logged and dropped.
struct NullHandler;

impl PeerHandler for NullHandler {
	fn send_get_block_headers(&self, peer: PeerId, request: ethsync::HeadersRequest) -> Result<(), ethsync::SyncError> {
		log::trace!(target: "node", "peer {} asked for headers {:?}", peer, request);
		Ok(())
	}

	fn send_get_block_bodies(&self, peer: PeerId, request: ethsync::BlocksRequest) -> Result<(), ethsync::SyncError> {
		log::trace!(target: "node", "peer {} asked for {} bodies", peer, request.len());
		Ok(())
	}
}

fn main() {
	env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

	let cli = Cli::parse();
	let config = cli.apply(SyncConfig::default());

	let chain = Arc::new(DemoChain::new());
	let validator = Arc::new(DemoValidator);
	let peers = Arc::new(SinglePeer);
	let handler = Arc::new(NullHandler);
	let events = Arc::new(LoggingEvents);

	let engine = SyncEngine::new(config, chain, validator, peers, handler, events);
	let (_ingress, handle) = match engine.start() {
		Ok(pair) => pair,
		Err(err) => {
			log::error!(target: "node", "sync engine failed to start: {}", err);
			std::process::exit(1);
		}
	};

	log::info!(target: "node", "running for {}s before shutdown", cli.run_secs);
	std::thread::sleep(Duration::from_secs(cli.run_secs));

	log::info!(target: "node", "shutting down");
	handle.shutdown();
}
