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

//! Engine configuration. Every tunable mentioned in the design is here,
//! with the same defaults, mirroring `ethsync::api::SyncConfig`.

use std::time::Duration;

/// Tunables for [`crate::engine::SyncEngine`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
	/// When false, `SyncEngine::start` spawns nothing and returns immediately.
	pub sync_enabled: bool,
	/// Header backlog above which the header fetcher stops requesting.
	pub header_backlog_cap: usize,
	/// Import queue depth above which the body fetcher stops requesting.
	pub import_queue_cap: usize,
	/// Max headers requested for bodies in one `request_blocks` call.
	pub body_request_batch: usize,
	/// Chunk size bodies requests are split into for fan-out across peers.
	pub body_request_chunk: usize,
	/// Number of sender-prefetch worker threads.
	pub prefetch_workers: usize,
	/// Bounded input buffer size for the sender-prefetch stage.
	pub prefetch_buffer: usize,
	/// Width of the header request window (how far ahead a single
	/// `GetHeaders` request may reach).
	pub header_request_window: u64,
	/// How long a fetch loop waits on its arrival signal before re-probing.
	pub fetch_wait_timeout: Duration,
	/// Interval between periodic status log lines.
	pub log_interval: Duration,
	/// How long the engine waits for the chain to report readiness at
	/// startup before giving up.
	pub startup_window: Duration,
}

impl Default for SyncConfig {
	fn default() -> SyncConfig {
		SyncConfig {
			sync_enabled: true,
			header_backlog_cap: 20_000,
			import_queue_cap: 20_000,
			body_request_batch: 1_000,
			body_request_chunk: 100,
			prefetch_workers: 4,
			prefetch_buffer: 1_000,
			header_request_window: 192,
			fetch_wait_timeout: Duration::from_secs(2),
			log_interval: Duration::from_secs(30),
			startup_window: Duration::from_secs(30),
		}
	}
}
