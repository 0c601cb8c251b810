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

//! Arrival signaling for the fetch loops.
//!
//! The legacy source built a fresh one-shot latch every loop iteration and
//! tolerated the benign race of a concurrent trip landing before the
//! waiter installed its latch (a trip-before-install just causes one
//! zero-duration wait). Here the same tolerance is achieved with a bounded
//! channel of arrival tokens: `notify` is a non-blocking, coalescing send,
//! and `wait`/`wait_for` block on the receiving side with a timeout. No
//! per-iteration allocation, no latch object to race against.

use std::time::{Duration, Instant};

use crossbeam_channel::{bounded, Receiver, Sender};

/// A many-notifiers, single-waiter arrival signal.
pub struct Arrival {
	tx: Sender<()>,
	rx: Receiver<()>,
}

impl Arrival {
	pub fn new() -> Self {
		let (tx, rx) = bounded(1);
		Arrival { tx, rx }
	}

	/// Trips the signal. Non-blocking: if a token is already pending, this
	/// is a no-op rather than a block, which is what keeps a burst of
	/// deliveries from stalling the producer.
	pub fn notify(&self) {
		let _ = self.tx.try_send(());
	}

	/// Waits for a single arrival, or for `timeout` to elapse.
	pub fn wait(&self, timeout: Duration) {
		let _ = self.rx.recv_timeout(timeout);
	}

	/// Waits for up to `count` arrivals (a down-counter), or until `timeout`
	/// has elapsed in total. Used by the body fetcher, which arms the
	/// signal once per outstanding chunk request so it wakes as soon as any
	/// of them completes.
	pub fn wait_for(&self, count: usize, timeout: Duration) {
		let deadline = Instant::now() + timeout;
		for _ in 0..count.max(1) {
			let remaining = deadline.saturating_duration_since(Instant::now());
			if remaining.is_zero() {
				break;
			}
			if self.rx.recv_timeout(remaining).is_err() {
				break;
			}
		}
	}
}

impl Default for Arrival {
	fn default() -> Self {
		Self::new()
	}
}
