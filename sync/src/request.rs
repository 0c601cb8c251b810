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

//! Outbound request shapes: what the fetcher loops ask `PeerHandler` to send.

use chain_types::{BlockNumber, H256};

/// Where a header request starts: an explicit height, or a hash (used when
/// walking backwards from an announced block we don't yet have a height
/// for).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BlockId {
	Number(BlockNumber),
	Hash(H256),
}

/// A single header identity, enough to ask a peer for its body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct HeaderRef {
	pub number: BlockNumber,
	pub hash: H256,
}

/// `GetBlockHeaders` request parameters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeadersRequest {
	pub start: BlockId,
	pub count: u64,
	pub reverse: bool,
}

/// `GetBlockBodies` request parameters: the headers whose bodies are wanted.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct BlocksRequest {
	pub headers: Vec<HeaderRef>,
}

impl BlocksRequest {
	/// Splits into sub-requests of at most `chunk_size` headers each, for
	/// fan-out across several idle peers.
	pub fn split(&self, chunk_size: usize) -> Vec<BlocksRequest> {
		if self.headers.is_empty() {
			return Vec::new();
		}
		self.headers
			.chunks(chunk_size.max(1))
			.map(|chunk| BlocksRequest { headers: chunk.to_vec() })
			.collect()
	}

	pub fn is_empty(&self) -> bool {
		self.headers.is_empty()
	}

	pub fn len(&self) -> usize {
		self.headers.len()
	}
}
