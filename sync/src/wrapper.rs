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

//! Value objects pairing wire data with the peer it came from.

use std::time::Instant;

use chain_types::{Block, BlockHeader};

use crate::peer::PeerId;

/// A header paired with the peer that sent it.
#[derive(Debug, Clone)]
pub struct HeaderWrapper {
	pub header: BlockHeader,
	pub peer: PeerId,
}

impl HeaderWrapper {
	pub fn new(header: BlockHeader, peer: PeerId) -> Self {
		HeaderWrapper { header, peer }
	}
}

/// A block paired with the peer it came from and whether it arrived as a
/// spontaneous announcement (`is_new_block`) rather than backfill.
#[derive(Debug, Clone)]
pub struct BlockWrapper {
	pub block: Block,
	pub peer: PeerId,
	pub is_new_block: bool,
	pub received_at: Option<Instant>,
}

impl BlockWrapper {
	/// A block downloaded as part of ordinary backfill.
	pub fn backfill(block: Block, peer: PeerId) -> Self {
		BlockWrapper { block, peer, is_new_block: false, received_at: None }
	}

	/// A block that was announced as the peer's new head.
	pub fn announced(block: Block, peer: PeerId) -> Self {
		BlockWrapper { block, peer, is_new_block: true, received_at: Some(Instant::now()) }
	}
}
