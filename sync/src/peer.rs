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

//! The two peer-facing collaborators: selection (`PeerPool`) and the wire
//! send (`PeerHandler`). Both are out of scope for this crate's logic —
//! only their contracts live here, mirroring how `sync_io::SyncIo` let the
//! original downloader stay ignorant of the concrete network transport.

use crate::error::SyncError;
use crate::request::{BlocksRequest, HeadersRequest};

/// Opaque peer identifier, stable for the lifetime of a connection.
pub type PeerId = usize;

/// Peer selection. Implemented by whatever owns the actual connection pool;
/// the engine only ever asks for an idle peer, never manages the pool
/// itself.
pub trait PeerPool: Send + Sync {
	/// Returns an idle peer (no outstanding request of the relevant kind),
	/// or `None`. Must not block.
	fn any_idle(&self) -> Option<PeerId>;
}

/// Capability to push wire requests to a specific peer. Implemented once per
/// supported protocol version by the network layer; the engine never
/// downcasts to a concrete handler.
pub trait PeerHandler: Send + Sync {
	fn send_get_block_headers(&self, peer: PeerId, request: HeadersRequest) -> Result<(), SyncError>;
	fn send_get_block_bodies(&self, peer: PeerId, request: BlocksRequest) -> Result<(), SyncError>;
}
