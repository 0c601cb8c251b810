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

#![warn(missing_docs)]

//! Blockchain synchronization engine.
//!
//! Brings the local chain up to the tip observed across a pool of peers by
//! requesting headers and bodies, reassembling them into contiguous blocks
//! and handing them to the chain importer. See [`engine::SyncEngine`] for
//! the entry point that wires every piece together.

mod config;
mod error;
mod events;
mod peer;
mod request;
mod wrapper;
mod signal;
mod queue;
mod prefetch;
mod header_fetcher;
mod body_fetcher;
mod importer;
mod ingress;
mod status;
mod engine;

pub use chain_types::{
	Address, Block, BlockHeader, BlockNumber, Chain, HeaderValidationError, HeaderValidator,
	ImportResult, Tx, H256,
};

pub use config::SyncConfig;
pub use engine::{ShutdownHandle, SyncEngine};
pub use error::SyncError;
pub use events::{LoggingEvents, NullEvents, SyncEvents};
pub use ingress::Ingress;
pub use peer::{PeerHandler, PeerId, PeerPool};
pub use queue::SyncQueue;
pub use request::{BlockId, BlocksRequest, HeaderRef, HeadersRequest};
pub use wrapper::{BlockWrapper, HeaderWrapper};
