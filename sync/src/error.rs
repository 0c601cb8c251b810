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

//! Errors that can actually cross this crate's boundary. SyncQueue's own
//! operations are infallible by construction — bad input is filtered, not
//! propagated — matching the small closed-enum style of the legacy
//! `BlockDownloaderImportError`, rather than a single catch-all error type.

use thiserror::Error;

use crate::peer::PeerId;

#[derive(Debug, Error)]
pub enum SyncError {
	#[error("peer {0} is not available to receive a request")]
	PeerUnavailable(PeerId),

	#[error("failed to dispatch request to peer {0}: {1}")]
	SendFailed(PeerId, String),

	#[error("chain did not become ready within the startup window")]
	ChainNotReady,
}
