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

//! Block, header and transaction value types.
//!
//! These are the data types the sync engine operates on, plus the trait
//! contracts for the two collaborators the engine treats as opaque:
//! chain import (`Chain`) and header validation (`HeaderValidator`). Neither
//! trait is implemented here beyond what tests need — the real
//! implementations (a full consensus-validating chain, a real signature
//! verifier) live outside this crate's concern.

use std::sync::OnceLock;

pub use ethereum_types::{H160 as Address, H256};

/// Height of a block in the canonical chain, genesis is 0.
pub type BlockNumber = u64;

/// A block header: enough identity to chain headers together and request
/// bodies for them, without carrying the body itself.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct BlockHeader {
	pub number: BlockNumber,
	pub hash: H256,
	pub parent_hash: H256,
	pub timestamp: u64,
}

impl BlockHeader {
	pub fn new(number: BlockNumber, hash: H256, parent_hash: H256, timestamp: u64) -> Self {
		BlockHeader { number, hash, parent_hash, timestamp }
	}

	/// A stable byte encoding, used only for diagnostic dumps. Real wire
	/// encoding (RLP) is outside this crate's scope.
	pub fn encoded(&self) -> Vec<u8> {
		let mut out = Vec::with_capacity(8 + 32 + 32 + 8);
		out.extend_from_slice(&self.number.to_be_bytes());
		out.extend_from_slice(self.hash.as_bytes());
		out.extend_from_slice(self.parent_hash.as_bytes());
		out.extend_from_slice(&self.timestamp.to_be_bytes());
		out
	}
}

/// A transaction whose sender is not known until its signature is recovered.
///
/// Signature recovery is a real ECDSA operation in a production client; here
/// it is stood in by a deterministic, order-of-magnitude-cheaper hash so the
/// prefetch pipeline has something non-trivial to parallelize without this
/// crate depending on a full cryptography stack.
#[derive(Debug, Clone)]
pub struct Tx {
	signature: [u8; 65],
	sender: OnceLock<Address>,
}

impl Tx {
	pub fn new(signature: [u8; 65]) -> Self {
		Tx { signature, sender: OnceLock::new() }
	}

	/// Recovers (or returns the cached) sender address. Expensive the first
	/// time it's called for a given transaction.
	pub fn sender(&self) -> Address {
		*self.sender.get_or_init(|| recover_sender(&self.signature))
	}

	/// True if the sender has already been computed and cached.
	pub fn sender_is_cached(&self) -> bool {
		self.sender.get().is_some()
	}
}

fn recover_sender(signature: &[u8; 65]) -> Address {
	// Stand-in for ECDSA public key recovery: a fixed-cost mixing pass over
	// the signature bytes so callers genuinely pay for each recovery instead
	// of hitting a cache for free on the first call.
	let mut acc = [0u8; 20];
	for (i, chunk) in signature.chunks(4).enumerate() {
		let mut mixed = 0u32;
		for &b in chunk {
			mixed = mixed.wrapping_mul(31).wrapping_add(b as u32);
		}
		let bytes = mixed.to_be_bytes();
		let out = &mut acc[(i * 4) % 20..];
		for (o, b) in out.iter_mut().zip(bytes.iter()) {
			*o ^= b;
		}
	}
	Address::from(acc)
}

/// A full block: header plus transactions.
#[derive(Debug, Clone)]
pub struct Block {
	pub header: BlockHeader,
	pub transactions: Vec<Tx>,
}

impl Block {
	pub fn new(header: BlockHeader, transactions: Vec<Tx>) -> Self {
		Block { header, transactions }
	}

	pub fn number(&self) -> BlockNumber {
		self.header.number
	}

	pub fn hash(&self) -> H256 {
		self.header.hash
	}

	pub fn parent_hash(&self) -> H256 {
		self.header.parent_hash
	}

	pub fn encoded(&self) -> Vec<u8> {
		let mut out = self.header.encoded();
		out.extend_from_slice(&(self.transactions.len() as u64).to_be_bytes());
		out
	}
}

/// Outcome of handing a block to the chain for import.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ImportResult {
	/// Imported and became the new canonical head.
	ImportedBest,
	/// Imported but did not extend the canonical head (a side chain).
	ImportedNotBest,
	/// Already known; no-op.
	Exists,
	/// Parent is not present in the chain.
	NoParent,
	/// Failed block-level validation (PoW, state transition, ...).
	InvalidBlock,
	/// Any other failure, carrying a diagnostic message.
	Error(String),
}

/// The chain-import collaborator. Only its contract is specified here; the
/// real implementation owns consensus, state and persistence.
pub trait Chain: Send + Sync {
	/// Attempts to connect `block` to the chain.
	fn try_connect(&self, block: Block) -> ImportResult;

	/// Number of the last block known-imported by the chain.
	fn head_number(&self) -> BlockNumber;

	/// Hash of the last block known-imported by the chain.
	fn head_hash(&self) -> H256;

	/// Whether the chain subsystem is initialized enough to be queried. The
	/// engine blocks on this at startup instead of sleeping a fixed delay.
	fn is_ready(&self) -> bool {
		true
	}
}

/// Errors a `HeaderValidator` can report; the engine only ever logs these.
#[derive(Debug, Clone, thiserror::Error)]
pub enum HeaderValidationError {
	#[error("header {0} at height {1} failed proof-of-work validation")]
	InvalidProofOfWork(H256, BlockNumber),
	#[error("header {0} at height {1} has an invalid timestamp")]
	InvalidTimestamp(H256, BlockNumber),
	#[error("header {0} at height {1} rejected: {2}")]
	Other(H256, BlockNumber, String),
}

/// The header-validation collaborator: a pure predicate over a single
/// header. Real implementations check proof-of-work, difficulty and
/// timestamp bounds; this crate only specifies the contract.
pub trait HeaderValidator: Send + Sync {
	fn validate(&self, header: &BlockHeader) -> Result<(), HeaderValidationError>;
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn sender_is_deterministic_and_cached() {
		let tx = Tx::new([7u8; 65]);
		assert!(!tx.sender_is_cached());
		let a = tx.sender();
		assert!(tx.sender_is_cached());
		let b = tx.sender();
		assert_eq!(a, b);
	}

	#[test]
	fn different_signatures_recover_different_senders() {
		let a = Tx::new([1u8; 65]).sender();
		let b = Tx::new([2u8; 65]).sender();
		assert_ne!(a, b);
	}

	#[test]
	fn header_encoding_is_stable() {
		let h = BlockHeader::new(1, H256::repeat_byte(1), H256::zero(), 100);
		assert_eq!(h.encoded(), h.encoded());
	}
}
