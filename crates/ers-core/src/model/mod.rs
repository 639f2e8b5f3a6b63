//! In-memory model of a parsed evidence record.
//!
//! ```text
//! ArchiveTimeStampSequence          (syntax, chains ordered 1..)
//! └── ArchiveTimeStampChain         (order, digest algorithm, c14n method)
//!     └── ArchiveTimeStamp          (order, reduced hash tree, token)
//!         ├── ReducedHashTree       (groups of sibling digests)
//!         └── TimestampToken        (opaque, encoded bytes)
//! ```
//!
//! The model is produced by an external, format-specific parser and is
//! read-only to the verification engine. [`DataObject`]s are the detached
//! documents the caller wants to prove.

pub(crate) mod encoding;

mod chain;
mod data_object;
mod hash_tree;
mod sequence;

pub use chain::{ArchiveTimeStamp, ArchiveTimeStampChain, TimestampToken};
pub use data_object::{DataObject, DataObjectContent};
pub use hash_tree::{DigestGroup, ReducedHashTree, SiblingOrder, TreeError};
pub use sequence::{ArchiveTimeStampSequence, RecordSyntax, StructureViolation};
