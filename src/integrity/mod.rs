//! Content-addressed tamper detection
//!
//! - Per-file SHA-256 digests and a digest-of-digests for the whole state
//! - `checksums.json` manifest for the state directory
//! - Self-verifying checkpoint snapshots

pub mod checksum;
pub mod manifest;
pub mod snapshot;

pub use crate::error::IntegrityError;

pub use checksum::{
    calculate_checksum, calculate_state_checksum, checksum_bytes, combine_hashes,
    verify_file_checksum,
};
pub use manifest::{
    build_manifest, load_manifest, store_checksums, store_checksums_with, verify_checksums,
    IntegrityReport,
};
pub use snapshot::{
    create_snapshot, create_snapshot_manifest, list_snapshots, prune_snapshots,
    restore_snapshot, restore_snapshot_with, verify_snapshot_manifest, SnapshotInfo, SnapshotStatus,
};
