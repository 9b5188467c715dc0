use serde::{Deserialize, Serialize};
use starknet_api::block::{BlockHash, BlockNumber};

/// The status of the node's sync, or `false` when it is not syncing.
#[derive(Copy, Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum SyncingState {
    Synced(bool),
    SyncStatus(SyncStatus),
}

impl Default for SyncingState {
    fn default() -> Self {
        Self::Synced(false)
    }
}

/// The progress of a running sync.
#[derive(Copy, Clone, Debug, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct SyncStatus {
    pub starting_block_hash: BlockHash,
    pub starting_block_num: BlockNumber,
    pub current_block_hash: BlockHash,
    pub current_block_num: BlockNumber,
    pub highest_block_hash: BlockHash,
    pub highest_block_num: BlockNumber,
}
