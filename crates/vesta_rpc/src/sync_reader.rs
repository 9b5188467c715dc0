//! Read access to the synchronizer, which drives the node towards the
//! network's head and announces every block it commits.

use std::sync::Arc;

#[cfg(any(test, feature = "testing"))]
use mockall::automock;
use starknet_api::block::BlockNumber;
use tokio::sync::broadcast;

use crate::reader::Header;

/// Capacity of the new-heads fan-out channel. A subscriber that lags this far
/// behind is cut off rather than slowing the synchronizer down.
pub const NEW_HEADS_CHANNEL_CAPACITY: usize = 1024;

#[cfg_attr(any(test, feature = "testing"), automock)]
pub trait SyncReader: Send + Sync {
    /// The block the current sync session started from, if one is running.
    fn starting_block_number(&self) -> Option<BlockNumber>;

    /// The highest block header the synchronizer has seen on the network.
    fn highest_block_header(&self) -> Option<Header>;

    /// Subscribe to headers of newly committed blocks, in increasing block
    /// number order.
    fn subscribe_new_heads(&self) -> broadcast::Receiver<Header>;
}

pub type SharedSyncReader = Arc<dyn SyncReader>;

/// A new-heads feed backed by a broadcast channel. The synchronizer holds the
/// sender half; [`SyncReader::subscribe_new_heads`] hands out receivers.
#[derive(Debug, Clone)]
pub struct NewHeadsFeed {
    sender: broadcast::Sender<Header>,
}

impl NewHeadsFeed {
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(NEW_HEADS_CHANNEL_CAPACITY);
        Self { sender }
    }

    pub fn announce(&self, header: Header) {
        // Nobody listening is not an error.
        let _ = self.sender.send(header);
    }

    pub fn subscribe(&self) -> broadcast::Receiver<Header> {
        self.sender.subscribe()
    }
}

impl Default for NewHeadsFeed {
    fn default() -> Self {
        Self::new()
    }
}
