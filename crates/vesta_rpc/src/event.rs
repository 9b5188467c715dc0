#[cfg(test)]
#[path = "event_test.rs"]
mod event_test;

use std::collections::HashSet;

use jsonrpsee::types::ErrorObjectOwned;
use serde::{Deserialize, Serialize};
use starknet_api::block::{BlockHash, BlockNumber};
use starknet_api::core::ContractAddress;
use starknet_api::transaction::{EventKey, TransactionHash};
use tracing::warn;

use crate::api::{BlockHashOrNumber, BlockId, Tag};
use crate::error::{BLOCK_NOT_FOUND, INVALID_CONTINUATION_TOKEN};
use crate::reader::{Block, Reader};
use crate::transaction::EventContent;

#[derive(Debug, Default, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventFilter {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub from_block: Option<BlockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub to_block: Option<BlockId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<ContinuationToken>,
    pub chunk_size: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address: Option<ContractAddress>,
    #[serde(default)]
    pub keys: Vec<HashSet<EventKey>>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct EventsChunk {
    pub events: Vec<Event>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub continuation_token: Option<ContinuationToken>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct Event {
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub block_hash: Option<BlockHash>,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[serde(default)]
    pub block_number: Option<BlockNumber>,
    pub transaction_hash: TransactionHash,
    #[serde(flatten)]
    pub event: EventContent,
}

/// An opaque cursor into the event stream. The current format is
/// `"<block number>-<event offset within the block>"`, pointing at the first
/// event a follow-up query should consider.
#[derive(Debug, Clone, Hash, PartialEq, Eq, Deserialize, Serialize)]
pub struct ContinuationToken(pub String);

impl ContinuationToken {
    fn new(block_number: BlockNumber, offset: usize) -> Self {
        Self(format!("{}-{}", block_number.0, offset))
    }

    fn parse(&self) -> Result<(BlockNumber, usize), ErrorObjectOwned> {
        let invalid = || ErrorObjectOwned::from(INVALID_CONTINUATION_TOKEN);
        let (block_number, offset) = self.0.split_once('-').ok_or_else(invalid)?;
        Ok((
            BlockNumber(block_number.parse().map_err(|_| invalid())?),
            offset.parse().map_err(|_| invalid())?,
        ))
    }
}

/// An event matches iff the address (when set) equals its emitter and every
/// non-empty key set contains the event key at its position. Event keys
/// beyond the filter's length are unconstrained.
fn matches_filter(
    event: &starknet_api::transaction::Event,
    address: Option<&ContractAddress>,
    keys: &[HashSet<EventKey>],
) -> bool {
    if let Some(address) = address {
        if event.from_address != *address {
            return false;
        }
    }
    keys.iter().enumerate().all(|(i, key_set)| {
        key_set.is_empty()
            || event.content.keys.get(i).map_or(false, |key| key_set.contains(key))
    })
}

/// Flattens a block's events in (transaction, event) order.
fn block_events(
    block: &Block,
) -> impl Iterator<Item = (TransactionHash, &starknet_api::transaction::Event)> + '_ {
    block
        .receipts
        .iter()
        .flat_map(|receipt| receipt.events.iter().map(|event| (receipt.transaction_hash, event)))
}

/// Runs an event query against the reader: resolve the block range, scan in
/// (block, transaction, event) order, stop after `chunk_size` matches and
/// emit a cursor pointing before the next unseen match. `filter_limit` caps
/// the canonical blocks read per call; hitting it yields a cursor at the next
/// unread block even when the page is not full.
pub(crate) fn filter_events(
    reader: &dyn Reader,
    filter: &EventFilter,
    filter_limit: usize,
) -> Result<EventsChunk, ErrorObjectOwned> {
    let Ok(latest) = reader.height() else {
        if matches!(filter.to_block, Some(BlockId::Tag(Tag::Pending)) | None) {
            warn!("event query over an empty chain; returning no events");
        }
        return Ok(EventsChunk { events: vec![], continuation_token: None });
    };

    let resolve = |block_id: &BlockId| -> Result<BlockNumber, ErrorObjectOwned> {
        match block_id {
            BlockId::Tag(Tag::Latest) => Ok(latest),
            BlockId::Tag(Tag::Pending) => Ok(latest.next()),
            BlockId::HashOrNumber(BlockHashOrNumber::Number(number)) => Ok(*number),
            BlockId::HashOrNumber(BlockHashOrNumber::Hash(hash)) => Ok(reader
                .block_header_by_hash(hash)
                .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?
                .number),
        }
    };

    let from_block = match &filter.from_block {
        Some(block_id) => resolve(block_id)?,
        None => BlockNumber(0),
    };
    let to_block = match &filter.to_block {
        Some(block_id) => resolve(block_id)?,
        None => latest,
    };
    // The pending block is scanned only when named outright; an upper bound
    // past the head is just an open range.
    let include_pending = matches!(filter.to_block, Some(BlockId::Tag(Tag::Pending)));
    let canonical_to = std::cmp::min(to_block, latest);

    let (start_block, start_offset) = match &filter.continuation_token {
        Some(token) => token.parse()?,
        None => (from_block, 0),
    };

    let mut events = vec![];
    let mut blocks_read = 0usize;
    let mut block_number = start_block;
    while block_number <= canonical_to {
        if blocks_read == filter_limit {
            return Ok(EventsChunk {
                events,
                continuation_token: Some(ContinuationToken::new(block_number, 0)),
            });
        }
        blocks_read += 1;
        let block = reader
            .block_by_number(block_number)
            .map_err(|_| ErrorObjectOwned::from(BLOCK_NOT_FOUND))?;
        let skip = if block_number == start_block { start_offset } else { 0 };
        for (offset, (transaction_hash, event)) in block_events(&block).enumerate() {
            if offset < skip || !matches_filter(event, filter.address.as_ref(), &filter.keys) {
                continue;
            }
            if events.len() == filter.chunk_size {
                return Ok(EventsChunk {
                    events,
                    continuation_token: Some(ContinuationToken::new(block_number, offset)),
                });
            }
            events.push(Event {
                block_hash: block.header.hash,
                block_number: Some(block_number),
                transaction_hash,
                event: event.clone().into(),
            });
        }
        block_number = block_number.next();
    }

    if include_pending {
        let pending_number = latest.next();
        if let Ok(pending) = reader.pending() {
            let skip = if start_block == pending_number { start_offset } else { 0 };
            for (offset, (transaction_hash, event)) in block_events(&pending.block).enumerate() {
                if offset < skip || !matches_filter(event, filter.address.as_ref(), &filter.keys) {
                    continue;
                }
                if events.len() == filter.chunk_size {
                    return Ok(EventsChunk {
                        events,
                        continuation_token: Some(ContinuationToken::new(pending_number, offset)),
                    });
                }
                events.push(Event {
                    block_hash: None,
                    block_number: None,
                    transaction_hash,
                    event: event.clone().into(),
                });
            }
        }
    }

    Ok(EventsChunk { events, continuation_token: None })
}
