use serde::{Deserialize, Serialize};
use starknet_api::block::{BlockHash, BlockNumber, BlockStatus, BlockTimestamp, GasPrice};
use starknet_api::core::{ContractAddress, GlobalRoot};

use crate::reader::{Header, L1Head};
use crate::transaction::Transactions;

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ResourcePrice {
    pub price_in_fri: GasPrice,
    pub price_in_wei: GasPrice,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct BlockHeader {
    pub block_hash: BlockHash,
    pub parent_hash: BlockHash,
    pub block_number: BlockNumber,
    pub new_root: GlobalRoot,
    pub timestamp: BlockTimestamp,
    pub sequencer_address: ContractAddress,
    pub l1_gas_price: ResourcePrice,
    pub starknet_version: String,
}

/// A pending block has no hash, number or state root yet.
#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PendingBlockHeader {
    pub parent_hash: BlockHash,
    pub timestamp: BlockTimestamp,
    pub sequencer_address: ContractAddress,
    pub l1_gas_price: ResourcePrice,
    pub starknet_version: String,
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum GeneralBlockHeader {
    BlockHeader(BlockHeader),
    PendingBlockHeader(PendingBlockHeader),
}

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct Block {
    pub status: BlockStatus,
    #[serde(flatten)]
    pub header: GeneralBlockHeader,
    pub transactions: Transactions,
}

/// Adapts a stored header to its wire form. A header without a hash is the
/// pending block and loses its number and state root on the way out.
pub fn adapt_header(header: &Header) -> GeneralBlockHeader {
    let l1_gas_price = ResourcePrice {
        price_in_fri: header.strk_l1_gas_price,
        price_in_wei: header.eth_l1_gas_price,
    };
    let sequencer_address = header.sequencer_address.unwrap_or_default();
    match header.hash {
        Some(block_hash) => GeneralBlockHeader::BlockHeader(BlockHeader {
            block_hash,
            parent_hash: header.parent_hash,
            block_number: header.number,
            new_root: header.global_state_root.unwrap_or_default(),
            timestamp: header.timestamp,
            sequencer_address,
            l1_gas_price,
            starknet_version: header.protocol_version.clone(),
        }),
        None => GeneralBlockHeader::PendingBlockHeader(PendingBlockHeader {
            parent_hash: header.parent_hash,
            timestamp: header.timestamp,
            sequencer_address,
            l1_gas_price,
            starknet_version: header.protocol_version.clone(),
        }),
    }
}

/// Determines the finality of a sealed block against the L1 head. The pending
/// block never reaches this; it is `PENDING` by construction.
pub fn block_status(number: BlockNumber, l1_head: Option<&L1Head>) -> BlockStatus {
    match l1_head {
        Some(l1_head) if l1_head.block_number >= number => BlockStatus::AcceptedOnL1,
        _ => BlockStatus::AcceptedOnL2,
    }
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;
    use starknet_api::hash::StarkFelt;
    use starknet_api::stark_felt;

    use super::*;

    fn header() -> Header {
        Header {
            hash: Some(BlockHash(stark_felt!("0xabc"))),
            parent_hash: BlockHash(stark_felt!("0xdef")),
            number: BlockNumber(7),
            global_state_root: Some(GlobalRoot(stark_felt!("0x1"))),
            sequencer_address: None,
            timestamp: BlockTimestamp(1234),
            protocol_version: "0.13.0".to_owned(),
            eth_l1_gas_price: GasPrice(10),
            strk_l1_gas_price: GasPrice(20),
        }
    }

    #[test]
    fn missing_sequencer_address_defaults_to_zero() {
        let GeneralBlockHeader::BlockHeader(adapted) = adapt_header(&header()) else {
            panic!("expected a sealed header");
        };
        assert_eq!(adapted.sequencer_address, ContractAddress::default());
        assert_eq!(
            serde_json::to_value(&adapted.sequencer_address).unwrap(),
            serde_json::json!("0x0")
        );
    }

    #[test]
    fn header_without_hash_adapts_to_pending() {
        let mut stored = header();
        stored.hash = None;
        stored.global_state_root = None;
        let adapted = adapt_header(&stored);
        let as_json = serde_json::to_value(&adapted).unwrap();
        assert!(as_json.get("block_hash").is_none());
        assert!(as_json.get("block_number").is_none());
        assert!(as_json.get("new_root").is_none());
        assert_eq!(as_json["parent_hash"], serde_json::json!("0xdef"));
    }

    #[test]
    fn finality_follows_the_l1_head() {
        let l1_head = L1Head { block_number: BlockNumber(7), ..Default::default() };
        assert_eq!(block_status(BlockNumber(7), Some(&l1_head)), BlockStatus::AcceptedOnL1);
        assert_eq!(block_status(BlockNumber(8), Some(&l1_head)), BlockStatus::AcceptedOnL2);
        assert_eq!(block_status(BlockNumber(8), None), BlockStatus::AcceptedOnL2);
    }
}
