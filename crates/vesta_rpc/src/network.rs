use lazy_static::lazy_static;
use serde::{Deserialize, Serialize};
use starknet_api::core::{ChainId, ContractAddress, PatriciaKey};
use starknet_api::hash::StarkFelt;
use starknet_api::patricia_key;

lazy_static! {
    // Blocks produced before the sequencer address was part of the protocol
    // carry no address; the gateway used this one.
    static ref FALLBACK_SEQUENCER_ADDRESS: ContractAddress = ContractAddress(patricia_key!(
        "0x46a89ae102987331d369645031b49c27738ed096f2789c24449966da4c6de6b"
    ));
}

/// The Starknet networks a node can follow.
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Network {
    Mainnet,
    Goerli,
    Goerli2,
    Integration,
}

impl Network {
    pub fn chain_id(&self) -> ChainId {
        let id = match self {
            Network::Mainnet => "SN_MAIN",
            Network::Goerli | Network::Integration => "SN_GOERLI",
            Network::Goerli2 => "SN_GOERLI2",
        };
        ChainId(id.to_owned())
    }

    /// The sequencer address to execute with when a header carries none.
    pub fn fallback_sequencer_address(&self) -> ContractAddress {
        *FALLBACK_SEQUENCER_ADDRESS
    }
}

impl std::fmt::Display for Network {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Network::Mainnet => write!(f, "mainnet"),
            Network::Goerli => write!(f, "goerli"),
            Network::Goerli2 => write!(f, "goerli2"),
            Network::Integration => write!(f, "integration"),
        }
    }
}
