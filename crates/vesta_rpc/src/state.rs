use serde::{Deserialize, Serialize};
use starknet_api::block::BlockHash;
use starknet_api::core::{ClassHash, CompiledClassHash, ContractAddress, GlobalRoot, Nonce};
use starknet_api::core::EntryPointSelector;
use starknet_api::hash::StarkFelt;
use starknet_api::state::StorageKey;

use crate::reader;

#[derive(Debug, Clone, Eq, PartialEq, Deserialize, Serialize)]
#[serde(untagged)]
pub enum StateUpdate {
    AcceptedStateUpdate(AcceptedStateUpdate),
    PendingStateUpdate(PendingStateUpdate),
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct AcceptedStateUpdate {
    pub block_hash: BlockHash,
    pub new_root: GlobalRoot,
    pub old_root: GlobalRoot,
    pub state_diff: ThinStateDiff,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct PendingStateUpdate {
    pub old_root: GlobalRoot,
    pub state_diff: ThinStateDiff,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Deserialize, Serialize)]
pub struct ThinStateDiff {
    pub deployed_contracts: Vec<DeployedContract>,
    pub storage_diffs: Vec<StorageDiff>,
    pub declared_classes: Vec<ClassHashes>,
    pub deprecated_declared_classes: Vec<ClassHash>,
    pub nonces: Vec<ContractNonce>,
    pub replaced_classes: Vec<ReplacedClass>,
}

/// The nonce of a Starknet contract.
#[derive(Debug, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct ContractNonce {
    pub contract_address: ContractAddress,
    pub nonce: Nonce,
}

/// A deployed contract in Starknet.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct DeployedContract {
    pub address: ContractAddress,
    pub class_hash: ClassHash,
}

#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct StorageDiff {
    pub address: ContractAddress,
    pub storage_entries: Vec<StorageEntry>,
}

/// A storage entry in a contract.
#[derive(Debug, Default, Clone, Eq, PartialEq, Hash, Deserialize, Serialize)]
pub struct StorageEntry {
    pub key: StorageKey,
    pub value: StarkFelt,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ClassHashes {
    pub class_hash: ClassHash,
    pub compiled_class_hash: CompiledClassHash,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ReplacedClass {
    pub contract_address: ContractAddress,
    pub class_hash: ClassHash,
}

impl From<reader::StateDiff> for ThinStateDiff {
    fn from(diff: reader::StateDiff) -> Self {
        Self {
            deployed_contracts: Vec::from_iter(
                diff.deployed_contracts
                    .into_iter()
                    .map(|(address, class_hash)| DeployedContract { address, class_hash }),
            ),
            storage_diffs: Vec::from_iter(diff.storage_diffs.into_iter().map(
                |(address, entries)| {
                    let storage_entries = Vec::from_iter(
                        entries.into_iter().map(|(key, value)| StorageEntry { key, value }),
                    );
                    StorageDiff { address, storage_entries }
                },
            )),
            declared_classes: diff
                .declared_classes
                .into_iter()
                .map(|(class_hash, compiled_class_hash)| ClassHashes {
                    class_hash,
                    compiled_class_hash,
                })
                .collect(),
            deprecated_declared_classes: diff.deprecated_declared_classes,
            nonces: Vec::from_iter(
                diff.nonces
                    .into_iter()
                    .map(|(contract_address, nonce)| ContractNonce { contract_address, nonce }),
            ),
            replaced_classes: Vec::from_iter(diff.replaced_classes.into_iter().map(
                |(contract_address, class_hash)| ReplacedClass { contract_address, class_hash },
            )),
        }
    }
}

/// Adapts a stored state update. Updates without a block hash belong to the
/// pending block and lose the new root on the way out.
pub fn adapt_state_update(update: reader::StateUpdate) -> StateUpdate {
    match update.block_hash {
        Some(block_hash) => StateUpdate::AcceptedStateUpdate(AcceptedStateUpdate {
            block_hash,
            new_root: update.new_root.unwrap_or_default(),
            old_root: update.old_root,
            state_diff: update.state_diff.into(),
        }),
        None => StateUpdate::PendingStateUpdate(PendingStateUpdate {
            old_root: update.old_root,
            state_diff: update.state_diff.into(),
        }),
    }
}

/// A cairo-1 entry point: an index into the sierra program, never an offset.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct EntryPoint {
    pub function_idx: u64,
    pub selector: EntryPointSelector,
}

#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct EntryPointByType {
    #[serde(rename = "CONSTRUCTOR")]
    pub constructor: Vec<EntryPoint>,
    #[serde(rename = "EXTERNAL")]
    pub external: Vec<EntryPoint>,
    #[serde(rename = "L1_HANDLER")]
    pub l1handler: Vec<EntryPoint>,
}

/// A cairo-1 (sierra) class in wire form.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ContractClass {
    pub sierra_program: Vec<StarkFelt>,
    pub contract_class_version: String,
    pub entry_points_by_type: EntryPointByType,
    pub abi: String,
}

impl From<ContractClass> for reader::SierraClass {
    fn from(class: ContractClass) -> Self {
        let adapt = |entry_points: Vec<EntryPoint>| {
            entry_points
                .into_iter()
                .map(|entry_point| reader::SierraEntryPoint {
                    index: entry_point.function_idx,
                    selector: entry_point.selector,
                })
                .collect()
        };
        Self {
            sierra_program: class.sierra_program,
            semantic_version: class.contract_class_version,
            abi: class.abi,
            constructors: adapt(class.entry_points_by_type.constructor),
            externals: adapt(class.entry_points_by_type.external),
            l1_handlers: adapt(class.entry_points_by_type.l1handler),
        }
    }
}

impl From<reader::SierraClass> for ContractClass {
    fn from(class: reader::SierraClass) -> Self {
        let adapt = |entry_points: Vec<reader::SierraEntryPoint>| {
            entry_points
                .into_iter()
                .map(|entry_point| EntryPoint {
                    function_idx: entry_point.index,
                    selector: entry_point.selector,
                })
                .collect()
        };
        Self {
            sierra_program: class.sierra_program,
            contract_class_version: class.semantic_version,
            entry_points_by_type: EntryPointByType {
                constructor: adapt(class.constructors),
                external: adapt(class.externals),
                l1handler: adapt(class.l1_handlers),
            },
            abi: class.abi,
        }
    }
}

#[cfg(test)]
mod tests {
    use indexmap::indexmap;
    use pretty_assertions::assert_eq;
    use starknet_api::stark_felt;

    use super::*;

    #[test]
    fn state_diff_adaptation_preserves_insertion_order() {
        let diff = reader::StateDiff {
            storage_diffs: indexmap! {
                ContractAddress::default() => indexmap! {
                    StorageKey::default() => stark_felt!("0x7"),
                },
            },
            nonces: indexmap! { ContractAddress::default() => Nonce(stark_felt!("0x2")) },
            ..Default::default()
        };
        let adapted = ThinStateDiff::from(diff);
        assert_eq!(adapted.storage_diffs.len(), 1);
        assert_eq!(adapted.storage_diffs[0].storage_entries[0].value, stark_felt!("0x7"));
        assert_eq!(adapted.nonces[0].nonce, Nonce(stark_felt!("0x2")));
    }

    #[test]
    fn pending_state_update_has_no_block_fields() {
        let update = reader::StateUpdate {
            block_hash: None,
            new_root: None,
            old_root: GlobalRoot(stark_felt!("0x1")),
            state_diff: Default::default(),
        };
        let adapted = adapt_state_update(update);
        let as_json = serde_json::to_value(&adapted).unwrap();
        assert!(as_json.get("block_hash").is_none());
        assert!(as_json.get("new_root").is_none());
        assert_eq!(as_json["old_root"], serde_json::json!("0x1"));
    }

    #[test]
    fn sierra_entry_points_carry_an_index_and_no_offset() {
        let class = reader::SierraClass {
            externals: vec![reader::SierraEntryPoint {
                index: 4,
                selector: EntryPointSelector(stark_felt!("0x44")),
            }],
            semantic_version: "0.1.0".to_owned(),
            ..Default::default()
        };
        let as_json = serde_json::to_value(ContractClass::from(class)).unwrap();
        let entry_point = &as_json["entry_points_by_type"]["EXTERNAL"][0];
        assert_eq!(entry_point["function_idx"], serde_json::json!(4));
        assert!(entry_point.get("offset").is_none());
    }
}
