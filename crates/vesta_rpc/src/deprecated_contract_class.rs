use serde::{Deserialize, Serialize};
use starknet_api::core::EntryPointSelector;
use starknet_api::hash::StarkFelt;

use crate::reader;

/// A cairo-0 entry point: an offset into the program, never a sierra index.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct EntryPoint {
    pub offset: StarkFelt,
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

/// A cairo-0 class in wire form. The program stays the opaque blob the node
/// stores and the ABI is relayed untouched.
#[derive(Debug, Clone, Default, Eq, PartialEq, Deserialize, Serialize)]
pub struct ContractClass {
    pub program: String,
    pub entry_points_by_type: EntryPointByType,
    #[serde(skip_serializing_if = "serde_json::Value::is_null")]
    #[serde(default)]
    pub abi: serde_json::Value,
}

impl From<ContractClass> for reader::DeprecatedClass {
    fn from(class: ContractClass) -> Self {
        let adapt = |entry_points: Vec<EntryPoint>| {
            entry_points
                .into_iter()
                .map(|entry_point| reader::DeprecatedEntryPoint {
                    offset: entry_point.offset,
                    selector: entry_point.selector,
                })
                .collect()
        };
        Self {
            abi: class.abi,
            program: class.program,
            constructors: adapt(class.entry_points_by_type.constructor),
            externals: adapt(class.entry_points_by_type.external),
            l1_handlers: adapt(class.entry_points_by_type.l1handler),
        }
    }
}

impl From<reader::DeprecatedClass> for ContractClass {
    fn from(class: reader::DeprecatedClass) -> Self {
        let adapt = |entry_points: Vec<reader::DeprecatedEntryPoint>| {
            entry_points
                .into_iter()
                .map(|entry_point| EntryPoint {
                    offset: entry_point.offset,
                    selector: entry_point.selector,
                })
                .collect()
        };
        Self {
            program: class.program,
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
    use pretty_assertions::assert_eq;
    use starknet_api::stark_felt;

    use super::*;

    #[test]
    fn cairo0_entry_points_carry_an_offset_and_no_index() {
        let class = reader::DeprecatedClass {
            abi: serde_json::json!([{"type": "function", "name": "transfer"}]),
            program: "H4sIAAAA".to_owned(),
            l1_handlers: vec![reader::DeprecatedEntryPoint {
                offset: stark_felt!("0x12a"),
                selector: EntryPointSelector(stark_felt!("0x44")),
            }],
            ..Default::default()
        };
        let as_json = serde_json::to_value(ContractClass::from(class)).unwrap();
        let entry_point = &as_json["entry_points_by_type"]["L1_HANDLER"][0];
        assert_eq!(entry_point["offset"], serde_json::json!("0x12a"));
        assert!(entry_point.get("function_idx").is_none());
        assert_eq!(as_json["abi"][0]["name"], serde_json::json!("transfer"));
    }
}
