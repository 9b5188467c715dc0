use std::collections::HashMap;
use std::sync::Arc;

use pretty_assertions::assert_eq;
use serde_json::json;
use starknet_api::block::{BlockHash, BlockNumber};
use starknet_api::core::{
    ClassHash,
    CompiledClassHash,
    ContractAddress,
    Nonce,
    PatriciaKey,
};
use starknet_api::data_availability::DataAvailabilityMode;
use starknet_api::hash::StarkFelt;
use starknet_api::transaction::{
    AccountDeploymentData,
    Calldata,
    Fee,
    PaymasterData,
    Resource,
    ResourceBounds,
    Tip,
    TransactionHash,
    TransactionSignature,
};
use starknet_api::{patricia_key, stark_felt};

use super::*;
use crate::reader;

fn declare_v3() -> starknet_api::transaction::Transaction {
    starknet_api::transaction::Transaction::Declare(
        starknet_api::transaction::DeclareTransaction::V3(
            starknet_api::transaction::DeclareTransactionV3 {
                resource_bounds: starknet_api::transaction::ResourceBoundsMapping(
                    [
                        (
                            Resource::L1Gas,
                            ResourceBounds {
                                max_amount: 0x186a0,
                                max_price_per_unit: 0x2540be400,
                            },
                        ),
                        (Resource::L2Gas, ResourceBounds::default()),
                    ]
                    .into(),
                ),
                tip: Tip(0),
                signature: TransactionSignature(vec![
                    stark_felt!("0x29a49dff154fede73dd7b5ca5a0beadf40b4b069f3a850cd8428e54dc809ccc"),
                    stark_felt!("0x429d142a17223b4f2acde0f5ecb9ad453e188b245003c86fab5c109bad58fc3"),
                ]),
                nonce: Nonce(stark_felt!("0x1")),
                class_hash: ClassHash(stark_felt!(
                    "0x5ae9d09292a50ed48c5930904c880dab56e85b825022a7d689cfc9e65e01ee7"
                )),
                compiled_class_hash: CompiledClassHash(stark_felt!(
                    "0x1add56d64bebf8140f3b8a38bdf102b7874437f0c861ab4ca7526ec33b4d0f8"
                )),
                sender_address: ContractAddress(patricia_key!(
                    "0x2fab82e4aef1d8664874e1f194951856d48463c3e6bf9a8c68e234a629a6f50"
                )),
                nonce_data_availability_mode: DataAvailabilityMode::L1,
                fee_data_availability_mode: DataAvailabilityMode::L1,
                paymaster_data: PaymasterData(vec![]),
                account_deployment_data: AccountDeploymentData(vec![]),
            },
        ),
    )
}

fn declare_v3_hash() -> TransactionHash {
    TransactionHash(stark_felt!(
        "0x41d1f5206ef58a443e7d3d1ca073171ec25fa75313394318fc83a074a6631c3"
    ))
}

#[test]
fn adapt_declare_v3_on_the_current_schema() {
    let adapted = adapt_transaction(declare_v3(), declare_v3_hash(), Schema::Current);
    let expected = json!({
        "transaction_hash": "0x41d1f5206ef58a443e7d3d1ca073171ec25fa75313394318fc83a074a6631c3",
        "type": "DECLARE",
        "version": "0x3",
        "nonce": "0x1",
        "sender_address": "0x2fab82e4aef1d8664874e1f194951856d48463c3e6bf9a8c68e234a629a6f50",
        "class_hash": "0x5ae9d09292a50ed48c5930904c880dab56e85b825022a7d689cfc9e65e01ee7",
        "compiled_class_hash": "0x1add56d64bebf8140f3b8a38bdf102b7874437f0c861ab4ca7526ec33b4d0f8",
        "signature": [
            "0x29a49dff154fede73dd7b5ca5a0beadf40b4b069f3a850cd8428e54dc809ccc",
            "0x429d142a17223b4f2acde0f5ecb9ad453e188b245003c86fab5c109bad58fc3"
        ],
        "resource_bounds": {
            "l1_gas": { "max_amount": "0x186a0", "max_price_per_unit": "0x2540be400" },
            "l2_gas": { "max_amount": "0x0", "max_price_per_unit": "0x0" }
        },
        "tip": "0x0",
        "paymaster_data": [],
        "account_deployment_data": [],
        "nonce_data_availability_mode": "L1",
        "fee_data_availability_mode": "L1"
    });
    assert_eq!(serde_json::to_value(&adapted).unwrap(), expected);
}

#[test]
fn adapt_declare_v3_on_the_legacy_schema() {
    let adapted = adapt_transaction(declare_v3(), declare_v3_hash(), Schema::Legacy);
    let expected = json!({
        "transaction_hash": "0x41d1f5206ef58a443e7d3d1ca073171ec25fa75313394318fc83a074a6631c3",
        "type": "DECLARE",
        "version": "0x2",
        "nonce": "0x1",
        "sender_address": "0x2fab82e4aef1d8664874e1f194951856d48463c3e6bf9a8c68e234a629a6f50",
        "class_hash": "0x5ae9d09292a50ed48c5930904c880dab56e85b825022a7d689cfc9e65e01ee7",
        "compiled_class_hash": "0x1add56d64bebf8140f3b8a38bdf102b7874437f0c861ab4ca7526ec33b4d0f8",
        "signature": [
            "0x29a49dff154fede73dd7b5ca5a0beadf40b4b069f3a850cd8428e54dc809ccc",
            "0x429d142a17223b4f2acde0f5ecb9ad453e188b245003c86fab5c109bad58fc3"
        ],
        "max_fee": "0x38d7ea4c68000"
    });
    assert_eq!(serde_json::to_value(&adapted).unwrap(), expected);
}

#[test]
fn legacy_schema_drops_every_v3_only_field() {
    let invoke = starknet_api::transaction::Transaction::Invoke(
        starknet_api::transaction::InvokeTransaction::V3(
            starknet_api::transaction::InvokeTransactionV3 {
                resource_bounds: starknet_api::transaction::ResourceBoundsMapping(
                    [
                        (
                            Resource::L1Gas,
                            ResourceBounds {
                                max_amount: 0x186a0,
                                max_price_per_unit: 0x5af3107a4000,
                            },
                        ),
                        (Resource::L2Gas, ResourceBounds::default()),
                    ]
                    .into(),
                ),
                tip: Tip(0),
                signature: TransactionSignature(vec![stark_felt!("0x1")]),
                nonce: Nonce(stark_felt!("0xe97")),
                sender_address: ContractAddress(patricia_key!("0x3f6f")),
                calldata: Calldata(Arc::new(vec![stark_felt!("0x2")])),
                nonce_data_availability_mode: DataAvailabilityMode::L1,
                fee_data_availability_mode: DataAvailabilityMode::L1,
                paymaster_data: PaymasterData(vec![]),
                account_deployment_data: AccountDeploymentData(vec![]),
            },
        ),
    );
    let adapted =
        adapt_transaction(invoke, TransactionHash(stark_felt!("0x49728601")), Schema::Legacy);
    let as_json = serde_json::to_value(&adapted).unwrap();

    for dropped in [
        "resource_bounds",
        "tip",
        "paymaster_data",
        "account_deployment_data",
        "nonce_data_availability_mode",
        "fee_data_availability_mode",
    ] {
        assert!(as_json.get(dropped).is_none(), "{dropped} should be dropped");
    }
    assert_eq!(as_json["version"], json!("0x1"));
    // max_amount * max_price_per_unit.
    assert_eq!(as_json["max_fee"], json!("0x8ac7230489e80000"));
}

#[test]
fn legacy_max_fee_saturates_instead_of_wrapping() {
    let bounds = starknet_api::transaction::ResourceBoundsMapping(
        [
            (
                Resource::L1Gas,
                ResourceBounds { max_amount: u64::MAX, max_price_per_unit: u128::MAX },
            ),
            (Resource::L2Gas, ResourceBounds::default()),
        ]
        .into(),
    );
    assert_eq!(legacy_max_fee(&bounds), Fee(u128::MAX));
}

#[test]
fn declare_v0_wire_form_has_no_nonce() {
    let declare = starknet_api::transaction::Transaction::Declare(
        starknet_api::transaction::DeclareTransaction::V0(
            starknet_api::transaction::DeclareTransactionV0V1 {
                max_fee: Fee(0),
                signature: TransactionSignature(vec![]),
                nonce: Nonce(stark_felt!("0x0")),
                class_hash: ClassHash(stark_felt!("0x2760")),
                sender_address: ContractAddress(patricia_key!("0x1")),
            },
        ),
    );
    let adapted =
        adapt_transaction(declare, TransactionHash(stark_felt!("0x222f")), Schema::Current);
    let as_json = serde_json::to_value(&adapted).unwrap();
    assert!(as_json.get("nonce").is_none());
    assert_eq!(as_json["signature"], json!([]));
    assert_eq!(as_json["version"], json!("0x0"));
}

fn invoke_v1(hash: &str) -> (starknet_api::transaction::Transaction, TransactionHash) {
    (
        starknet_api::transaction::Transaction::Invoke(
            starknet_api::transaction::InvokeTransaction::V1(
                starknet_api::transaction::InvokeTransactionV1 {
                    max_fee: Fee(0x247aff6e224),
                    signature: TransactionSignature(vec![]),
                    nonce: Nonce(stark_felt!("0x1")),
                    sender_address: ContractAddress(patricia_key!("0xb1461")),
                    calldata: Calldata(Arc::new(vec![])),
                },
            ),
        ),
        TransactionHash(stark_felt!(hash)),
    )
}

fn receipt_for(hash: TransactionHash) -> reader::Receipt {
    reader::Receipt {
        transaction_hash: hash,
        actual_fee: Fee(0x247aff6e224),
        messages_sent: vec![],
        events: vec![],
        execution_resources: starknet_api::transaction::ExecutionResources {
            steps: 29,
            builtin_instance_counter: HashMap::new(),
            memory_holes: 0,
        },
        contract_address: None,
        revert_reason: None,
    }
}

#[test]
fn reverted_receipt_carries_the_stored_reason() {
    let (tx, hash) =
        invoke_v1("0x19abec18bbacec23c2eee160c70190a48e4b41dd5ff98ad8f247f9393559998");
    let mut receipt = receipt_for(hash);
    receipt.revert_reason = Some("Error in the called contract (0x00b1461d...)".to_owned());
    receipt.execution_resources.steps = 0;
    let block_hash =
        BlockHash(stark_felt!("0x76e0229fd0c36dda2ee7905f7e4c9b3ebb78d98c4bfab550bcb3a03bf859a6"));

    let adapted = adapt_receipt(
        &tx,
        receipt,
        Some((block_hash, BlockNumber(304740))),
        None,
        Schema::Current,
    );

    assert_eq!(adapted.execution_status, TransactionExecutionStatus::Reverted);
    let as_json = serde_json::to_value(&adapted).unwrap();
    assert_eq!(as_json["revert_reason"], json!("Error in the called contract (0x00b1461d...)"));
    assert_eq!(as_json["actual_fee"], json!({"amount": "0x247aff6e224", "unit": "WEI"}));
    assert_eq!(as_json["block_number"], json!(304740));
    assert_eq!(as_json["execution_resources"], json!({"steps": 0}));
}

#[test]
fn finality_is_decided_by_the_l1_head() {
    let (tx, hash) = invoke_v1("0xce54");
    let block = Some((BlockHash(stark_felt!("0x47c3")), BlockNumber(10)));

    let not_on_l1 = adapt_receipt(&tx, receipt_for(hash), block, None, Schema::Current);
    assert_eq!(not_on_l1.finality_status, TransactionFinalityStatus::AcceptedOnL2);

    let l1_head = reader::L1Head { block_number: BlockNumber(10), ..Default::default() };
    let on_l1 = adapt_receipt(&tx, receipt_for(hash), block, Some(&l1_head), Schema::Current);
    assert_eq!(on_l1.finality_status, TransactionFinalityStatus::AcceptedOnL1);

    let behind = reader::L1Head { block_number: BlockNumber(9), ..Default::default() };
    let l1_behind = adapt_receipt(&tx, receipt_for(hash), block, Some(&behind), Schema::Current);
    assert_eq!(l1_behind.finality_status, TransactionFinalityStatus::AcceptedOnL2);
}

#[test]
fn pending_receipt_has_no_block_fields() {
    let (tx, hash) = invoke_v1("0xce54");
    let adapted = adapt_receipt(&tx, receipt_for(hash), None, None, Schema::Current);
    assert_eq!(adapted.finality_status, TransactionFinalityStatus::AcceptedOnL2);
    let as_json = serde_json::to_value(&adapted).unwrap();
    assert!(as_json.get("block_hash").is_none());
    assert!(as_json.get("block_number").is_none());
}

#[test]
fn v3_receipt_fee_is_in_fri() {
    let tx = declare_v3();
    let receipt = receipt_for(declare_v3_hash());
    let adapted = adapt_receipt(
        &tx,
        receipt,
        Some((BlockHash(stark_felt!("0x50e8")), BlockNumber(319132))),
        None,
        Schema::Current,
    );
    let as_json = serde_json::to_value(&adapted).unwrap();
    assert_eq!(as_json["actual_fee"]["unit"], json!("FRI"));
}

#[test]
fn legacy_receipt_fee_is_a_bare_amount_and_resources_are_dense_hex() {
    let (tx, hash) = invoke_v1("0xce54");
    let mut receipt = receipt_for(hash);
    receipt.actual_fee = Fee(0);
    receipt.execution_resources.steps = 0x1f;
    let adapted = adapt_receipt(
        &tx,
        receipt,
        Some((BlockHash(stark_felt!("0x47c3")), BlockNumber(0))),
        None,
        Schema::Legacy,
    );
    let as_json = serde_json::to_value(&adapted).unwrap();
    assert_eq!(as_json["actual_fee"], json!("0x0"));
    assert_eq!(
        as_json["execution_resources"],
        json!({
            "steps": "0x1f",
            "memory_holes": "0x0",
            "range_check_builtin_applications": "0x0",
            "pedersen_builtin_applications": "0x0",
            "poseidon_builtin_applications": "0x0",
            "ec_op_builtin_applications": "0x0",
            "ecdsa_builtin_applications": "0x0",
            "bitwise_builtin_applications": "0x0",
            "keccak_builtin_applications": "0x0"
        })
    );
}

#[test]
fn sparse_resources_keep_only_nonzero_counters() {
    let resources = starknet_api::transaction::ExecutionResources {
        steps: 615,
        builtin_instance_counter: HashMap::from([
            (starknet_api::transaction::Builtin::RangeCheck, 19),
            (starknet_api::transaction::Builtin::Pedersen, 0),
        ]),
        memory_holes: 4,
    };
    let adapted = ExecutionResources::from(resources);
    assert_eq!(
        serde_json::to_value(&adapted).unwrap(),
        json!({
            "steps": 615,
            "range_check_builtin_applications": 19,
            "memory_holes": 4
        })
    );
}

#[test]
fn deploy_receipts_carry_the_contract_address() {
    let deploy = starknet_api::transaction::Transaction::Deploy(
        starknet_api::transaction::DeployTransaction {
            version: starknet_api::transaction::TransactionVersion::ZERO,
            class_hash: ClassHash(stark_felt!("0x46f8")),
            contract_address_salt: starknet_api::transaction::ContractAddressSalt(
                stark_felt!("0x74dc"),
            ),
            constructor_calldata: Calldata(Arc::new(vec![])),
        },
    );
    let hash = TransactionHash(stark_felt!("0xe0a2"));
    let mut receipt = receipt_for(hash);
    receipt.contract_address =
        Some(ContractAddress(patricia_key!("0x20cfa74ee3564b4cd5435cdace0f9c4d43b9")));
    let adapted = adapt_receipt(
        &deploy,
        receipt,
        Some((BlockHash(stark_felt!("0x47c3")), BlockNumber(0))),
        None,
        Schema::Current,
    );
    assert!(adapted.contract_address.is_some());

    // The same receipt on an invoke does not.
    let (invoke, hash) = invoke_v1("0xce54");
    let mut receipt = receipt_for(hash);
    receipt.contract_address = Some(ContractAddress(patricia_key!("0x20cf")));
    let adapted = adapt_receipt(
        &invoke,
        receipt,
        Some((BlockHash(stark_felt!("0x47c3")), BlockNumber(0))),
        None,
        Schema::Current,
    );
    assert!(adapted.contract_address.is_none());
}

#[test]
fn wire_transactions_round_trip_through_serde() {
    let adapted = adapt_transaction(declare_v3(), declare_v3_hash(), Schema::Current);
    let as_json = serde_json::to_value(&adapted).unwrap();
    let back: TransactionWithHash = serde_json::from_value(as_json).unwrap();
    assert_eq!(back, adapted);
}
