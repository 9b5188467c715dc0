use std::sync::{Arc, Mutex};

use pretty_assertions::assert_eq;
use serde_json::json;
use starknet_api::block::{BlockHash, BlockNumber, BlockTimestamp, GasPrice};
use starknet_api::core::GlobalRoot;
use starknet_api::hash::StarkFelt;
use starknet_api::stark_felt;

use super::*;
use crate::block::{adapt_header, GeneralBlockHeader};
use crate::reader::Header;

/// A connection that records everything written to it. Equality is pointer
/// identity, like a real socket.
struct FakeConn {
    messages: Mutex<Vec<String>>,
    closed: Mutex<bool>,
}

impl FakeConn {
    fn new() -> Arc<Self> {
        Arc::new(Self { messages: Mutex::new(vec![]), closed: Mutex::new(false) })
    }

    fn close(&self) {
        *self.closed.lock().unwrap() = true;
    }

    fn messages(&self) -> Vec<String> {
        self.messages.lock().unwrap().clone()
    }
}

impl RpcConn for FakeConn {
    fn write(&self, message: &str) -> Result<(), std::io::Error> {
        if *self.closed.lock().unwrap() {
            return Err(std::io::Error::from(std::io::ErrorKind::BrokenPipe));
        }
        self.messages.lock().unwrap().push(message.to_owned());
        Ok(())
    }

    fn equals(&self, other: &dyn RpcConn) -> bool {
        std::ptr::eq(
            self as *const _ as *const (),
            other as *const dyn RpcConn as *const (),
        )
    }
}

fn wire_header() -> crate::block::BlockHeader {
    let header = Header {
        hash: Some(BlockHash(stark_felt!(
            "0x4e1f77f39545afe866ac151ac908bd1a347a2a8a7d58bef1276db4f06fdf2f6"
        ))),
        parent_hash: BlockHash(stark_felt!(
            "0x2a70fb03fe363a2d6be843343a1d81ce6abeda1e9bd5cc6ad8fa9f45e30fdeb"
        )),
        number: BlockNumber(2),
        global_state_root: Some(GlobalRoot(stark_felt!(
            "0x3ceee867d50b5926bb88c0ec7e0b9c20ae6b537e74aac44b8fcf6bb6da138d9"
        ))),
        sequencer_address: None,
        timestamp: BlockTimestamp(1637084470),
        protocol_version: String::new(),
        eth_l1_gas_price: GasPrice(0),
        strk_l1_gas_price: GasPrice(0),
    };
    match adapt_header(&header) {
        GeneralBlockHeader::BlockHeader(header) => header,
        GeneralBlockHeader::PendingBlockHeader(_) => unreachable!("the header has a hash"),
    }
}

#[test]
fn notifications_carry_the_header_and_subscription_id() {
    let registry = SubscriptionRegistry::new();
    registry.set_id_gen(Box::new(|| 7));
    let conn = FakeConn::new();
    let id = registry.subscribe(conn.clone());
    assert_eq!(id, 7);

    registry.notify_new_head(&wire_header());

    let messages = conn.messages();
    assert_eq!(messages.len(), 1);
    let frame: serde_json::Value = serde_json::from_str(&messages[0]).unwrap();
    assert_eq!(frame["jsonrpc"], json!("2.0"));
    assert_eq!(frame["method"], json!("juno_subscribeNewHeads"));
    assert_eq!(frame["params"]["subscription"], json!(7));
    assert_eq!(
        frame["params"]["result"],
        json!({
            "block_hash": "0x4e1f77f39545afe866ac151ac908bd1a347a2a8a7d58bef1276db4f06fdf2f6",
            "parent_hash": "0x2a70fb03fe363a2d6be843343a1d81ce6abeda1e9bd5cc6ad8fa9f45e30fdeb",
            "block_number": 2,
            "new_root": "0x3ceee867d50b5926bb88c0ec7e0b9c20ae6b537e74aac44b8fcf6bb6da138d9",
            "timestamp": 1637084470,
            "sequencer_address": "0x0",
            "l1_gas_price": {"price_in_fri": "0x0", "price_in_wei": "0x0"},
            "starknet_version": ""
        })
    );
}

#[test]
fn every_subscriber_is_notified_under_its_own_id() {
    let registry = SubscriptionRegistry::new();
    let first_conn = FakeConn::new();
    let second_conn = FakeConn::new();
    registry.set_id_gen(Box::new(|| 1));
    let first = registry.subscribe(first_conn.clone());
    registry.set_id_gen(Box::new(|| 2));
    let second = registry.subscribe(second_conn.clone());

    registry.notify_new_head(&wire_header());

    let first_frame: serde_json::Value =
        serde_json::from_str(&first_conn.messages()[0]).unwrap();
    let second_frame: serde_json::Value =
        serde_json::from_str(&second_conn.messages()[0]).unwrap();
    assert_eq!(first_frame["params"]["subscription"], json!(first));
    assert_eq!(second_frame["params"]["subscription"], json!(second));
    assert_eq!(first_frame["params"]["result"], second_frame["params"]["result"]);
}

#[test]
fn unsubscribe_requires_the_owning_connection() {
    let registry = SubscriptionRegistry::new();
    let owner = FakeConn::new();
    let stranger = FakeConn::new();
    let id = registry.subscribe(owner.clone());

    // Wrong id, right connection.
    assert!(!registry.unsubscribe(owner.as_ref(), id + 1));
    // Right id, wrong connection; the subscription must survive.
    assert!(!registry.unsubscribe(stranger.as_ref(), id));
    registry.notify_new_head(&wire_header());
    assert_eq!(owner.messages().len(), 1);

    // Right id, right connection.
    assert!(registry.unsubscribe(owner.as_ref(), id));
    registry.notify_new_head(&wire_header());
    assert_eq!(owner.messages().len(), 1);
}

#[test]
fn default_ids_are_monotonic() {
    let registry = SubscriptionRegistry::new();
    let conn = FakeConn::new();
    let first = registry.subscribe(conn.clone());
    let second = registry.subscribe(conn.clone());
    assert!(second > first);
}

#[test]
fn failed_writes_drop_the_subscription() {
    let registry = SubscriptionRegistry::new();
    let conn = FakeConn::new();
    registry.subscribe(conn.clone());
    conn.close();
    registry.notify_new_head(&wire_header());
    assert_eq!(registry.len(), 0);
}

#[test]
fn dropping_a_connection_removes_all_of_its_subscriptions() {
    let registry = SubscriptionRegistry::new();
    let closing = FakeConn::new();
    let surviving = FakeConn::new();
    registry.subscribe(closing.clone());
    registry.subscribe(closing.clone());
    registry.subscribe(surviving.clone());

    registry.drop_conn(closing.as_ref());
    assert_eq!(registry.len(), 1);
    registry.notify_new_head(&wire_header());
    assert_eq!(surviving.messages().len(), 1);
    assert!(closing.messages().is_empty());
}
