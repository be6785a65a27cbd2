//! JSON rendering of blocks for `tally print --json`.

use serde::Serialize;
use tally_ledger::Block;

/// Wire shape of one block in JSON output. Hashes and the seal are hex;
/// the payload is UTF-8 when it decodes cleanly and hex otherwise.
#[derive(Debug, Serialize)]
pub struct BlockView {
    pub height: u64,
    pub hash: String,
    pub prev_hash: String,
    pub payload: String,
    pub payload_encoding: &'static str,
    pub seal: String,
}

impl From<&Block> for BlockView {
    fn from(block: &Block) -> Self {
        let (payload, payload_encoding) = match std::str::from_utf8(&block.payload) {
            Ok(text) => (text.to_string(), "utf8"),
            Err(_) => (hex::encode(&block.payload), "hex"),
        };
        Self {
            height: block.height,
            hash: block.hash_hex(),
            prev_hash: block.prev_hash_hex(),
            payload,
            payload_encoding,
            seal: hex::encode(&block.seal),
        }
    }
}
