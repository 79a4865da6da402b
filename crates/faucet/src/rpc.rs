//! JSON-RPC backed transfer executor

use crate::address::{has_hex_prefix, parse_address, to_checksum_address, ADDRESS_LENGTH};
use crate::error::{FaucetError, FaucetResult};
use crate::executor::TransferExecutor;
use async_trait::async_trait;
use k256::ecdsa::SigningKey;
use rlp::RlpStream;
use tracing::{debug, info};

/// RPC client for interacting with blockchain
pub struct BlockchainRpcClient {
    rpc_url: String,
    client: reqwest::Client,
}

impl BlockchainRpcClient {
    pub fn new(rpc_url: String) -> Self {
        Self {
            rpc_url,
            client: reqwest::Client::new(),
        }
    }

    async fn call(&self, method: &str, params: serde_json::Value) -> FaucetResult<serde_json::Value> {
        let payload = serde_json::json!({
            "jsonrpc": "2.0",
            "method": method,
            "params": params,
            "id": 1
        });

        let response = self
            .client
            .post(&self.rpc_url)
            .json(&payload)
            .send()
            .await
            .map_err(|e| FaucetError::Rpc(format!("request failed: {}", e)))?;

        let json: serde_json::Value = response
            .json()
            .await
            .map_err(|e| FaucetError::Rpc(format!("invalid response: {}", e)))?;

        if let Some(error) = json.get("error") {
            let message = error
                .get("message")
                .and_then(|m| m.as_str())
                .map(str::to_string)
                .unwrap_or_else(|| error.to_string());
            return Err(FaucetError::Rpc(message));
        }

        json.get("result")
            .cloned()
            .ok_or_else(|| FaucetError::Rpc(format!("{} returned no result", method)))
    }

    pub async fn get_chain_id(&self) -> FaucetResult<u64> {
        let result = self.call("eth_chainId", serde_json::json!([])).await?;
        parse_quantity(&result)
    }

    /// Next sequence number of `address`, counting pending transactions.
    pub async fn get_transaction_count(&self, address: &str) -> FaucetResult<u64> {
        let result = self
            .call("eth_getTransactionCount", serde_json::json!([address, "pending"]))
            .await?;
        parse_quantity(&result)
    }

    pub async fn send_raw_transaction(&self, tx_data: &str) -> FaucetResult<String> {
        let result = self
            .call("eth_sendRawTransaction", serde_json::json!([tx_data]))
            .await?;
        result
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| FaucetError::Rpc("transaction hash is not a string".to_string()))
    }
}

fn parse_quantity(value: &serde_json::Value) -> FaucetResult<u64> {
    let text = value
        .as_str()
        .ok_or_else(|| FaucetError::Rpc(format!("expected hex quantity, got {}", value)))?;
    u64::from_str_radix(text.trim_start_matches("0x"), 16)
        .map_err(|e| FaucetError::Rpc(format!("invalid quantity {}: {}", text, e)))
}

/// Parse a hex-encoded 32-byte secp256k1 secret key.
pub fn parse_private_key(hex_key: &str) -> FaucetResult<SigningKey> {
    if hex_key.is_empty() {
        return Err(FaucetError::InvalidPrivateKey("no private key provided".to_string()));
    }
    let digits = if has_hex_prefix(hex_key) { &hex_key[2..] } else { hex_key };
    let bytes = hex::decode(digits)
        .map_err(|e| FaucetError::InvalidPrivateKey(format!("invalid private key: {}", e)))?;
    if bytes.len() != 32 {
        return Err(FaucetError::InvalidPrivateKey(format!(
            "invalid private key length, expected 32: {}",
            bytes.len()
        )));
    }
    SigningKey::from_slice(&bytes)
        .map_err(|e| FaucetError::InvalidPrivateKey(format!("invalid signing key: {}", e)))
}

/// Account address of a signing key: last 20 bytes of keccak(pubkey).
pub fn derive_address(signing_key: &SigningKey) -> [u8; ADDRESS_LENGTH] {
    let public_key = signing_key.verifying_key().to_encoded_point(false);
    let hash = keccak_hash::keccak(&public_key.as_bytes()[1..]);
    let mut address = [0u8; ADDRESS_LENGTH];
    address.copy_from_slice(&hash.0[12..]);
    address
}

/// Big-endian bytes without leading zeros, as RLP expects for integers.
fn trimmed_be(bytes: &[u8]) -> Vec<u8> {
    let first = bytes.iter().position(|b| *b != 0).unwrap_or(bytes.len());
    bytes[first..].to_vec()
}

/// Legacy EIP-155 transfer fields.
#[derive(Debug, Clone)]
pub struct TransferTx {
    pub nonce: u64,
    pub gas_price: u128,
    pub gas_limit: u64,
    pub to: [u8; ADDRESS_LENGTH],
    pub value: u128,
    pub chain_id: u64,
}

impl TransferTx {
    fn append_body(&self, stream: &mut RlpStream) {
        stream.append(&self.nonce);
        stream.append(&trimmed_be(&self.gas_price.to_be_bytes()));
        stream.append(&self.gas_limit);
        stream.append(&self.to.to_vec());
        stream.append(&trimmed_be(&self.value.to_be_bytes()));
        stream.append(&Vec::<u8>::new()); // data
    }

    /// Hash signed under EIP-155.
    pub fn signing_hash(&self) -> [u8; 32] {
        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&self.chain_id);
        stream.append(&0u8);
        stream.append(&0u8);
        keccak_hash::keccak(&stream.out()).0
    }

    /// RLP encoding of the signed transaction.
    pub fn sign(&self, signing_key: &SigningKey) -> FaucetResult<Vec<u8>> {
        let (signature, recovery_id) = signing_key
            .sign_prehash_recoverable(&self.signing_hash())
            .map_err(|e| FaucetError::Internal(format!("signing failed: {}", e)))?;

        let v = u64::from(recovery_id.to_byte()) + self.chain_id * 2 + 35;
        let r: [u8; 32] = signature.r().to_bytes().into();
        let s: [u8; 32] = signature.s().to_bytes().into();

        let mut stream = RlpStream::new_list(9);
        self.append_body(&mut stream);
        stream.append(&v);
        stream.append(&trimmed_be(&r));
        stream.append(&trimmed_be(&s));
        Ok(stream.out().to_vec())
    }
}

/// Funds claims from one secp256k1 account over Ethereum-style JSON-RPC.
pub struct RpcTransferExecutor {
    rpc: BlockchainRpcClient,
    signing_key: SigningKey,
    sender: String,
    chain_id: u64,
    gas_price: u128,
    gas_limit: u64,
}

impl RpcTransferExecutor {
    /// Load the key and query the chain id once.
    pub async fn connect(
        rpc_url: &str,
        private_key: &str,
        gas_price: u128,
        gas_limit: u64,
    ) -> FaucetResult<Self> {
        let signing_key = parse_private_key(private_key)?;
        let sender = to_checksum_address(&derive_address(&signing_key));
        let rpc = BlockchainRpcClient::new(rpc_url.to_string());
        let chain_id = rpc.get_chain_id().await?;

        info!(sender = %sender, chain_id, "Connected to RPC provider {}", rpc_url);

        Ok(Self {
            rpc,
            signing_key,
            sender,
            chain_id,
            gas_price,
            gas_limit,
        })
    }
}

#[async_trait]
impl TransferExecutor for RpcTransferExecutor {
    fn sender(&self) -> String {
        self.sender.clone()
    }

    async fn transfer(&self, to: &str, amount: u128) -> FaucetResult<String> {
        let nonce = self.rpc.get_transaction_count(&self.sender).await?;
        let tx = TransferTx {
            nonce,
            gas_price: self.gas_price,
            gas_limit: self.gas_limit,
            to: parse_address(to)?,
            value: amount,
            chain_id: self.chain_id,
        };

        let raw = format!("0x{}", hex::encode(tx.sign(&self.signing_key)?));
        debug!(nonce, to, "Broadcasting transfer");

        self.rpc.send_raw_transaction(&raw).await
    }
}
