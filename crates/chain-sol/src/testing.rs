//! In-memory Solana wallet, page globals and RPC endpoint for tests.

use std::cell::RefCell;
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::rc::Rc;

use async_trait::async_trait;
use wallet_api::ProviderError;

use crate::error::SolError;
use crate::provider::{SolanaGlobals, SolanaProvider};
use crate::rpc::SolanaRpc;
use crate::transaction::{serialize_unsigned, SolTransaction, SIGNATURE_LEN};

/// Responses for one operation; the last one is repeated once the rest are
/// used up.
struct Script<T>(RefCell<VecDeque<Result<T, ProviderError>>>);

impl<T: Clone> Script<T> {
    fn new() -> Self {
        Self(RefCell::new(VecDeque::new()))
    }

    fn push(&self, response: Result<T, ProviderError>) {
        self.0.borrow_mut().push_back(response);
    }

    fn next(&self, op: &str) -> Result<T, ProviderError> {
        let mut queue = self.0.borrow_mut();
        let response = if queue.len() > 1 {
            queue.pop_front()
        } else {
            queue.front().cloned()
        };
        response.unwrap_or_else(|| Err(ProviderError::message(format!("{op} not scripted"))))
    }

    fn is_scripted(&self) -> bool {
        !self.0.borrow().is_empty()
    }
}

/// Scripted Solana wallet. Unscripted transaction signing fills the fee
/// payer slot with `0x11` bytes.
pub struct ScriptedSolanaProvider {
    flags: BTreeMap<String, bool>,
    public_key: RefCell<Option<String>>,
    connect: Script<Option<String>>,
    sign_message: Script<Vec<u8>>,
    sign_transaction: Script<Vec<u8>>,
    sign_and_send: Script<String>,
    disconnect: Script<()>,
    calls: RefCell<Vec<String>>,
}

impl Default for ScriptedSolanaProvider {
    fn default() -> Self {
        Self {
            flags: BTreeMap::new(),
            public_key: RefCell::new(None),
            connect: Script::new(),
            sign_message: Script::new(),
            sign_transaction: Script::new(),
            sign_and_send: Script::new(),
            disconnect: Script::new(),
            calls: RefCell::new(Vec::new()),
        }
    }
}

impl ScriptedSolanaProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    pub fn with_public_key(self, key: &str) -> Self {
        *self.public_key.borrow_mut() = Some(key.to_string());
        self
    }

    pub fn on_connect(&self, response: Result<Option<String>, ProviderError>) -> &Self {
        self.connect.push(response);
        self
    }

    pub fn on_sign_message(&self, response: Result<Vec<u8>, ProviderError>) -> &Self {
        self.sign_message.push(response);
        self
    }

    pub fn on_sign_transaction(&self, response: Result<Vec<u8>, ProviderError>) -> &Self {
        self.sign_transaction.push(response);
        self
    }

    /// Enables `signAndSendTransaction` and queues its response.
    pub fn on_sign_and_send(&self, response: Result<String, ProviderError>) -> &Self {
        self.sign_and_send.push(response);
        self
    }

    pub fn on_disconnect(&self, response: Result<(), ProviderError>) -> &Self {
        self.disconnect.push(response);
        self
    }

    pub fn calls(&self) -> Vec<String> {
        self.calls.borrow().clone()
    }

    pub fn count(&self, op: &str) -> usize {
        self.calls.borrow().iter().filter(|c| *c == op).count()
    }

    fn record(&self, op: &str) {
        self.calls.borrow_mut().push(op.to_string());
    }
}

#[async_trait(?Send)]
impl SolanaProvider for ScriptedSolanaProvider {
    fn flags(&self) -> BTreeMap<String, bool> {
        self.flags.clone()
    }

    async fn connect(&self, only_if_trusted: bool) -> Result<Option<String>, ProviderError> {
        self.record(if only_if_trusted { "connect_trusted" } else { "connect" });
        self.connect.next("connect")
    }

    fn public_key(&self) -> Option<String> {
        self.public_key.borrow().clone()
    }

    async fn disconnect(&self) -> Result<(), ProviderError> {
        self.record("disconnect");
        if !self.disconnect.is_scripted() {
            return Ok(());
        }
        self.disconnect.next("disconnect")
    }

    async fn sign_message(&self, _message: &[u8]) -> Result<Vec<u8>, ProviderError> {
        self.record("sign_message");
        self.sign_message.next("signMessage")
    }

    async fn sign_transaction(&self, tx: &SolTransaction) -> Result<Vec<u8>, ProviderError> {
        self.record("sign_transaction");
        if self.sign_transaction.is_scripted() {
            return self.sign_transaction.next("signTransaction");
        }
        let mut wire = serialize_unsigned(tx);
        wire[1..1 + SIGNATURE_LEN].fill(0x11);
        Ok(wire)
    }

    fn supports_sign_and_send(&self) -> bool {
        self.sign_and_send.is_scripted()
    }

    async fn sign_and_send_transaction(&self, _tx: &SolTransaction) -> Result<String, ProviderError> {
        self.record("sign_and_send");
        self.sign_and_send.next("signAndSendTransaction")
    }
}

/// Page globals keyed by property path.
#[derive(Default)]
pub struct MemoryGlobals {
    entries: HashMap<Vec<String>, Rc<dyn SolanaProvider>>,
}

impl MemoryGlobals {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(self, path: &[&str], provider: ScriptedSolanaProvider) -> Self {
        self.with_rc(path, Rc::new(provider))
    }

    pub fn with_rc(mut self, path: &[&str], provider: Rc<dyn SolanaProvider>) -> Self {
        let key = path.iter().map(|s| s.to_string()).collect();
        self.entries.insert(key, provider);
        self
    }
}

impl SolanaGlobals for MemoryGlobals {
    fn lookup(&self, path: &[&str]) -> Option<Rc<dyn SolanaProvider>> {
        let key: Vec<String> = path.iter().map(|s| s.to_string()).collect();
        self.entries.get(&key).cloned()
    }
}

/// Records broadcast transactions and answers with scripted results.
#[derive(Default)]
pub struct RecordingRpc {
    responses: RefCell<VecDeque<Result<String, String>>>,
    sent: RefCell<Vec<Vec<u8>>>,
}

impl RecordingRpc {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn respond(&self, response: Result<&str, &str>) -> &Self {
        self.responses
            .borrow_mut()
            .push_back(response.map(str::to_owned).map_err(str::to_owned));
        self
    }

    pub fn sent(&self) -> Vec<Vec<u8>> {
        self.sent.borrow().clone()
    }
}

#[async_trait(?Send)]
impl SolanaRpc for RecordingRpc {
    async fn send_raw_transaction(&self, wire: &[u8]) -> Result<String, SolError> {
        self.sent.borrow_mut().push(wire.to_vec());
        self.responses
            .borrow_mut()
            .pop_front()
            .unwrap_or_else(|| Err("no response scripted".into()))
            .map_err(SolError::Rpc)
    }
}
