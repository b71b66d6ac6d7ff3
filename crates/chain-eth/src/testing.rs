//! Scripted in-memory EIP-1193 provider for tests.

use std::cell::{Cell, RefCell};
use std::collections::{BTreeMap, HashMap, VecDeque};

use async_trait::async_trait;
use serde_json::Value;
use wallet_api::ProviderError;

use crate::provider::Eip1193Provider;

/// Answers each method from a queue of scripted responses. The last response
/// queued for a method keeps being returned once the others are used up.
#[derive(Default)]
pub struct ScriptedProvider {
    responses: RefCell<HashMap<String, VecDeque<Result<Value, ProviderError>>>>,
    calls: RefCell<Vec<(String, Value)>>,
    flags: BTreeMap<String, bool>,
    listeners_removed: Cell<bool>,
}

impl ScriptedProvider {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_flag(mut self, name: &str, value: bool) -> Self {
        self.flags.insert(name.to_string(), value);
        self
    }

    /// Queues a response for `method`.
    pub fn on(&self, method: &str, response: Result<Value, ProviderError>) -> &Self {
        self.responses
            .borrow_mut()
            .entry(method.to_string())
            .or_default()
            .push_back(response);
        self
    }

    pub fn calls(&self) -> Vec<(String, Value)> {
        self.calls.borrow().clone()
    }

    pub fn calls_to(&self, method: &str) -> Vec<Value> {
        self.calls
            .borrow()
            .iter()
            .filter(|(m, _)| m == method)
            .map(|(_, p)| p.clone())
            .collect()
    }

    pub fn count(&self, method: &str) -> usize {
        self.calls.borrow().iter().filter(|(m, _)| m == method).count()
    }

    pub fn listeners_removed(&self) -> bool {
        self.listeners_removed.get()
    }
}

#[async_trait(?Send)]
impl Eip1193Provider for ScriptedProvider {
    async fn request(&self, method: &str, params: Value) -> Result<Value, ProviderError> {
        self.calls.borrow_mut().push((method.to_string(), params));
        let mut responses = self.responses.borrow_mut();
        match responses.get_mut(method) {
            Some(queue) if queue.len() > 1 => queue
                .pop_front()
                .unwrap_or_else(|| Err(ProviderError::message("empty script"))),
            Some(queue) => queue
                .front()
                .cloned()
                .unwrap_or_else(|| Err(ProviderError::message("empty script"))),
            None => Err(ProviderError::new(4200, format!("Unsupported method: {method}"))),
        }
    }

    fn flags(&self) -> BTreeMap<String, bool> {
        self.flags.clone()
    }

    fn remove_all_listeners(&self) {
        self.listeners_removed.set(true);
    }
}
