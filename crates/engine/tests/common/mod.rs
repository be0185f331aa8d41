#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use std::collections::{HashMap, HashSet};
use std::sync::Mutex;
use trustroute_core::{canonical_string, checksummed, Address, RawVerdict, TxHash};
use trustroute_engine::{
    BlacklistClassifier, Collaborators, LedgerClient, MemoryStore, MutationSink, Reconciler,
    ReconcilerConfig,
};

pub const ROUTER: u8 = 0xee;
pub const DEFAULT_ORIGIN: u8 = 0xd0;

pub fn addr(n: u8) -> Address {
    Address::repeat_byte(n)
}

/// Ledger fake. Addresses are handed out in mixed textual forms to exercise
/// canonicalization.
#[derive(Default)]
pub struct FakeLedger {
    pub base_groups: Vec<String>,
    pub trustees: HashMap<Address, Vec<String>>,
    pub registered: Vec<String>,
    pub humans: HashSet<Address>,
    pub human_calls: Mutex<HashMap<Address, usize>>,
}

impl FakeLedger {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn router_trusts(mut self, addresses: &[u8]) -> Self {
        self.trustees
            .insert(addr(ROUTER), addresses.iter().map(|n| lower(*n)).collect());
        self
    }

    /// Register human avatars (registration log + humanity flag).
    pub fn registered(mut self, addresses: &[u8]) -> Self {
        for n in addresses {
            self.registered.push(checksummed(&addr(*n)));
            self.humans.insert(addr(*n));
        }
        self
    }

    pub fn base_group(mut self, group: u8, members: &[u8]) -> Self {
        self.base_groups.push(lower(group));
        self.trustees
            .insert(addr(group), members.iter().map(|n| upper(*n)).collect());
        self
    }

    pub fn human(mut self, addresses: &[u8]) -> Self {
        self.humans.extend(addresses.iter().map(|n| addr(*n)));
        self
    }

    pub fn not_human(mut self, addresses: &[u8]) -> Self {
        for n in addresses {
            self.humans.remove(&addr(*n));
        }
        self
    }

    pub fn raw_registered(mut self, token: &str) -> Self {
        self.registered.push(token.to_string());
        self
    }

    pub fn human_calls(&self, n: u8) -> usize {
        self.human_calls
            .lock()
            .unwrap()
            .get(&addr(n))
            .copied()
            .unwrap_or(0)
    }
}

pub fn lower(n: u8) -> String {
    canonical_string(&addr(n))
}

pub fn upper(n: u8) -> String {
    format!("0x{}", canonical_string(&addr(n))[2..].to_uppercase())
}

#[async_trait]
impl LedgerClient for FakeLedger {
    async fn list_base_groups(&self, _page_size: usize) -> Result<Vec<String>> {
        Ok(self.base_groups.clone())
    }

    async fn list_trustees(&self, truster: &Address) -> Result<Vec<String>> {
        Ok(self.trustees.get(truster).cloned().unwrap_or_default())
    }

    async fn list_registered_candidates(&self, _page_size: usize) -> Result<Vec<String>> {
        Ok(self.registered.clone())
    }

    async fn is_human_avatar(&self, address: &Address) -> Result<bool> {
        *self
            .human_calls
            .lock()
            .unwrap()
            .entry(*address)
            .or_default() += 1;
        Ok(self.humans.contains(address))
    }
}

/// Screening fake returning verdicts only for addresses it knows about.
#[derive(Default)]
pub struct FakeScreening {
    pub flagged: HashMap<Address, (bool, Option<String>)>,
    pub allowed_verdicts: HashSet<Address>,
    pub requests: Mutex<Vec<Vec<Address>>>,
}

impl FakeScreening {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn category(mut self, n: u8, category: &str) -> Self {
        self.flagged
            .insert(addr(n), (false, Some(category.to_string())));
        self
    }

    pub fn bot(mut self, n: u8) -> Self {
        self.flagged.insert(addr(n), (true, None));
        self
    }

    pub fn human_verdict(mut self, n: u8) -> Self {
        self.allowed_verdicts.insert(addr(n));
        self
    }

    pub fn requested(&self) -> Vec<Address> {
        self.requests.lock().unwrap().concat()
    }
}

#[async_trait]
impl BlacklistClassifier for FakeScreening {
    async fn classify(&self, addresses: &[Address]) -> Result<Vec<RawVerdict>> {
        self.requests.lock().unwrap().push(addresses.to_vec());

        let mut verdicts = Vec::new();
        for address in addresses {
            if let Some((is_bot, category)) = self.flagged.get(address) {
                verdicts.push(RawVerdict {
                    address: checksummed(address),
                    is_bot: *is_bot,
                    category: category.clone(),
                });
            } else if self.allowed_verdicts.contains(address) {
                verdicts.push(RawVerdict {
                    address: canonical_string(address),
                    is_bot: false,
                    category: Some("human".to_string()),
                });
            }
        }
        Ok(verdicts)
    }
}

/// Mutation sink recording every call; optionally fails a given call.
#[derive(Default)]
pub struct FakeSink {
    pub calls: Mutex<Vec<(Address, Vec<Address>)>>,
    pub fail_on_call: Option<usize>,
}

impl FakeSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing_on(call: usize) -> Self {
        Self {
            fail_on_call: Some(call),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<(Address, Vec<Address>)> {
        self.calls.lock().unwrap().clone()
    }
}

#[async_trait]
impl MutationSink for FakeSink {
    async fn enable_trust(&self, origin: &Address, addresses: &[Address]) -> Result<TxHash> {
        let mut calls = self.calls.lock().unwrap();
        let index = calls.len();
        calls.push((*origin, addresses.to_vec()));
        if self.fail_on_call == Some(index) {
            return Err(anyhow!("execution reverted"));
        }
        Ok(TxHash::repeat_byte(index as u8 + 1))
    }
}

pub fn config(batch_size: usize) -> ReconcilerConfig {
    let mut config = ReconcilerConfig::new(addr(ROUTER), addr(DEFAULT_ORIGIN));
    config.enable_batch_size = std::num::NonZeroUsize::new(batch_size).unwrap();
    config
}

pub fn reconciler(batch_size: usize, simulate: bool) -> Reconciler {
    let mut config = config(batch_size);
    config.simulate = simulate;
    Reconciler::new(config)
}

pub fn collaborators<'a>(
    ledger: &'a FakeLedger,
    screening: Option<&'a FakeScreening>,
    sink: Option<&'a FakeSink>,
    store: &'a MemoryStore,
) -> Collaborators<'a> {
    Collaborators {
        ledger,
        blacklist: screening.map(|s| s as &dyn BlacklistClassifier),
        sink: sink.map(|s| s as &dyn MutationSink),
        store,
    }
}
