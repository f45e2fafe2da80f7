//! Shared in-memory connectors and store wrappers for cycle tests.

#![allow(dead_code)]

use std::collections::{BTreeSet, HashSet};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;

use membersync_connector::error::{ConnectorError, ConnectorResult};
use membersync_connector::ids::MemberId;
use membersync_connector::traits::{AccountDirectory, MembershipSource};
use membersync_connector::types::{DirectoryAccount, Member};
use membersync_db::{Account, MappingStore, MemoryMappingStore, StoreError, StoreResult};
use membersync_provisioning::{CycleConfig, CycleDriver};

// =============================================================================
// Membership source
// =============================================================================

pub struct FakeSource {
    members: Mutex<Vec<Member>>,
    auth_fails: AtomicBool,
    fetch_fails: AtomicBool,
    pub auth_calls: AtomicUsize,
}

impl FakeSource {
    pub fn with_ids(ids: &[&str]) -> Self {
        Self::with_members(ids.iter().map(|id| Member::new(*id, format!("member {id}"), None)))
    }

    pub fn with_members(members: impl IntoIterator<Item = Member>) -> Self {
        Self {
            members: Mutex::new(members.into_iter().collect()),
            auth_fails: AtomicBool::new(false),
            fetch_fails: AtomicBool::new(false),
            auth_calls: AtomicUsize::new(0),
        }
    }

    pub fn set_ids(&self, ids: &[&str]) {
        *self.members.lock().unwrap() = ids
            .iter()
            .map(|id| Member::new(*id, format!("member {id}"), None))
            .collect();
    }

    pub fn fail_auth(&self) {
        self.auth_fails.store(true, Ordering::SeqCst);
    }

    pub fn fail_fetch(&self) {
        self.fetch_fails.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl MembershipSource for FakeSource {
    fn display_name(&self) -> &str {
        "fake-roster"
    }

    async fn authenticate(&self) -> ConnectorResult<()> {
        self.auth_calls.fetch_add(1, Ordering::SeqCst);
        if self.auth_fails.load(Ordering::SeqCst) {
            return Err(ConnectorError::authentication("api hash rejected"));
        }
        Ok(())
    }

    async fn list_members(&self) -> ConnectorResult<Vec<Member>> {
        if self.fetch_fails.load(Ordering::SeqCst) {
            return Err(ConnectorError::fetch("gateway returned 502"));
        }
        Ok(self.members.lock().unwrap().clone())
    }
}

// =============================================================================
// Account directory
// =============================================================================

pub struct FakeDirectory {
    accounts: Mutex<Vec<DirectoryAccount>>,
    rejected: Mutex<HashSet<String>>,
    list_fails: AtomicBool,
    pub calls: Mutex<Vec<(String, bool)>>,
}

impl FakeDirectory {
    pub fn new(accounts: impl IntoIterator<Item = DirectoryAccount>) -> Self {
        Self {
            accounts: Mutex::new(accounts.into_iter().collect()),
            rejected: Mutex::new(HashSet::new()),
            list_fails: AtomicBool::new(false),
            calls: Mutex::new(Vec::new()),
        }
    }

    /// Reject every `set_enabled` for this directory id.
    pub fn reject(&self, directory_id: &str) {
        self.rejected.lock().unwrap().insert(directory_id.to_string());
    }

    pub fn accept(&self, directory_id: &str) {
        self.rejected.lock().unwrap().remove(directory_id);
    }

    pub fn fail_list(&self) {
        self.list_fails.store(true, Ordering::SeqCst);
    }

    pub fn remove(&self, name: &str) {
        self.accounts.lock().unwrap().retain(|a| a.name != name);
    }

    pub fn enabled(&self, name: &str) -> Option<bool> {
        self.accounts
            .lock()
            .unwrap()
            .iter()
            .find(|a| a.name == name)
            .map(|a| a.enabled)
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().unwrap().len()
    }
}

#[async_trait]
impl AccountDirectory for FakeDirectory {
    fn display_name(&self) -> &str {
        "fake-jellyfin"
    }

    async fn list_accounts(&self) -> ConnectorResult<Vec<DirectoryAccount>> {
        if self.list_fails.load(Ordering::SeqCst) {
            return Err(ConnectorError::fetch("connection refused"));
        }
        Ok(self.accounts.lock().unwrap().clone())
    }

    async fn set_enabled(&self, directory_id: &str, enabled: bool) -> ConnectorResult<()> {
        self.calls
            .lock()
            .unwrap()
            .push((directory_id.to_string(), enabled));

        if self.rejected.lock().unwrap().contains(directory_id) {
            return Err(ConnectorError::directory(Some(500), "policy update failed"));
        }

        let mut accounts = self.accounts.lock().unwrap();
        match accounts.iter_mut().find(|a| a.directory_id == directory_id) {
            Some(account) => {
                account.enabled = enabled;
                Ok(())
            }
            None => Err(ConnectorError::ObjectNotFound {
                identifier: directory_id.to_string(),
            }),
        }
    }
}

// =============================================================================
// Mapping store with injectable failures
// =============================================================================

pub struct FlakyStore {
    pub inner: MemoryMappingStore,
    fail_writes_for: Mutex<HashSet<String>>,
    fail_ping: AtomicBool,
    fail_load: AtomicBool,
}

impl FlakyStore {
    pub fn new(accounts: impl IntoIterator<Item = Account>) -> Self {
        Self {
            inner: MemoryMappingStore::with_accounts(accounts),
            fail_writes_for: Mutex::new(HashSet::new()),
            fail_ping: AtomicBool::new(false),
            fail_load: AtomicBool::new(false),
        }
    }

    pub fn fail_writes_for(&self, name: &str) {
        self.fail_writes_for.lock().unwrap().insert(name.to_string());
    }

    pub fn heal(&self) {
        self.fail_writes_for.lock().unwrap().clear();
        self.fail_ping.store(false, Ordering::SeqCst);
        self.fail_load.store(false, Ordering::SeqCst);
    }

    pub fn fail_ping(&self) {
        self.fail_ping.store(true, Ordering::SeqCst);
    }

    pub fn fail_load(&self) {
        self.fail_load.store(true, Ordering::SeqCst);
    }

    pub async fn get(&self, name: &str) -> Account {
        self.inner.get(name).await.unwrap()
    }
}

#[async_trait]
impl MappingStore for FlakyStore {
    async fn load(&self) -> StoreResult<Vec<Account>> {
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(StoreError::Invalid("database disk image is malformed".into()));
        }
        self.inner.load().await
    }

    async fn upsert_unmapped(
        &self,
        name: &str,
        directory_id: &str,
        enabled: bool,
    ) -> StoreResult<bool> {
        self.inner.upsert_unmapped(name, directory_id, enabled).await
    }

    async fn set_enabled(&self, name: &str, enabled: bool) -> StoreResult<()> {
        if self.fail_writes_for.lock().unwrap().contains(name) {
            return Err(StoreError::Invalid("disk I/O error".into()));
        }
        self.inner.set_enabled(name, enabled).await
    }

    async fn mark_indeterminate(&self, name: &str) -> StoreResult<()> {
        self.inner.mark_indeterminate(name).await
    }

    async fn set_mapped_ids(&self, name: &str, ids: &BTreeSet<MemberId>) -> StoreResult<()> {
        self.inner.set_mapped_ids(name, ids).await
    }

    async fn ping(&self) -> StoreResult<()> {
        if self.fail_ping.load(Ordering::SeqCst) {
            return Err(StoreError::Invalid("unable to open database file".into()));
        }
        Ok(())
    }
}

// =============================================================================
// Helpers
// =============================================================================

pub struct Harness {
    pub source: Arc<FakeSource>,
    pub directory: Arc<FakeDirectory>,
    pub store: Arc<FlakyStore>,
}

impl Harness {
    pub fn new(source: FakeSource, directory: FakeDirectory, store: FlakyStore) -> Self {
        Self {
            source: Arc::new(source),
            directory: Arc::new(directory),
            store: Arc::new(store),
        }
    }

    pub fn driver(&self) -> CycleDriver {
        self.driver_with(CycleConfig::default())
    }

    pub fn driver_with(&self, config: CycleConfig) -> CycleDriver {
        CycleDriver::new(
            self.source.clone(),
            self.directory.clone(),
            self.store.clone(),
            config,
        )
    }
}

pub fn mapped(name: &str, ids: &[&str], enabled: bool) -> Account {
    Account::unmapped(name, format!("jf-{name}"), enabled).with_mapped_ids(ids.iter().copied())
}

pub fn dir(name: &str, enabled: bool) -> DirectoryAccount {
    DirectoryAccount::new(name, format!("jf-{name}"), enabled)
}

pub const FIVE_MEMBERS: &[&str] = &["200", "300", "400", "500", "600"];
