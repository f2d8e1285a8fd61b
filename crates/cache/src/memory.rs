//! In-memory cache backend.
//!
//! Table layout mirrors the production store: a record per registration
//! set keyed by default public identity, an alias table from every
//! public identity to its set, and a mapping table from private
//! identities to the default identities of their sets.

use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use parking_lot::RwLock;

use cx_subscription::{ImplicitRegistrationSet, ImsSubscription};

use crate::backend::{CacheError, HssCacheBackend};

#[derive(Default)]
struct Tables {
    /// Registration sets keyed by default public identity.
    records: HashMap<String, ImplicitRegistrationSet>,
    /// Any public identity → default public identity of its set.
    impu_aliases: HashMap<String, String>,
    /// Private identity → default public identities of associated sets.
    impi_mapping: HashMap<String, BTreeSet<String>>,
}

/// Thread-safe in-memory backend. Fault flags let tests drive the
/// unavailable paths.
#[derive(Default)]
pub struct MemoryBackend {
    tables: RwLock<Tables>,
    fail_reads: AtomicBool,
    fail_writes: AtomicBool,
}

impl MemoryBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every read fail with `Unavailable` until cleared.
    pub fn set_fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    /// Make every write/delete fail with `Unavailable` until cleared.
    pub fn set_fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }

    fn check_reads(&self) -> Result<(), CacheError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("injected read failure".into()))
        } else {
            Ok(())
        }
    }

    fn check_writes(&self) -> Result<(), CacheError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(CacheError::Unavailable("injected write failure".into()))
        } else {
            Ok(())
        }
    }

    fn resolve_default(tables: &Tables, impu: &str) -> Option<String> {
        if tables.records.contains_key(impu) {
            return Some(impu.to_owned());
        }
        tables.impu_aliases.get(impu).cloned()
    }

    fn store_irs(tables: &mut Tables, irs: &ImplicitRegistrationSet) {
        let default = irs.default_impu().to_owned();
        let public_ids = irs.public_ids();

        // Drop aliases this set no longer claims.
        tables
            .impu_aliases
            .retain(|impu, dflt| dflt != &default || public_ids.contains(impu));
        for impu in public_ids {
            tables.impu_aliases.insert(impu, default.clone());
        }

        let mut stored = irs.clone();
        stored.clear_touched();
        tables.records.insert(default, stored);
    }

    fn erase_irs(tables: &mut Tables, irs: &ImplicitRegistrationSet) -> bool {
        let default = irs.default_impu();
        let existed = tables.records.remove(default).is_some();
        tables.impu_aliases.retain(|_, dflt| dflt != default);
        existed
    }
}

#[async_trait]
impl HssCacheBackend for MemoryBackend {
    async fn read_irs(&self, impu: &str) -> Result<ImplicitRegistrationSet, CacheError> {
        self.check_reads()?;
        let tables = self.tables.read();
        let default = Self::resolve_default(&tables, impu).ok_or(CacheError::NotFound)?;
        tables
            .records
            .get(&default)
            .cloned()
            .ok_or(CacheError::NotFound)
    }

    async fn read_irs_for_impus(
        &self,
        impus: &[String],
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError> {
        self.check_reads()?;
        let tables = self.tables.read();
        let mut seen = BTreeSet::new();
        let mut sets = Vec::new();
        for impu in impus {
            if let Some(default) = Self::resolve_default(&tables, impu) {
                if seen.insert(default.clone()) {
                    if let Some(irs) = tables.records.get(&default) {
                        sets.push(irs.clone());
                    }
                }
            }
        }
        Ok(sets)
    }

    async fn read_irs_for_impis(
        &self,
        impis: &[String],
    ) -> Result<Vec<ImplicitRegistrationSet>, CacheError> {
        self.check_reads()?;
        let tables = self.tables.read();
        let mut seen = BTreeSet::new();
        let mut sets = Vec::new();
        for impi in impis {
            let Some(defaults) = tables.impi_mapping.get(impi) else {
                continue;
            };
            for default in defaults {
                if seen.insert(default.clone()) {
                    if let Some(irs) = tables.records.get(default) {
                        sets.push(irs.clone());
                    }
                }
            }
        }
        Ok(sets)
    }

    async fn write_irs(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        Self::store_irs(&mut tables, irs);
        Ok(())
    }

    async fn write_impi_index(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        for impi in irs.associated_impis() {
            tables
                .impi_mapping
                .entry(impi.clone())
                .or_default()
                .insert(irs.default_impu().to_owned());
        }
        Ok(())
    }

    async fn remove_irs(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        if Self::erase_irs(&mut tables, irs) {
            Ok(())
        } else {
            Err(CacheError::NotFound)
        }
    }

    async fn remove_impi_index(&self, irs: &ImplicitRegistrationSet) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        let default = irs.default_impu();
        for impi in irs.associated_impis() {
            if let Some(defaults) = tables.impi_mapping.get_mut(impi) {
                defaults.remove(default);
                if defaults.is_empty() {
                    tables.impi_mapping.remove(impi);
                }
            }
        }
        Ok(())
    }

    async fn read_subscription(&self, impi: &str) -> Result<ImsSubscription, CacheError> {
        self.check_reads()?;
        let tables = self.tables.read();
        let defaults = tables
            .impi_mapping
            .get(impi)
            .ok_or(CacheError::NotFound)?;
        let irss: Vec<_> = defaults
            .iter()
            .filter_map(|default| tables.records.get(default).cloned())
            .collect();
        if irss.is_empty() {
            return Err(CacheError::NotFound);
        }
        Ok(ImsSubscription::new(irss))
    }

    async fn write_subscription(&self, sub: &ImsSubscription) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        for irs in sub.iter().filter(|irs| irs.is_touched()) {
            Self::store_irs(&mut tables, irs);
        }
        Ok(())
    }

    async fn write_subscription_index(&self, sub: &ImsSubscription) -> Result<(), CacheError> {
        self.check_writes()?;
        let mut tables = self.tables.write();
        for irs in sub.iter().filter(|irs| irs.is_touched()) {
            for impi in irs.associated_impis() {
                tables
                    .impi_mapping
                    .entry(impi.clone())
                    .or_default()
                    .insert(irs.default_impu().to_owned());
            }
        }
        Ok(())
    }
}
