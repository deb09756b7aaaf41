//! Natural-to-surrogate key registries
//!
//! Each dimension owns one [`KeyRegistry`]. While its table loads the
//! registry is in insertion mode and hands out keys 1, 2, 3… in first-seen
//! order. Once the table is loaded the registry is frozen and becomes a
//! read-only lookup for the tables that reference it.

use crate::error::RegistryError;
use rh_core::{compute_checksum_lines, TableName, WarehouseContract};
use std::collections::{BTreeMap, HashMap};

/// Surrogate key assigned by the loader
pub type SurrogateKey = i64;

/// Result of [`KeyRegistry::resolve`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    pub key: SurrogateKey,
    /// `true` when the natural key was seen for the first time
    pub inserted: bool,
}

/// Natural key encodings
pub struct NaturalKey;

impl NaturalKey {
    const SEPARATOR: char = '\u{1f}';
    const ABSENT: char = '\u{0}';
    const PRESENT: char = '\u{2}';

    /// Encode a multi-column natural key. Absent parts and empty strings
    /// encode differently.
    pub fn composite(parts: &[Option<&str>]) -> String {
        let mut key = String::new();
        for (i, part) in parts.iter().enumerate() {
            if i > 0 {
                key.push(Self::SEPARATOR);
            }
            match part {
                Some(s) => {
                    key.push(Self::PRESENT);
                    key.push_str(s);
                }
                None => key.push(Self::ABSENT),
            }
        }
        key
    }
}

/// Key registry of one dimension table
#[derive(Debug)]
pub struct KeyRegistry {
    table: TableName,
    keys: HashMap<String, SurrogateKey>,
    next: SurrogateKey,
    frozen: bool,
}

impl KeyRegistry {
    pub fn new(table: TableName) -> Self {
        Self {
            table,
            keys: HashMap::new(),
            next: 1,
            frozen: false,
        }
    }

    pub fn table(&self) -> &TableName {
        &self.table
    }

    /// Return the key of `natural`, assigning the next one if it is new
    pub fn resolve(&mut self, natural: &str) -> Result<Resolution, RegistryError> {
        if self.frozen {
            return Err(RegistryError::Frozen {
                table: self.table.to_string(),
                natural: natural.to_string(),
            });
        }
        if let Some(&key) = self.keys.get(natural) {
            return Ok(Resolution {
                key,
                inserted: false,
            });
        }
        let key = self.next;
        self.next += 1;
        self.keys.insert(natural.to_string(), key);
        Ok(Resolution {
            key,
            inserted: true,
        })
    }

    /// Key of `natural`. Only valid once the registry is frozen.
    pub fn lookup(&self, natural: &str) -> Result<Option<SurrogateKey>, RegistryError> {
        if !self.frozen {
            return Err(RegistryError::NotFrozen {
                table: self.table.to_string(),
            });
        }
        Ok(self.keys.get(natural).copied())
    }

    /// End insertion mode
    pub fn freeze(&mut self) {
        self.frozen = true;
    }

    pub fn is_frozen(&self) -> bool {
        self.frozen
    }

    pub fn len(&self) -> usize {
        self.keys.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    /// All mappings in key order
    pub fn entries(&self) -> Vec<(&str, SurrogateKey)> {
        let mut entries: Vec<_> = self.keys.iter().map(|(k, &v)| (k.as_str(), v)).collect();
        entries.sort_unstable_by_key(|(_, key)| *key);
        entries
    }

    /// SHA256 of the mappings in key order, one `key<TAB>natural` line each.
    /// Two runs over the same inputs produce the same digest.
    pub fn digest(&self) -> String {
        compute_checksum_lines(
            self.entries()
                .into_iter()
                .map(|(natural, key)| format!("{}\t{}", key, natural)),
        )
    }
}

/// One registry per keyed table
#[derive(Debug, Default)]
pub struct KeyRegistrySet {
    registries: BTreeMap<TableName, KeyRegistry>,
}

impl KeyRegistrySet {
    pub fn new() -> Self {
        Self::default()
    }

    /// A registry for every contract table with a surrogate key
    pub fn for_contract(contract: &WarehouseContract) -> Self {
        let mut set = Self::new();
        for table in contract.tables() {
            if table.surrogate_key.is_some() {
                set.register(table.name.clone());
            }
        }
        set
    }

    pub fn register(&mut self, table: TableName) {
        self.registries
            .entry(table.clone())
            .or_insert_with(|| KeyRegistry::new(table));
    }

    pub fn get(&self, table: &str) -> Result<&KeyRegistry, RegistryError> {
        self.registries
            .get(table)
            .ok_or_else(|| RegistryError::Unknown {
                table: table.to_string(),
            })
    }

    pub fn get_mut(&mut self, table: &str) -> Result<&mut KeyRegistry, RegistryError> {
        self.registries
            .get_mut(table)
            .ok_or_else(|| RegistryError::Unknown {
                table: table.to_string(),
            })
    }

    pub fn resolve(&mut self, table: &str, natural: &str) -> Result<Resolution, RegistryError> {
        self.get_mut(table)?.resolve(natural)
    }

    pub fn lookup(&self, table: &str, natural: &str) -> Result<Option<SurrogateKey>, RegistryError> {
        self.get(table)?.lookup(natural)
    }

    pub fn freeze(&mut self, table: &str) -> Result<(), RegistryError> {
        self.get_mut(table)?.freeze();
        Ok(())
    }

    pub fn tables(&self) -> impl Iterator<Item = &TableName> {
        self.registries.keys()
    }
}

#[cfg(test)]
#[path = "registry_test.rs"]
mod tests;
