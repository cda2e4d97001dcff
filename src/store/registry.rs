use super::types::*;
use crate::analysis::extract;
use std::collections::HashMap;
use std::sync::OnceLock;
use thiserror::Error;
use tracing::debug;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error("Duplicate full key '{0}' in record set")]
    DuplicateKey(String),
}

/// Read-only lookup table over one closed-world snapshot of key records.
///
/// Records keep their input order; `KeyId`s index into that order. Dependency
/// lists are extracted from the formula on first access and cached per key.
#[derive(Debug, Default)]
pub struct Registry {
    records: Vec<KeyRecord>,
    dependencies: Vec<OnceLock<DependencyList>>,
    by_full_key: HashMap<String, KeyId>,
}

impl Registry {
    /// Builds the registry from a fetched record set.
    ///
    /// Fails only when two records share a `full_key`.
    pub fn build(records: Vec<KeyRecord>) -> Result<Self, RegistryError> {
        let mut by_full_key = HashMap::with_capacity(records.len());

        for (i, record) in records.iter().enumerate() {
            if by_full_key.insert(record.full_key.clone(), KeyId::new(i)).is_some() {
                return Err(RegistryError::DuplicateKey(record.full_key.clone()));
            }
        }

        let dependencies = (0..records.len()).map(|_| OnceLock::new()).collect();
        debug!(keys = records.len(), "Key registry built");

        Ok(Self { records, dependencies, by_full_key })
    }

    pub fn count(&self) -> usize { self.records.len() }

    pub fn is_empty(&self) -> bool { self.records.is_empty() }

    /// Returns `None` for a key outside the snapshot.
    pub fn lookup(&self, full_key: &str) -> Option<KeyId> {
        self.by_full_key.get(full_key).copied()
    }

    pub fn contains(&self, full_key: &str) -> bool {
        self.by_full_key.contains_key(full_key)
    }

    #[inline(always)]
    pub fn record(&self, id: KeyId) -> &KeyRecord {
        &self.records[id.index()]
    }

    pub fn get(&self, full_key: &str) -> Option<&KeyRecord> {
        self.lookup(full_key).map(|id| self.record(id))
    }

    pub fn declared_level(&self, full_key: &str) -> Option<u32> {
        self.get(full_key).map(|r| r.calculation_level)
    }

    pub fn is_current(&self, full_key: &str) -> Option<bool> {
        self.get(full_key).map(|r| r.is_current)
    }

    /// References extracted from the key's formula, in formula order.
    pub fn dependencies(&self, id: KeyId) -> &[DependencyRef] {
        self.dependencies[id.index()].get_or_init(|| {
            let record = &self.records[id.index()];
            extract::extract(record.formula.as_deref(), &record.fund_id)
        })
    }

    pub fn ids(&self) -> impl Iterator<Item = KeyId> + '_ {
        (0..self.records.len()).map(KeyId::new)
    }

    pub fn records(&self) -> &[KeyRecord] { &self.records }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(full_key: &str, level: u32, formula: Option<&str>) -> KeyRecord {
        let parts: Vec<&str> = full_key.split('!').collect();
        KeyRecord {
            fund_id: parts[0].into(),
            datagroup_id: parts[1].into(),
            key: parts[2].into(),
            full_key: full_key.into(),
            calculation_level: level,
            is_current: parts[3] == "current",
            formula: formula.map(Into::into),
        }
    }

    #[test]
    fn test_lookup_known_and_unknown_keys() {
        let reg = Registry::build(vec![
            record("F1!DG1!K1!current", 0, None),
            record("F1!DG1!K2!pf", 1, Some(r#""DG1"!"K1"!"current""#)),
        ]).unwrap();

        assert_eq!(reg.lookup("F1!DG1!K2!pf"), Some(KeyId(1)));
        assert_eq!(reg.lookup("F1!DG1!K9!current"), None);
        assert_eq!(reg.declared_level("F1!DG1!K2!pf"), Some(1));
        assert_eq!(reg.is_current("F1!DG1!K2!pf"), Some(false));
        assert!(reg.get("nope").is_none());
    }

    #[test]
    fn test_dependencies_are_qualified_with_owning_fund() {
        let reg = Registry::build(vec![
            record("F7!DG1!K2!current", 1, Some(r#""DG1"!"K1"!"pf" + "DG2"!"K3"!"current""#)),
        ]).unwrap();

        let deps = reg.dependencies(KeyId(0));
        assert_eq!(deps.len(), 2);
        assert_eq!(deps[0].target, "F7!DG1!K1!pf");
        assert_eq!(deps[0].expected, Context::PointInTime);
        assert_eq!(deps[1].target, "F7!DG2!K3!current");
        // Cached: a second call hands back the same slice.
        assert!(std::ptr::eq(deps, reg.dependencies(KeyId(0))));
    }

    #[test]
    fn test_raw_key_has_no_dependencies() {
        let reg = Registry::build(vec![record("F1!DG1!K1!current", 0, None)]).unwrap();
        assert!(reg.dependencies(KeyId(0)).is_empty());
    }

    #[test]
    fn test_duplicate_full_key_is_rejected() {
        let err = Registry::build(vec![
            record("F1!DG1!K1!current", 0, None),
            record("F1!DG1!K1!current", 1, None),
        ]).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateKey("F1!DG1!K1!current".into()));
    }
}
