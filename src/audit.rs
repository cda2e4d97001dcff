//! One audit run: registry, levels, cycles, violations.
//!
//! Every run owns its registry and resolver. Funds never reference each other
//! (references are qualified with the owning fund), so a per-fund split gives
//! independent runs that can go wide on the rayon pool.

use crate::analysis::{CycleAnalysis, LevelResolver};
use crate::config::{AuditConfig, ConfigError};
use crate::report::{AuditReport, Summary};
use crate::source::{RecordSource, SourceError};
use crate::store::{KeyRecord, Registry, RegistryError};
use crate::validation::Validator;
use rayon::prelude::*;
use std::collections::BTreeMap;
use thiserror::Error;
use tracing::{info, info_span};

#[derive(Error, Debug)]
pub enum AuditError {
    #[error(transparent)]
    Source(#[from] SourceError),
    #[error(transparent)]
    Registry(#[from] RegistryError),
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Audits one closed-world record set.
pub fn audit_records(records: Vec<KeyRecord>, config: &AuditConfig) -> Result<AuditReport, RegistryError> {
    let _span = info_span!("audit", records = records.len()).entered();

    let registry = Registry::build(records)?;
    let levels = LevelResolver::new(&registry).resolve_all();
    let cycles = CycleAnalysis::analyze(&registry);

    let mut validator = Validator::new(&registry, &levels);
    if config.report_cycles {
        validator = validator.with_cycles(&cycles);
    }
    let violations = validator.validate();
    let summary = Summary::collect(&registry, &levels, &violations);

    let cycle_keys = cycles
        .components()
        .iter()
        .map(|members| {
            members.iter().map(|&id| registry.record(id).full_key.clone()).collect()
        })
        .collect();

    info!(
        keys = summary.keys,
        violations = violations.len(),
        mismatches = summary.level_mismatches,
        cycles = cycles.components().len(),
        "Audit finished"
    );

    Ok(AuditReport {
        fund_id: None,
        levels: validator.level_deltas(),
        violations,
        cycles: cycle_keys,
        summary,
    })
}

/// Splits the records by fund and audits each fund independently.
/// Reports come back ordered by fund id.
pub fn audit_by_fund(records: Vec<KeyRecord>, config: &AuditConfig) -> Result<Vec<AuditReport>, RegistryError> {
    let mut funds: BTreeMap<String, Vec<KeyRecord>> = BTreeMap::new();
    for record in records {
        funds.entry(record.fund_id.clone()).or_default().push(record);
    }
    info!(funds = funds.len(), "Auditing funds in parallel");

    funds
        .into_par_iter()
        .map(|(fund, records)| -> Result<AuditReport, RegistryError> {
            let _span = info_span!("fund", fund = %fund).entered();
            let mut report = audit_records(records, config)?;
            report.fund_id = Some(fund);
            Ok(report)
        })
        .collect()
}

/// Fetches from `source` and audits according to `config`.
///
/// A fetch failure aborts before any graph work.
pub fn run(source: &dyn RecordSource, config: &AuditConfig) -> Result<Vec<AuditReport>, AuditError> {
    let mut records = source.fetch()?;

    if let Some(fund) = &config.fund_id {
        records.retain(|r| &r.fund_id == fund);
    }

    if config.parallel {
        Ok(audit_by_fund(records, config)?)
    } else {
        let mut report = audit_records(records, config)?;
        report.fund_id = config.fund_id.clone();
        Ok(vec![report])
    }
}
