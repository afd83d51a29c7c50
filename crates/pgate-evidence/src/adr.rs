//! ADR reference resolution.
//!
//! A change references an ADR in one of three ways:
//!
//! 1. the collector already resolved it (`adr.referenced`);
//! 2. the change description mentions `ADR-<digits>` and the id is found in
//!    `adr.catalog`;
//! 3. the change adds or edits a file matching the policy's
//!    `adr_file_glob`.
//!
//! Ids that cannot be resolved and ADR files absent from the catalog still
//! count as references, but as records that are not schema-valid, so the
//! rule reports them as invalid instead of missing.

use std::sync::LazyLock;

use regex::Regex;

use pgate_core::glob_match;

use crate::bundle::{AdrEvidence, AdrRecord};

const ADR_ID_PATTERN: &str = r"(?i)\bADR[-_ ]?(\d{1,5})\b";

static ADR_ID_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(ADR_ID_PATTERN).expect("ADR id pattern is a valid regex"));

/// Find `ADR-<digits>` references in free text, in order of first mention.
///
/// Ids are normalized to `ADR-` followed by four zero-padded digits, so
/// `adr 7`, `ADR-07` and `ADR-0007` are the same reference.
pub fn extract_adr_ids(text: &str) -> Vec<String> {
    let mut ids: Vec<String> = Vec::new();
    for caps in ADR_ID_RE.captures_iter(text) {
        let Some(digits) = caps.get(1) else { continue };
        let Ok(n) = digits.as_str().parse::<u32>() else { continue };
        let id = format!("ADR-{n:04}");
        if !ids.contains(&id) {
            ids.push(id);
        }
    }
    ids
}

/// Normalize a catalog id for comparison with extracted ids.
fn normalize_id(id: &str) -> String {
    extract_adr_ids(id)
        .into_iter()
        .next()
        .unwrap_or_else(|| id.to_string())
}

/// Resolve referenced ids and ADR files against the catalog.
pub fn resolve_adrs(
    ids: &[String],
    catalog: &[AdrRecord],
    changed_paths: &[String],
    adr_file_glob: Option<&str>,
) -> Vec<AdrRecord> {
    let mut resolved: Vec<AdrRecord> = Vec::new();
    let mut push = |record: AdrRecord| {
        if !resolved.iter().any(|r| normalize_id(&r.id) == normalize_id(&record.id)) {
            resolved.push(record);
        }
    };

    for id in ids {
        match catalog.iter().find(|r| normalize_id(&r.id) == *id) {
            Some(record) => push(record.clone()),
            None => push(AdrRecord {
                id: id.clone(),
                ..Default::default()
            }),
        }
    }

    if let Some(glob) = adr_file_glob {
        for path in changed_paths.iter().filter(|p| glob_match(glob, p)) {
            match catalog.iter().find(|r| r.path.as_deref() == Some(path.as_str())) {
                Some(record) => push(record.clone()),
                None => push(AdrRecord {
                    id: path.clone(),
                    path: Some(path.clone()),
                    ..Default::default()
                }),
            }
        }
    }

    resolved
}

impl AdrEvidence {
    /// Every ADR this change references, de-duplicated by id.
    pub fn referenced_adrs(&self, adr_file_glob: Option<&str>) -> Vec<AdrRecord> {
        let ids = self
            .description
            .as_deref()
            .map(extract_adr_ids)
            .unwrap_or_default();
        let mut all = self.referenced.clone();
        for record in resolve_adrs(&ids, &self.catalog, &self.changed_paths, adr_file_glob) {
            if !all.iter().any(|r| normalize_id(&r.id) == normalize_id(&record.id)) {
                all.push(record);
            }
        }
        all
    }
}
