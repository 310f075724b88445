//! Content-addressed memo of parsed sources.
//!
//! Entries are keyed by the SHA-256 of the raw payload plus the sheet name the
//! caller asked for. An entry is written once and never touched again; a new
//! payload simply lands under a new key, so a budget and an actual source can
//! sit side by side. Callers always get an owned copy of the table.

use crate::error::{DreError, Result};
use crate::loader::TabularLoader;
use crate::types::Table;
use crate::util::fold_header_unaccented;
use log::{debug, info, warn};
use sha2::{Digest, Sha256};
use std::collections::HashMap;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Fingerprint([u8; 32]);

impl Fingerprint {
    pub fn of(bytes: &[u8]) -> Self {
        let mut hasher = Sha256::new();
        hasher.update(bytes);
        Self(hasher.finalize().into())
    }
}

impl fmt::Display for Fingerprint {
    /// First 16 hex characters.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for b in &self.0[..8] {
            write!(f, "{:02x}", b)?;
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
struct CacheKey {
    fingerprint: Fingerprint,
    requested_sheet: String,
}

#[derive(Debug)]
struct CacheEntry {
    table: Table,
    sheet: String,
}

/// A parsed source as handed to callers.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadedSource {
    pub table: Table,
    /// The sheet actually read, which may differ from the one requested.
    pub sheet: String,
    pub fingerprint: Fingerprint,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CacheStats {
    pub hits: usize,
    pub misses: usize,
    pub entries: usize,
}

pub struct SourceCache<L: TabularLoader> {
    loader: L,
    entries: HashMap<CacheKey, CacheEntry>,
    hits: usize,
    misses: usize,
}

impl<L: TabularLoader> SourceCache<L> {
    pub fn new(loader: L) -> Self {
        Self {
            loader,
            entries: HashMap::new(),
            hits: 0,
            misses: 0,
        }
    }

    /// Parse `bytes` (or reuse an earlier parse of identical bytes) and return
    /// the table of the sheet that best matches `requested_sheet`.
    pub fn load(&mut self, bytes: &[u8], requested_sheet: &str) -> Result<LoadedSource> {
        if bytes.is_empty() {
            return Err(DreError::SourceUnavailable("empty payload".to_string()));
        }
        let key = CacheKey {
            fingerprint: Fingerprint::of(bytes),
            requested_sheet: requested_sheet.trim().to_string(),
        };

        if let Some(entry) = self.entries.get(&key) {
            self.hits += 1;
            debug!("cache hit {} / '{}'", key.fingerprint, key.requested_sheet);
            return Ok(LoadedSource {
                table: entry.table.clone(),
                sheet: entry.sheet.clone(),
                fingerprint: key.fingerprint,
            });
        }

        self.misses += 1;
        let sheets = self.loader.sheet_names(bytes)?;
        let sheet = resolve_sheet(&sheets, &key.requested_sheet)
            .ok_or_else(|| DreError::SourceUnavailable("source has no sheets".to_string()))?
            .to_string();
        let table = self.loader.read_sheet(bytes, &sheet)?;
        info!(
            "parsed source {} sheet '{}' ({} rows, {} columns)",
            key.fingerprint,
            sheet,
            table.len(),
            table.columns().len()
        );

        let loaded = LoadedSource {
            table: table.clone(),
            sheet: sheet.clone(),
            fingerprint: key.fingerprint,
        };
        self.entries.insert(key, CacheEntry { table, sheet });
        Ok(loaded)
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            hits: self.hits,
            misses: self.misses,
            entries: self.entries.len(),
        }
    }
}

/// Case-insensitive exact match, then prefix, then substring, then the first
/// sheet. `None` only when there are no sheets at all.
pub fn resolve_sheet<'a>(sheets: &'a [String], requested: &str) -> Option<&'a str> {
    let wanted = fold_header_unaccented(requested);
    let folded: Vec<String> = sheets.iter().map(|s| fold_header_unaccented(s)).collect();

    let found = if wanted.is_empty() {
        None
    } else {
        folded
            .iter()
            .position(|s| *s == wanted)
            .or_else(|| folded.iter().position(|s| s.starts_with(&wanted)))
            .or_else(|| folded.iter().position(|s| s.contains(&wanted)))
    };

    match found {
        Some(idx) => Some(sheets[idx].as_str()),
        None => {
            let first = sheets.first()?;
            warn!("sheet '{}' not found; using first sheet '{}'", requested, first);
            Some(first.as_str())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Scalar;
    use std::cell::Cell;

    struct CountingLoader {
        reads: Cell<usize>,
        sheets: Vec<String>,
    }

    impl CountingLoader {
        fn new(sheets: &[&str]) -> Self {
            Self {
                reads: Cell::new(0),
                sheets: sheets.iter().map(|s| s.to_string()).collect(),
            }
        }
    }

    impl TabularLoader for CountingLoader {
        fn sheet_names(&self, _bytes: &[u8]) -> Result<Vec<String>> {
            Ok(self.sheets.clone())
        }

        fn read_sheet(&self, bytes: &[u8], sheet: &str) -> Result<Table> {
            self.reads.set(self.reads.get() + 1);
            Ok(Table::new(
                vec!["SHEET".into(), "LEN".into()],
                vec![vec![Scalar::Text(sheet.into()), Scalar::Number(bytes.len() as f64)]],
            ))
        }
    }

    #[test]
    fn identical_bytes_are_parsed_once() {
        let loader = CountingLoader::new(&["BD"]);
        let mut cache = SourceCache::new(&loader);
        let a = cache.load(b"payload", "bd").unwrap();
        let b = cache.load(b"payload", "bd").unwrap();
        assert_eq!(a, b);
        assert_eq!(loader.reads.get(), 1);
        assert_eq!(cache.stats(), CacheStats { hits: 1, misses: 1, entries: 1 });
    }

    #[test]
    fn new_payload_adds_entry_without_touching_old_one() {
        let loader = CountingLoader::new(&["bd"]);
        let mut cache = SourceCache::new(&loader);
        let first = cache.load(b"v1", "bd").unwrap();
        let second = cache.load(b"v2 longer", "bd").unwrap();
        assert_ne!(first.fingerprint, second.fingerprint);
        assert_eq!(cache.load(b"v1", "bd").unwrap(), first);
        assert_eq!(loader.reads.get(), 2);
        assert_eq!(cache.stats().entries, 2);
    }

    #[test]
    fn sheet_name_is_part_of_the_key() {
        let loader = CountingLoader::new(&["bd", "orcamento"]);
        let mut cache = SourceCache::new(&loader);
        let actual = cache.load(b"same", "bd").unwrap();
        let budget = cache.load(b"same", "Orçamento").unwrap();
        assert_eq!(actual.sheet, "bd");
        assert_eq!(budget.sheet, "orcamento");
        assert_eq!(loader.reads.get(), 2);
    }

    #[test]
    fn empty_payload_is_source_unavailable() {
        let loader = CountingLoader::new(&["bd"]);
        let mut cache = SourceCache::new(&loader);
        assert!(matches!(cache.load(b"", "bd"), Err(DreError::SourceUnavailable(_))));
    }

    #[test]
    fn no_sheets_is_source_unavailable() {
        let loader = CountingLoader::new(&[]);
        let mut cache = SourceCache::new(&loader);
        assert!(matches!(cache.load(b"x", "bd"), Err(DreError::SourceUnavailable(_))));
    }

    #[test]
    fn sheet_resolution_order() {
        let sheets: Vec<String> = ["Resumo", "BD 2025", "bd", "Base bd"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        assert_eq!(resolve_sheet(&sheets, "BD"), Some("bd"));
        assert_eq!(resolve_sheet(&sheets, "bd 20"), Some("BD 2025"));
        assert_eq!(resolve_sheet(&sheets, "sumo"), Some("Resumo"));
        assert_eq!(resolve_sheet(&sheets, "missing"), Some("Resumo"));
        assert_eq!(resolve_sheet(&[], "bd"), None);
    }
}
