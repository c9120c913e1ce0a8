use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Register aliases seeded into every table. Never rebound by user code.
const ALIASES: &[(&str, u16)] = &[("pc", 15), ("psr", 0)];

/// Name -> 16-bit value, in definition order.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    entries: IndexMap<String, u16>,
}

/// One exported symbol (see `--symbols-json`).
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SymbolKV {
    pub name: String,
    pub value: u16,
}

impl SymbolTable {
    pub fn new() -> Self {
        let mut entries = IndexMap::new();
        for r in 0..16u16 {
            entries.insert(format!("r{r}"), r);
        }
        for &(name, value) in ALIASES {
            entries.insert(name.to_string(), value);
        }
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<u16> {
        self.entries.get(name).copied()
    }

    /// `r0`..`r15`, `pc` and `psr`.
    pub fn is_reserved(name: &str) -> bool {
        if ALIASES.iter().any(|&(a, _)| a == name) {
            return true;
        }
        match name.strip_prefix('r') {
            Some(idx) if !idx.is_empty() && (idx == "0" || !idx.starts_with('0')) => {
                idx.parse::<u8>().map_or(false, |i| i < 16)
            }
            _ => false,
        }
    }

    /// Bind `name`, overwriting any previous user binding. Returns false (and
    /// leaves the table untouched) for reserved register names.
    pub fn define(&mut self, name: &str, value: u32) -> bool {
        if Self::is_reserved(name) {
            warn!(symbol = name, "ignoring attempt to rebind a register name");
            return false;
        }
        self.entries.insert(name.to_string(), (value & 0xFFFF) as u16);
        true
    }

    /// User-defined symbols in definition order.
    pub fn user_symbols(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.entries
            .iter()
            .filter(|(name, _)| !Self::is_reserved(name))
            .map(|(name, &value)| (name.as_str(), value))
    }

    /// Entries shown in the symbol dump: everything except the register
    /// names and `pc`. `psr` stays visible although it cannot be rebound.
    pub fn listed(&self) -> impl Iterator<Item = (&str, u16)> + '_ {
        self.entries
            .iter()
            .filter(|(name, _)| name.as_str() == "psr" || !Self::is_reserved(name))
            .map(|(name, &value)| (name.as_str(), value))
    }

    pub fn export(&self) -> Vec<SymbolKV> {
        self.user_symbols()
            .map(|(name, value)| SymbolKV { name: name.to_string(), value })
            .collect()
    }
}

impl Default for SymbolTable {
    fn default() -> Self {
        Self::new()
    }
}
