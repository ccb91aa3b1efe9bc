//! Label to address mapping built by the first pass.
use std::collections::HashMap;

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub struct Symbol {
    pub address: u16,
    /// 1-based line the label was defined on.
    pub line: usize,
}

#[derive(Default, Debug)]
pub struct SymbolTable {
    labels: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        SymbolTable { labels: HashMap::new() }
    }

    /// Records `name` at `address`. A second definition replaces the
    /// first; the replaced symbol is returned so the caller can report it.
    pub fn define(&mut self, name: &str, address: u16, line: usize) -> Option<Symbol> {
        self.labels.insert(name.to_string(), Symbol { address, line })
    }

    /// Returns the address of `name`, if it was defined.
    pub fn resolve(&self, name: &str) -> Option<u16> {
        self.labels.get(name).map(|sym| sym.address)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// All symbols sorted by address, then name.
    pub fn iter_sorted(&self) -> Vec<(&str, Symbol)> {
        let mut out: Vec<(&str, Symbol)> =
            self.labels.iter().map(|(name, sym)| (name.as_str(), *sym)).collect();
        out.sort_by(|a, b| a.1.address.cmp(&b.1.address).then(a.0.cmp(b.0)));
        out
    }
}
