/*
Copyright 2025 Connor Nolan

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

//! C3 — the symbol table half. Identifier -> symbol, case-sensitive
//! (spec.md §4.3). Labels and `.eq` constants share one namespace.

use crate::errors::{AssemblyError, SourcePos};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SymbolKind {
    Label,
    Constant,
    Unknown,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Symbol {
    pub identifier: String,
    pub kind: SymbolKind,
    pub value: i64,
    pub resolved: bool,
    pub pos: SourcePos,
}

#[derive(Default)]
pub struct SymbolTable {
    symbols: HashMap<String, Symbol>,
}

impl SymbolTable {
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates (or reuses) an unresolved symbol at first use — the
    /// carried position is the use site, per spec.md §4.4 pass 2.
    pub fn add_unresolved(&mut self, ident: &str, pos: SourcePos) {
        self.symbols.entry(ident.to_string()).or_insert(Symbol {
            identifier: ident.to_string(),
            kind: SymbolKind::Unknown,
            value: 0,
            resolved: false,
            pos,
        });
    }

    /// Defines a symbol with a known value up front (a label's address,
    /// a `.eq` constant). Re-defining an already-resolved symbol is an
    /// error (spec.md §4.3).
    pub fn add_resolved(
        &mut self,
        ident: &str,
        kind: SymbolKind,
        value: i64,
        pos: SourcePos,
    ) -> Result<(), AssemblyError> {
        if let Some(existing) = self.symbols.get(ident) {
            if existing.resolved {
                return Err(AssemblyError::DuplicateSymbol {
                    ident: ident.to_string(),
                    pos,
                    first_pos: existing.pos.clone(),
                });
            }
        }
        self.symbols.insert(
            ident.to_string(),
            Symbol {
                identifier: ident.to_string(),
                kind,
                value,
                resolved: true,
                pos,
            },
        );
        Ok(())
    }

    /// Resolves a previously-unresolved symbol (one created via
    /// `add_unresolved` at a forward reference). Asserts the symbol
    /// exists and is currently unresolved.
    pub fn resolve(&mut self, ident: &str, kind: SymbolKind, value: i64) {
        let symbol = self
            .symbols
            .get_mut(ident)
            .expect("resolve() called on an unknown symbol");
        assert!(!symbol.resolved, "resolve() called on an already-resolved symbol");
        symbol.kind = kind;
        symbol.value = value;
        symbol.resolved = true;
    }

    pub fn lookup(&self, ident: &str) -> Option<&Symbol> {
        self.symbols.get(ident)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pos(line: usize) -> SourcePos {
        SourcePos::new("test.asm", line)
    }

    #[test]
    fn unresolved_then_resolved_round_trips() {
        let mut table = SymbolTable::new();
        table.add_unresolved("LOOP", pos(3));
        assert!(!table.lookup("LOOP").unwrap().resolved);
        table.resolve("LOOP", SymbolKind::Label, 0x8010);
        let sym = table.lookup("LOOP").unwrap();
        assert!(sym.resolved);
        assert_eq!(sym.value, 0x8010);
    }

    #[test]
    fn redefining_a_resolved_symbol_is_an_error() {
        let mut table = SymbolTable::new();
        table.add_resolved("N", SymbolKind::Constant, 4, pos(1)).unwrap();
        let err = table.add_resolved("N", SymbolKind::Constant, 5, pos(2)).unwrap_err();
        assert!(matches!(err, AssemblyError::DuplicateSymbol { .. }));
    }

    #[test]
    fn lookup_of_unknown_identifier_is_none() {
        let table = SymbolTable::new();
        assert!(table.lookup("MISSING").is_none());
    }
}
