//! Symbol table
//!
//! Maps names to invocable targets: native functions, block code, classes,
//! and the message names classes answer to. The table is assembled once
//! with [`SymbolTableBuilder`] and is read-only afterwards, so one
//! `Arc<SymbolTable>` can be shared by the contexts of any number of
//! threads.
//!
//! Lookup is either exact or case-insensitive. The VM stores names in upper
//! case, so insensitive lookup folds the query to upper case and compares it
//! with the folded registered names. A miss is `None`, never a panic.

use crate::error::RuntimeError;
use crate::invoke::Context;
use crate::params::Params;
use itembridge_core::Symbol;
use serde::Deserialize;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::warn;

/// Native entry point: reads parameters, sets the return slot via the context
pub type NativeFn =
    Arc<dyn Fn(&mut Context, &Params) -> Result<(), RuntimeError> + Send + Sync + 'static>;

/// Reserved symbol that evaluates a block
pub const EVAL: Symbol = Symbol::from_index(0);
pub const EVAL_NAME: &str = "EVAL";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaseMode {
    Exact,
    #[default]
    Insensitive,
}

/// What a symbol resolves to
#[derive(Clone)]
pub enum Target {
    Function(NativeFn),
    /// Body of a block; runs with the block as its receiver
    BlockCode(NativeFn),
    /// Calling a class symbol creates an instance
    Class(Arc<ClassDef>),
    /// Message name only; meaningful as the target of a send
    Message,
    Eval,
}

impl Target {
    pub fn kind_name(&self) -> &'static str {
        match self {
            Target::Function(_) => "function",
            Target::BlockCode(_) => "block",
            Target::Class(_) => "class",
            Target::Message => "message",
            Target::Eval => "eval",
        }
    }
}

impl std::fmt::Debug for Target {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.kind_name())
    }
}

/// Class definition: data members and methods
///
/// Data member `NAME` is instance variable `n` (1-based, declaration order);
/// the object answers `NAME` with its value and `_NAME` by assigning
/// parameter 1.
#[derive(Clone, Default)]
pub struct ClassDef {
    name: String,
    data: Vec<String>,
    methods: HashMap<String, NativeFn>,
}

impl ClassDef {
    pub fn new(name: &str) -> Self {
        ClassDef {
            name: name.to_ascii_uppercase(),
            ..ClassDef::default()
        }
    }

    pub fn data(mut self, member: &str) -> Self {
        self.data.push(member.to_ascii_uppercase());
        self
    }

    pub fn method<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Context, &Params) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        self.methods.insert(name.to_ascii_uppercase(), Arc::new(f));
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn field_count(&self) -> usize {
        self.data.len()
    }

    /// 1-based instance variable of a data member
    pub fn field_index(&self, member: &str) -> Option<usize> {
        self.data
            .iter()
            .position(|d| d.eq_ignore_ascii_case(member))
            .map(|i| i + 1)
    }

    pub fn find_method(&self, message: &str) -> Option<&NativeFn> {
        self.methods.get(&message.to_ascii_uppercase())
    }

    /// Every message the class answers to, including data accessors
    fn messages(&self) -> Vec<String> {
        let mut names: Vec<String> = self.methods.keys().cloned().collect();
        for member in &self.data {
            names.push(member.clone());
            names.push(format!("_{}", member));
        }
        names.sort();
        names
    }
}

struct Entry {
    name: String,
    target: Target,
}

pub struct SymbolTable {
    entries: Vec<Entry>,
    exact: HashMap<String, Symbol>,
    folded: HashMap<String, Symbol>,
    classes: HashMap<String, Arc<ClassDef>>,
}

impl SymbolTable {
    pub fn builder() -> SymbolTableBuilder {
        SymbolTableBuilder::new()
    }

    pub fn find(&self, name: &str, mode: CaseMode) -> Option<Symbol> {
        match mode {
            CaseMode::Exact => self.exact.get(name).copied(),
            CaseMode::Insensitive => self.folded.get(&name.to_ascii_uppercase()).copied(),
        }
    }

    /// Case-insensitive lookup
    pub fn find_name(&self, name: &str) -> Option<Symbol> {
        self.find(name, CaseMode::Insensitive)
    }

    /// Exact-case lookup
    pub fn get_case(&self, name: &str) -> Option<Symbol> {
        self.find(name, CaseMode::Exact)
    }

    pub fn name(&self, symbol: Symbol) -> Option<&str> {
        self.entries.get(symbol.index()).map(|e| e.name.as_str())
    }

    pub fn target(&self, symbol: Symbol) -> Option<&Target> {
        self.entries.get(symbol.index()).map(|e| &e.target)
    }

    pub fn class(&self, name: &str) -> Option<&Arc<ClassDef>> {
        self.classes.get(&name.to_ascii_uppercase())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Named entries in registration order
    pub fn iter(&self) -> impl Iterator<Item = (Symbol, &str, &Target)> {
        self.entries
            .iter()
            .enumerate()
            .filter(|(_, e)| !e.name.is_empty())
            .map(|(i, e)| (Symbol::from_index(i as u32), e.name.as_str(), &e.target))
    }
}

impl std::fmt::Debug for SymbolTable {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SymbolTable")
            .field("symbols", &self.entries.len())
            .field("classes", &self.classes.len())
            .finish()
    }
}

/// Assembles a [`SymbolTable`]
///
/// Registering a name again replaces its target. Block code is anonymous:
/// it gets a symbol but no name, so it can only be reached through a block.
pub struct SymbolTableBuilder {
    table: SymbolTable,
}

impl Default for SymbolTableBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SymbolTableBuilder {
    pub fn new() -> Self {
        let mut builder = SymbolTableBuilder {
            table: SymbolTable {
                entries: Vec::new(),
                exact: HashMap::new(),
                folded: HashMap::new(),
                classes: HashMap::new(),
            },
        };
        builder.insert(EVAL_NAME, Target::Eval);
        builder
    }

    fn insert(&mut self, name: &str, target: Target) -> Symbol {
        if let Some(&existing) = self.table.exact.get(name) {
            self.table.entries[existing.index()].target = target;
            return existing;
        }
        let symbol = Symbol::from_index(self.table.entries.len() as u32);
        self.table.entries.push(Entry {
            name: name.to_string(),
            target,
        });
        if !name.is_empty() {
            self.table.exact.insert(name.to_string(), symbol);
            // first registration keeps the folded name, unless it only
            // names a message
            let folded = self.table.folded.entry(name.to_ascii_uppercase());
            let slot = folded.or_insert(symbol);
            if matches!(self.table.entries[slot.index()].target, Target::Message) {
                *slot = symbol;
            }
        }
        symbol
    }

    fn is_reserved(name: &str) -> bool {
        name.eq_ignore_ascii_case(EVAL_NAME)
    }

    pub fn function<F>(mut self, name: &str, f: F) -> Self
    where
        F: Fn(&mut Context, &Params) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        self.register(name, f);
        self
    }

    /// Non-consuming form of [`SymbolTableBuilder::function`]
    pub fn register<F>(&mut self, name: &str, f: F) -> Option<Symbol>
    where
        F: Fn(&mut Context, &Params) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        if Self::is_reserved(name) {
            warn!(name, "ignoring registration of a reserved symbol");
            return None;
        }
        Some(self.insert(name, Target::Function(Arc::new(f))))
    }

    /// Register block code; the returned symbol goes into `Block::new`
    pub fn block_code<F>(&mut self, f: F) -> Symbol
    where
        F: Fn(&mut Context, &Params) -> Result<(), RuntimeError> + Send + Sync + 'static,
    {
        let symbol = Symbol::from_index(self.table.entries.len() as u32);
        self.table.entries.push(Entry {
            name: String::new(),
            target: Target::BlockCode(Arc::new(f)),
        });
        symbol
    }

    /// Register a class and intern every message it answers to
    pub fn class(&mut self, def: ClassDef) -> Symbol {
        for message in def.messages() {
            self.message(&message);
        }
        let def = Arc::new(def);
        self.table.classes.insert(def.name().to_string(), def.clone());
        let name = def.name().to_string();
        self.insert(&name, Target::Class(def))
    }

    /// Intern a message name; an existing symbol of that name is reused
    pub fn message(&mut self, name: &str) -> Symbol {
        let upper = name.to_ascii_uppercase();
        if let Some(&existing) = self.table.folded.get(&upper) {
            return existing;
        }
        self.insert(&upper, Target::Message)
    }

    pub fn build(self) -> Arc<SymbolTable> {
        Arc::new(self.table)
    }
}
