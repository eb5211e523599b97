//! Grammar types.

use crate::{syntax as s, types::Map, util::display_fn};
use std::{fmt, fs, io, path::Path};

/// The name used for the empty-body marker in grammar sources and renderings.
pub const EPSILON_NAME: &str = "EPS";

/// The name used for the end-of-input marker.
pub const EOI_NAME: &str = "$";

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct TerminalID {
    raw: u16,
}

impl TerminalID {
    /// Reserved symbol used as a terminal symbol that means the end of input.
    pub const EOI: Self = Self::from_raw(0);

    /// Reserved marker of the empty string.
    ///
    /// It only shows up in FIRST sets (as the nullability flag) and as the
    /// sole symbol of an empty production passed to [`GrammarDef::production`].
    pub const EPSILON: Self = Self::from_raw(1);

    const OFFSET: u16 = 2;

    #[inline]
    pub const fn from_raw(raw: u16) -> Self {
        Self { raw }
    }

    #[inline]
    pub const fn into_raw(self) -> u16 {
        self.raw
    }

    #[inline]
    pub const fn is_reserved(self) -> bool {
        self.raw < Self::OFFSET
    }
}

impl fmt::Debug for TerminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::EOI => write!(f, "T#EOI"),
            Self::EPSILON => write!(f, "T#EPS"),
            _ => write!(f, "T#{:03}", self.raw),
        }
    }
}

/// A set of terminal symbols.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct TerminalSet {
    inner: bit_set::BitSet,
}

impl TerminalSet {
    pub fn contains(&self, id: TerminalID) -> bool {
        self.inner.contains(id.into_raw().into())
    }
    pub fn insert(&mut self, id: TerminalID) -> bool {
        self.inner.insert(id.into_raw().into())
    }
    pub fn remove(&mut self, id: TerminalID) -> bool {
        self.inner.remove(id.into_raw().into())
    }
    pub fn union_with(&mut self, other: &Self) {
        self.inner.union_with(&other.inner)
    }
    pub fn is_subset(&self, other: &Self) -> bool {
        self.inner.is_subset(&other.inner)
    }
    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
    pub fn len(&self) -> usize {
        self.inner.len()
    }
    pub fn iter(&self) -> impl Iterator<Item = TerminalID> + '_ {
        self.inner
            .iter()
            .map(|raw| raw.try_into().map(TerminalID::from_raw).unwrap())
    }

    /// `{a, b, EPS}`, with the user terminals first and the reserved markers last.
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            let user = self.iter().filter(|t| !t.is_reserved());
            let reserved = [TerminalID::EPSILON, TerminalID::EOI]
                .into_iter()
                .filter(|t| self.contains(*t));
            f.write_str("{")?;
            crate::util::write_separated(
                f,
                ", ",
                user.chain(reserved).map(|t| g.terminal_name(t)),
            )?;
            f.write_str("}")
        })
    }
}

impl FromIterator<TerminalID> for TerminalSet {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = TerminalID>,
    {
        Self {
            inner: iter.into_iter().map(|t| t.into_raw().into()).collect(),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct NonterminalID {
    raw: u16,
}

impl NonterminalID {
    /// The augmented start symbol `S'`.
    pub const START: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl fmt::Debug for NonterminalID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::START => write!(f, "N#Start"),
            _ => write!(f, "N#{:03}", self.raw),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum SymbolID {
    T(TerminalID),
    N(NonterminalID),
}

impl fmt::Debug for SymbolID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::T(t) => write!(f, "{:?}", t),
            Self::N(n) => write!(f, "{:?}", n),
        }
    }
}

#[derive(Copy, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[repr(transparent)]
pub struct ProductionID {
    raw: u16,
}

impl ProductionID {
    /// The augmented production `S' -> S`.
    pub const ACCEPT: Self = Self::new(0);

    const OFFSET: u16 = 1;

    #[inline]
    const fn new(raw: u16) -> Self {
        Self { raw }
    }
}

impl fmt::Debug for ProductionID {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::ACCEPT => write!(f, "P#Accept"),
            _ => write!(f, "P#{:03}", self.raw),
        }
    }
}

/// The type that represents a production rule in grammar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Production {
    left: NonterminalID,
    right: Vec<SymbolID>,
}

impl Production {
    /// Return the left-hand side of this production.
    pub fn left(&self) -> NonterminalID {
        self.left
    }

    /// Return the right-hand side of this production, empty for an epsilon production.
    pub fn right(&self) -> &[SymbolID] {
        &self.right[..]
    }

    // `"LHS -> R1 R2 R3"`
    pub fn display<'g>(&'g self, g: &'g Grammar) -> impl fmt::Display + 'g {
        display_fn(|f| {
            write!(f, "{} -> ", g.nonterminal_name(self.left))?;
            if self.right.is_empty() {
                f.write_str(EPSILON_NAME)
            } else {
                crate::util::write_separated(f, " ", self.right.iter().map(|s| g.symbol_name(*s)))
            }
        })
    }
}

/// The grammar definition used to derive the analysis artifacts.
#[derive(Debug)]
pub struct Grammar {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    start_symbol: NonterminalID,
}

impl Grammar {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Grammar, GrammarError> {
        let source = fs::read_to_string(path).map_err(GrammarError::IO)?;
        Self::from_str(&source)
    }

    pub fn from_str(source: &str) -> Result<Grammar, GrammarError> {
        let grammar = s::parse(source)?;
        Grammar::define(|g| define_grammar_from_syntax(g, &grammar))
    }

    /// Define a grammar using the specified function.
    pub fn define<F>(f: F) -> Result<Self, GrammarError>
    where
        F: FnOnce(&mut GrammarDef) -> Result<(), GrammarError>,
    {
        let mut def = GrammarDef {
            terminals: Map::default(),
            nonterminals: Map::default(),
            productions: Map::default(),
            start_symbol: None,
            next_terminal: TerminalID::OFFSET,
            next_nonterminal: NonterminalID::OFFSET,
            next_production: ProductionID::OFFSET,
        };

        def.terminals.insert(TerminalID::EOI, EOI_NAME.into());
        def.terminals.insert(TerminalID::EPSILON, EPSILON_NAME.into());
        // renamed after the start symbol is known.
        def.nonterminals.insert(NonterminalID::START, String::new());

        f(&mut def)?;

        def.end()
    }

    /// Iterate over the declared terminal symbols, excluding the reserved markers.
    pub fn terminals(&self) -> impl Iterator<Item = (TerminalID, &str)> + '_ {
        self.terminals
            .iter()
            .filter(|(id, _)| !id.is_reserved())
            .map(|(id, name)| (*id, name.as_str()))
    }

    /// Iterate over the declared nonterminal symbols, excluding the augmented start symbol.
    pub fn nonterminals(&self) -> impl Iterator<Item = (NonterminalID, &str)> + '_ {
        self.nonterminals
            .iter()
            .filter(|(id, _)| **id != NonterminalID::START)
            .map(|(id, name)| (*id, name.as_str()))
    }

    /// Iterate over all productions in declaration order, starting with the augmented one.
    pub fn productions(&self) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions.iter().map(|(id, p)| (*id, p))
    }

    /// Iterate over the productions whose left-hand side is `n`.
    pub fn productions_of(
        &self,
        n: NonterminalID,
    ) -> impl Iterator<Item = (ProductionID, &Production)> + '_ {
        self.productions().filter(move |(_, p)| p.left == n)
    }

    pub fn production(&self, id: ProductionID) -> &Production {
        &self.productions[&id]
    }

    /// The user-facing start symbol, `S` in the augmented production `S' -> S`.
    pub fn start_symbol(&self) -> NonterminalID {
        self.start_symbol
    }

    pub fn terminal_name(&self, id: TerminalID) -> &str {
        &self.terminals[&id]
    }

    pub fn nonterminal_name(&self, id: NonterminalID) -> &str {
        &self.nonterminals[&id]
    }

    pub fn symbol_name(&self, id: SymbolID) -> &str {
        match id {
            SymbolID::T(t) => self.terminal_name(t),
            SymbolID::N(n) => self.nonterminal_name(n),
        }
    }

    /// Look up a declared symbol by name. Reserved markers are not found.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        lookup(&self.terminals, &self.nonterminals, name)
    }

    pub fn terminal(&self, name: &str) -> Option<TerminalID> {
        match self.symbol(name)? {
            SymbolID::T(t) => Some(t),
            SymbolID::N(_) => None,
        }
    }

    pub fn nonterminal(&self, name: &str) -> Option<NonterminalID> {
        match self.symbol(name)? {
            SymbolID::N(n) => Some(n),
            SymbolID::T(_) => None,
        }
    }
}

impl fmt::Display for Grammar {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#### terminals: ")?;
        crate::util::write_separated(f, ", ", self.terminals().map(|(_, name)| name))?;
        write!(f, "\n#### nonterminals: ")?;
        crate::util::write_separated(f, ", ", self.nonterminals().map(|(_, name)| name))?;
        write!(f, "\n#### start: {}", self.nonterminal_name(self.start_symbol))?;
        writeln!(f, "\n#### productions:")?;
        for (_, p) in self.productions() {
            writeln!(f, "- {}", p.display(self))?;
        }
        Ok(())
    }
}

fn lookup(
    terminals: &Map<TerminalID, String>,
    nonterminals: &Map<NonterminalID, String>,
    name: &str,
) -> Option<SymbolID> {
    terminals
        .iter()
        .find(|(id, n)| !id.is_reserved() && *n == name)
        .map(|(id, _)| SymbolID::T(*id))
        .or_else(|| {
            nonterminals
                .iter()
                .find(|(id, n)| **id != NonterminalID::START && *n == name)
                .map(|(id, _)| SymbolID::N(*id))
        })
}

fn define_grammar_from_syntax(
    g: &mut GrammarDef,
    grammar: &s::Grammar,
) -> Result<(), GrammarError> {
    for name in &grammar.terminals {
        g.terminal(name)?;
    }
    for name in &grammar.nonterminals {
        g.nonterminal(name)?;
    }

    for rule in &grammar.rules {
        let left = match g.symbol(&rule.left) {
            Some(SymbolID::N(n)) => n,
            Some(SymbolID::T(..)) => {
                return Err(format!(
                    "line {}: the left-hand side `{}' is a terminal symbol",
                    rule.line, rule.left
                )
                .into())
            }
            None => {
                return Err(format!(
                    "line {}: the left-hand side `{}' is not a declared nonterminal symbol",
                    rule.line, rule.left
                )
                .into())
            }
        };

        for alternative in &rule.alternatives {
            let mut right = vec![];
            for symbol in alternative {
                let symbol = match &**symbol {
                    EPSILON_NAME => SymbolID::T(TerminalID::EPSILON),
                    name => g.symbol(name).ok_or_else(|| {
                        format!("line {}: undeclared symbol `{}'", rule.line, name)
                    })?,
                };
                right.push(symbol);
            }
            g.production(left, right)?;
        }
    }

    Ok(())
}

/// The contextural values for building a `Grammar`.
#[derive(Debug)]
pub struct GrammarDef {
    terminals: Map<TerminalID, String>,
    nonterminals: Map<NonterminalID, String>,
    productions: Map<ProductionID, Production>,
    start_symbol: Option<NonterminalID>,
    next_terminal: u16,
    next_nonterminal: u16,
    next_production: u16,
}

impl GrammarDef {
    /// Declare a terminal symbol used in this grammar.
    pub fn terminal(&mut self, name: &str) -> Result<TerminalID, GrammarError> {
        self.verify_name(name)?;

        let id = TerminalID::from_raw(self.next_terminal);
        self.next_terminal = self
            .next_terminal
            .checked_add(1)
            .ok_or("too many terminal symbols")?;
        self.terminals.insert(id, name.to_owned());

        Ok(id)
    }

    /// Declare a nonterminal symbol used in this grammar.
    ///
    /// The first declared nonterminal becomes the start symbol unless
    /// [`start_symbol`](Self::start_symbol) is called.
    pub fn nonterminal(&mut self, name: &str) -> Result<NonterminalID, GrammarError> {
        self.verify_name(name)?;

        let id = NonterminalID::new(self.next_nonterminal);
        self.next_nonterminal = self
            .next_nonterminal
            .checked_add(1)
            .ok_or("too many nonterminal symbols")?;
        self.nonterminals.insert(id, name.to_owned());

        Ok(id)
    }

    /// Specify a production rule into this grammar.
    ///
    /// A right-hand side consisting of [`TerminalID::EPSILON`] alone, or no
    /// symbol at all, declares an empty production.
    pub fn production<I>(&mut self, left: NonterminalID, right: I) -> Result<ProductionID, GrammarError>
    where
        I: IntoIterator<Item = SymbolID>,
    {
        if left == NonterminalID::START || !self.nonterminals.contains_key(&left) {
            return Err(format!("the left-hand side {:?} is not a declared nonterminal", left).into());
        }

        let mut right: Vec<SymbolID> = right.into_iter().collect();
        // the marker position of an item is stored in u16.
        u16::try_from(right.len()).map_err(|_| "too long production rule")?;
        for symbol in &right {
            match symbol {
                SymbolID::T(TerminalID::EOI) => {
                    return Err("the end-of-input marker cannot appear in a production".into())
                }
                SymbolID::T(TerminalID::EPSILON) if right.len() > 1 => {
                    return Err(format!(
                        "`{}' must be the only symbol of an empty production",
                        EPSILON_NAME
                    )
                    .into())
                }
                SymbolID::T(t) if !self.terminals.contains_key(t) => {
                    return Err(format!("undeclared terminal {:?}", t).into())
                }
                SymbolID::N(n) if *n == NonterminalID::START || !self.nonterminals.contains_key(n) => {
                    return Err(format!("undeclared nonterminal {:?}", n).into())
                }
                _ => (),
            }
        }
        if right == [SymbolID::T(TerminalID::EPSILON)] {
            right.clear();
        }

        for p in self.productions.values() {
            if p.left == left && p.right == right {
                let p = Production { left, right };
                return Err(format!(
                    "duplicate production rule `{}'",
                    p.display_with(&self.terminals, &self.nonterminals)
                )
                .into());
            }
        }

        let id = ProductionID::new(self.next_production);
        self.next_production = self
            .next_production
            .checked_add(1)
            .ok_or("too many production rules")?;
        self.productions.insert(id, Production { left, right });

        Ok(id)
    }

    /// Specify the start symbol for this grammar.
    pub fn start_symbol(&mut self, symbol: NonterminalID) -> Result<(), GrammarError> {
        if symbol == NonterminalID::START || !self.nonterminals.contains_key(&symbol) {
            return Err(format!("the start symbol {:?} is not a declared nonterminal", symbol).into());
        }
        self.start_symbol.replace(symbol);
        Ok(())
    }

    /// Look up a symbol declared so far.
    pub fn symbol(&self, name: &str) -> Option<SymbolID> {
        lookup(&self.terminals, &self.nonterminals, name)
    }

    fn verify_name(&self, name: &str) -> Result<(), GrammarError> {
        if name.is_empty()
            || name.contains(char::is_whitespace)
            || name.contains("->")
            || name.contains('|')
            || name.starts_with('#')
        {
            return Err(format!("invalid symbol name: {:?}", name).into());
        }
        if name == EPSILON_NAME || name == EOI_NAME {
            return Err(format!("`{}' is a reserved symbol name", name).into());
        }
        if self.symbol(name).is_some() {
            return Err(format!("the symbol `{}' has already been declared", name).into());
        }
        Ok(())
    }

    fn end(mut self) -> Result<Grammar, GrammarError> {
        // 指定されていない場合は最初に登録されたnonterminal symbolを用いる
        let start = match self.start_symbol.take() {
            Some(start) => start,
            None => self
                .nonterminals
                .keys()
                .find(|id| **id != NonterminalID::START)
                .copied()
                .ok_or("no nonterminal symbol is declared")?,
        };

        // every nonterminal reachable through a production body must be expandable.
        let referenced = self
            .productions
            .values()
            .flat_map(|p| p.right.iter())
            .filter_map(|s| match s {
                SymbolID::N(n) => Some(*n),
                SymbolID::T(..) => None,
            })
            .chain(Some(start));
        for n in referenced {
            if self.productions.values().all(|p| p.left != n) {
                return Err(format!(
                    "the nonterminal `{}' has no production rule",
                    self.nonterminals[&n]
                )
                .into());
            }
        }

        let augmented = format!("{}'", self.nonterminals[&start]);
        self.nonterminals[&NonterminalID::START] = augmented;

        let mut productions = Map::default();
        productions.insert(
            ProductionID::ACCEPT,
            Production {
                left: NonterminalID::START,
                right: vec![SymbolID::N(start)],
            },
        );
        productions.extend(self.productions);

        Ok(Grammar {
            terminals: self.terminals,
            nonterminals: self.nonterminals,
            productions,
            start_symbol: start,
        })
    }
}

impl Production {
    fn display_with<'a>(
        &'a self,
        terminals: &'a Map<TerminalID, String>,
        nonterminals: &'a Map<NonterminalID, String>,
    ) -> impl fmt::Display + 'a {
        display_fn(move |f| {
            write!(f, "{} ->", nonterminals[&self.left])?;
            for symbol in &self.right {
                match symbol {
                    SymbolID::T(t) => write!(f, " {}", terminals[t])?,
                    SymbolID::N(n) => write!(f, " {}", nonterminals[n])?,
                }
            }
            if self.right.is_empty() {
                write!(f, " {}", EPSILON_NAME)?;
            }
            Ok(())
        })
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GrammarError {
    #[error("IO error: {}", _0)]
    IO(io::Error),

    #[error("syntax error at line {line}: {msg}")]
    Syntax { line: usize, msg: String },

    #[error("malformed grammar: {msg}")]
    Malformed { msg: String },
}
impl From<&str> for GrammarError {
    fn from(msg: &str) -> Self {
        Self::Malformed { msg: msg.into() }
    }
}
impl From<String> for GrammarError {
    fn from(msg: String) -> Self {
        Self::Malformed { msg }
    }
}
