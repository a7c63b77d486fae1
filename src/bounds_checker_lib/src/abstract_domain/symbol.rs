use crate::intermediate_representation::{FieldName, ProcName, Pvar};
use crate::prelude::*;
use derive_more::Deref;
use fnv::FnvHashMap;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;

/// Whether a symbol stands for the lower or the upper end of the interval of
/// an unknown input value.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum BoundEnd {
    /// The symbol names the smallest value the input may take.
    LowerBound,
    /// The symbol names the largest value the input may take.
    UpperBound,
}

/// A symbolic name for one bound of an otherwise unknown input value of the
/// analyzed procedure.
///
/// Symbols are created in pairs (one per [`BoundEnd`]) when a formal
/// parameter or a global is read for the first time; see [`SymbolTable`].
/// They are ordered and compared by their numeric id, which is unique within
/// one procedure analysis.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord, Deref)]
#[deref(forward)]
pub struct Symbol(Arc<SymbolData>);

/// The data contained in a symbol.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct SymbolData {
    id: u64,
    bound_end: BoundEnd,
    proc: ProcName,
    path: SymbolPath,
    unsigned: bool,
}

impl Symbol {
    /// Create a new symbol.
    pub fn new(
        id: u64,
        bound_end: BoundEnd,
        proc: ProcName,
        path: SymbolPath,
        unsigned: bool,
    ) -> Symbol {
        Symbol(Arc::new(SymbolData {
            id,
            bound_end,
            proc,
            path,
            unsigned,
        }))
    }

    /// Get the unique id of the symbol.
    pub fn id(&self) -> u64 {
        self.0.id
    }

    /// Get the bound end the symbol stands for.
    pub fn bound_end(&self) -> BoundEnd {
        self.0.bound_end
    }

    /// Get the access path whose input value the symbol names.
    pub fn path(&self) -> &SymbolPath {
        &self.0.path
    }

    /// Get the procedure the symbol belongs to.
    pub fn proc(&self) -> &ProcName {
        &self.0.proc
    }

    /// Return whether the named input value is known to be non-negative.
    pub fn is_unsigned(&self) -> bool {
        self.0.unsigned
    }
}

impl Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "s${}", self.0.id)
    }
}

/// The kind of a pointer dereference inside a [`SymbolPath`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy, PartialOrd, Ord)]
pub enum DerefKind {
    /// Dereference of a pointer to a single cell.
    Pointer,
    /// Dereference of a pointer into an array; the path then stands for all
    /// elements of the array at once.
    ArrayIndex,
}

/// An access path describing how an input value of the analyzed procedure is
/// reached from a formal parameter or a global.
///
/// It is defined recursively, where the root is always a program variable.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum SymbolPath {
    /// The value of a program variable at procedure entry.
    Pvar(Pvar),
    /// The value reached by dereferencing the pointer denoted by the base path.
    Deref {
        /// Whether the dereference selects a single cell or an array element.
        kind: DerefKind,
        /// The path of the dereferenced pointer.
        base: Arc<SymbolPath>,
    },
    /// The value of a field of the base path.
    Field {
        /// The path of the projected value.
        base: Arc<SymbolPath>,
        /// The name of the projected field.
        field: FieldName,
    },
}

impl SymbolPath {
    /// Create the path denoting the entry value of a program variable.
    pub fn of_pvar(pvar: Pvar) -> SymbolPath {
        SymbolPath::Pvar(pvar)
    }

    /// Create the path dereferencing `base`.
    pub fn deref(kind: DerefKind, base: SymbolPath) -> SymbolPath {
        SymbolPath::Deref {
            kind,
            base: Arc::new(base),
        }
    }

    /// Create the path projecting the given field out of `base`.
    pub fn field(base: SymbolPath, field: FieldName) -> SymbolPath {
        SymbolPath::Field {
            base: Arc::new(base),
            field,
        }
    }

    /// Return whether the path may denote more than one concrete cell,
    /// i.e. whether it dereferences into an array.
    pub fn represents_multiple_values(&self) -> bool {
        match self {
            SymbolPath::Pvar(_) => false,
            SymbolPath::Deref { kind, base } => {
                *kind == DerefKind::ArrayIndex || base.represents_multiple_values()
            }
            SymbolPath::Field { base, .. } => base.represents_multiple_values(),
        }
    }
}

impl Display for SymbolPath {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymbolPath::Pvar(pvar) => write!(f, "{pvar}"),
            SymbolPath::Deref { base, .. } => write!(f, "*{base}"),
            SymbolPath::Field { base, field } => write!(f, "{base}.{field}"),
        }
    }
}

/// A set of symbols occurring in the bounds of an abstract value.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default, Deref)]
pub struct SymbolSet(BTreeSet<Symbol>);

impl SymbolSet {
    /// Create an empty symbol set.
    pub fn new() -> SymbolSet {
        SymbolSet(BTreeSet::new())
    }

    /// Create a set containing only the given symbol.
    pub fn singleton(symbol: Symbol) -> SymbolSet {
        SymbolSet(BTreeSet::from([symbol]))
    }

    /// Add a symbol to the set.
    pub fn insert(&mut self, symbol: Symbol) {
        self.0.insert(symbol);
    }

    /// Return the union of the two sets.
    pub fn union(&self, other: &SymbolSet) -> SymbolSet {
        SymbolSet(self.0.union(&other.0).cloned().collect())
    }
}

impl FromIterator<Symbol> for SymbolSet {
    fn from_iter<I: IntoIterator<Item = Symbol>>(iter: I) -> SymbolSet {
        SymbolSet(iter.into_iter().collect())
    }
}

/// A generator of fresh symbol ids, one per analyzed procedure.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct Counter(u64);

impl Counter {
    /// Create a new counter starting at zero.
    pub fn new() -> Counter {
        Counter(0)
    }

    /// Return the next fresh id.
    pub fn next_id(&mut self) -> u64 {
        let id = self.0;
        self.0 += 1;
        id
    }
}

/// The table interning the symbol pairs created for the unknown input values
/// of one analyzed procedure.
///
/// The table is shared between all values of one procedure analysis so that
/// two reads of the same access path yield the same symbols. The enclosing
/// driver must serialize mutation during a transfer-function invocation.
#[derive(Debug, Default, Clone)]
pub struct SymbolTable {
    table: FnvHashMap<SymbolPath, (Symbol, Symbol)>,
}

impl SymbolTable {
    /// Create a new, empty symbol table.
    pub fn new() -> SymbolTable {
        SymbolTable {
            table: FnvHashMap::default(),
        }
    }

    /// Return the symbol pair (lower bound, upper bound) interned for `path`,
    /// creating fresh symbols from `counter` on first use.
    pub fn lookup(
        &mut self,
        proc: &ProcName,
        path: &SymbolPath,
        counter: &mut Counter,
        unsigned: bool,
    ) -> (Symbol, Symbol) {
        self.table
            .entry(path.clone())
            .or_insert_with(|| {
                let lower = Symbol::new(
                    counter.next_id(),
                    BoundEnd::LowerBound,
                    proc.clone(),
                    path.clone(),
                    unsigned,
                );
                let upper = Symbol::new(
                    counter.next_id(),
                    BoundEnd::UpperBound,
                    proc.clone(),
                    path.clone(),
                    unsigned,
                );
                (lower, upper)
            })
            .clone()
    }

    /// Return the symbol pair interned for `path`, if any.
    pub fn find(&self, path: &SymbolPath) -> Option<&(Symbol, Symbol)> {
        self.table.get(path)
    }
}
