use crate::prelude::*;
use std::fmt::Display;

/// A program variable of the analyzed procedure.
///
/// Program variables name source-level storage: locals, formals, globals and
/// the distinguished slot holding the return value of the procedure. They are
/// stable across the whole procedure, unlike [`Ident`] temporaries, which are
/// introduced by the front-end and die quickly.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Pvar {
    /// The source-level name of the variable.
    pub name: String,
    /// Set to `true` for the slot holding the return value of the procedure.
    pub is_return: bool,
}

impl Pvar {
    /// Create a new program variable with the given name.
    pub fn new<T: ToString>(name: T) -> Pvar {
        Pvar {
            name: name.to_string(),
            is_return: false,
        }
    }

    /// Create the variable denoting the return slot of the procedure.
    pub fn return_slot() -> Pvar {
        Pvar {
            name: "__return".to_string(),
            is_return: true,
        }
    }
}

impl Display for Pvar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name)
    }
}

/// An SSA-style logical temporary introduced by the front-end.
///
/// Temporaries are assigned exactly once and go out of scope at the end of
/// the instruction sequence that introduced them. The `stamp` disambiguates
/// temporaries sharing a base name.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct Ident {
    /// The base name chosen by the front-end.
    pub name: String,
    /// Disambiguating counter value.
    pub stamp: u64,
}

impl Ident {
    /// Create a new temporary identifier.
    pub fn new<T: ToString>(name: T, stamp: u64) -> Ident {
        Ident {
            name: name.to_string(),
            stamp,
        }
    }
}

impl Display for Ident {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}${}", self.name, self.stamp)
    }
}

/// The name of a procedure of the analyzed program.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct ProcName(pub String);

impl Display for ProcName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The name of a field of a struct or object type.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Clone)]
pub struct FieldName(pub String);

impl Display for FieldName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
