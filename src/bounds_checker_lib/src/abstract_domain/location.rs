use crate::intermediate_representation::{FieldName, Ident, Pvar};
use crate::prelude::*;
use derive_more::Deref;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;

/// An allocation site identifies the array object created at a program point.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum Allocsite {
    /// The site of an array allocation in the analyzed code.
    Site(Arc<AllocsiteData>),
    /// The distinguished site standing for arrays of unknown origin,
    /// e.g. arrays returned by unmodeled procedures.
    Unknown,
}

/// The data identifying a known allocation site.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub struct AllocsiteData {
    /// The program point of the allocation.
    pub tid: Tid,
}

impl Allocsite {
    /// Create the allocation site of the array allocated at the given program point.
    pub fn new(tid: Tid) -> Allocsite {
        Allocsite::Site(Arc::new(AllocsiteData { tid }))
    }

    /// Returns true for the distinguished unknown site.
    pub fn is_unknown(&self) -> bool {
        matches!(self, Allocsite::Unknown)
    }
}

impl Display for Allocsite {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Allocsite::Site(data) => write!(f, "alloc@{}", data.tid),
            Allocsite::Unknown => write!(f, "alloc@unknown"),
        }
    }
}

/// An abstract location: a symbolic name for a run-time storage cell.
///
/// Locations are totally ordered so that they can key the map-shaped domains.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum Loc {
    /// A source-level program variable.
    Var(Pvar),
    /// An SSA temporary of the front-end.
    Temp(Ident),
    /// The array object allocated at the given site. The location summarizes
    /// all cells of the array at once.
    Allocsite(Allocsite),
    /// A field projection of another location.
    Field {
        /// The location of the projected object.
        base: Arc<Loc>,
        /// The name of the projected field.
        field: FieldName,
    },
    /// The location about which nothing is known. Reads through it observe
    /// everything that was ever stored to it.
    Unknown,
}

impl Loc {
    /// Create the location of a program variable.
    pub fn of_pvar(pvar: Pvar) -> Loc {
        Loc::Var(pvar)
    }

    /// Create the location holding the value of an SSA temporary.
    pub fn of_id(id: &Ident) -> Loc {
        Loc::Temp(id.clone())
    }

    /// Create the location of the array allocated at the given site.
    pub fn of_allocsite(allocsite: Allocsite) -> Loc {
        Loc::Allocsite(allocsite)
    }

    /// Create the location of a field of `self`.
    pub fn append_field(&self, field: FieldName) -> Loc {
        Loc::Field {
            base: Arc::new(self.clone()),
            field,
        }
    }

    /// Returns true if the location is the return slot of the procedure.
    pub fn is_return(&self) -> bool {
        matches!(self, Loc::Var(pvar) if pvar.is_return)
    }

    /// Returns true when the location summarizes several concrete cells
    /// (array elements, cells of unknown origin, or fields thereof).
    /// Such locations cannot be strongly updated.
    pub fn represents_multiple_values(&self) -> bool {
        match self {
            Loc::Var(_) | Loc::Temp(_) => false,
            Loc::Allocsite(_) | Loc::Unknown => true,
            Loc::Field { base, .. } => base.represents_multiple_values(),
        }
    }
}

impl Display for Loc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Loc::Var(pvar) => write!(f, "{pvar}"),
            Loc::Temp(id) => write!(f, "{id}"),
            Loc::Allocsite(allocsite) => write!(f, "{allocsite}"),
            Loc::Field { base, field } => write!(f, "{base}.{field}"),
            Loc::Unknown => write!(f, "unknown"),
        }
    }
}

/// The result of checking how many locations a [`PowLoc`] contains.
#[derive(Debug, PartialEq, Eq, Clone)]
pub enum SingletonOrMore<'a> {
    /// The set is empty.
    Empty,
    /// The set contains exactly the returned location.
    Singleton(&'a Loc),
    /// The set contains more than one location.
    MoreThanOne,
}

/// A finite set of abstract locations.
///
/// The set forms a powerset lattice; the distinguished set containing only
/// [`Loc::Unknown`] is used where a pointer target is entirely unknown.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Default, Deref)]
#[deref(forward)]
pub struct PowLoc(Arc<BTreeSet<Loc>>);

impl PowLoc {
    /// Create an empty set of locations.
    pub fn empty() -> PowLoc {
        PowLoc::default()
    }

    /// Create the set containing only the unknown location.
    pub fn unknown() -> PowLoc {
        PowLoc::singleton(Loc::Unknown)
    }

    /// Create the set containing only the given location.
    pub fn singleton(loc: Loc) -> PowLoc {
        PowLoc(Arc::new(BTreeSet::from([loc])))
    }

    /// Add a location to the set.
    pub fn add(&mut self, loc: Loc) {
        Arc::make_mut(&mut self.0).insert(loc);
    }

    /// Returns true if the given location is contained in the set.
    pub fn mem(&self, loc: &Loc) -> bool {
        self.0.contains(loc)
    }

    /// Return the union of the two sets.
    pub fn union(&self, other: &PowLoc) -> PowLoc {
        if self.0.is_empty() {
            other.clone()
        } else if other.0.is_empty() {
            self.clone()
        } else {
            PowLoc(Arc::new(self.0.union(&other.0).cloned().collect()))
        }
    }

    /// Check whether the set is empty, a singleton, or larger.
    pub fn is_singleton_or_more(&self) -> SingletonOrMore {
        let mut iter = self.0.iter();
        match (iter.next(), iter.next()) {
            (None, _) => SingletonOrMore::Empty,
            (Some(loc), None) => SingletonOrMore::Singleton(loc),
            _ => SingletonOrMore::MoreThanOne,
        }
    }
}

impl FromIterator<Loc> for PowLoc {
    fn from_iter<I: IntoIterator<Item = Loc>>(iter: I) -> PowLoc {
        PowLoc(Arc::new(iter.into_iter().collect()))
    }
}

impl super::AbstractDomain for PowLoc {
    fn leq(&self, other: &PowLoc) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.is_subset(&other.0)
    }

    fn join(&self, other: &PowLoc) -> PowLoc {
        self.union(other)
    }
}

impl super::HasBottom for PowLoc {
    fn bot() -> PowLoc {
        PowLoc::empty()
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for PowLoc {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.iter().format(", "))
    }
}

#[cfg(test)]
mod tests {
    use super::super::{AbstractDomain, HasBottom};
    use super::*;

    fn var(name: &str) -> Loc {
        Loc::of_pvar(Pvar::new(name))
    }

    #[test]
    fn loc_kinds() {
        let x = var("x");
        assert!(!x.represents_multiple_values());
        assert!(!x.is_return());
        assert!(Loc::of_pvar(Pvar::return_slot()).is_return());

        let arr = Loc::of_allocsite(Allocsite::new(Tid::new("alloc_0")));
        assert!(arr.represents_multiple_values());
        let elem_field = arr.append_field(FieldName("len".to_string()));
        assert!(elem_field.represents_multiple_values());
        assert!(!x.append_field(FieldName("f".to_string())).represents_multiple_values());
    }

    #[test]
    fn pow_loc_lattice() {
        let singleton = PowLoc::singleton(var("x"));
        let mut larger = singleton.clone();
        larger.add(var("y"));

        assert!(PowLoc::bot().leq(&singleton));
        assert!(singleton.leq(&larger));
        assert!(!larger.leq(&singleton));
        assert_eq!(singleton.join(&larger), larger);
        assert_eq!(
            larger.is_singleton_or_more(),
            SingletonOrMore::MoreThanOne
        );
        assert_eq!(
            singleton.is_singleton_or_more(),
            SingletonOrMore::Singleton(&var("x"))
        );
    }
}
