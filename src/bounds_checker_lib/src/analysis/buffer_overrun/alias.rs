use crate::abstract_domain::{
    AbstractDomain, DomainMap, HasTop, IntersectMergeStrategy, Loc, SingletonOrMore, ValueDomain,
};
use crate::intermediate_representation::{Exp, Ident};
use crate::prelude::*;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};

/// What a temporary identifier is known to alias.
///
/// The targets form a flat lattice: two targets are ordered only when they
/// are equal. Since SSA temporaries are assigned exactly once, two memories
/// reaching the same program point can never bind the same temporary to
/// different targets; [`AliasTarget::join`] relies on this and treats unequal
/// operands as a precondition violation.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum AliasTarget {
    /// The temporary holds the current value of the location.
    Simple(Loc),
    /// The temporary holds `1` iff the container at the location is empty
    /// (its size is zero) and `0` iff it holds at least one element.
    /// Records the result of an `empty()`-style API call so that a later
    /// branch on it can refine the container size.
    Empty(Loc),
}

impl AliasTarget {
    /// Get the location the target talks about.
    pub fn loc(&self) -> &Loc {
        match self {
            AliasTarget::Simple(loc) | AliasTarget::Empty(loc) => loc,
        }
    }
}

impl AbstractDomain for AliasTarget {
    fn leq(&self, other: &AliasTarget) -> bool {
        self == other
    }

    /// Joining is only defined on equal targets; the caller must guarantee
    /// the flat-lattice precondition.
    fn join(&self, other: &AliasTarget) -> AliasTarget {
        assert_eq!(
            self, other,
            "joined two unequal alias targets; the driver violated the flat-lattice contract"
        );
        self.clone()
    }
}

impl Display for AliasTarget {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            AliasTarget::Simple(loc) => write!(f, "={loc}"),
            AliasTarget::Empty(loc) => write!(f, "=empty({loc})"),
        }
    }
}

/// The alias bindings of all live temporaries.
///
/// The map is inverted: an absent temporary aliases nothing that is known,
/// so the empty map is the top element.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct AliasMap(DomainMap<Ident, AliasTarget, IntersectMergeStrategy>);

impl Deref for AliasMap {
    type Target = DomainMap<Ident, AliasTarget, IntersectMergeStrategy>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for AliasMap {
    fn deref_mut(&mut self) -> &mut DomainMap<Ident, AliasTarget, IntersectMergeStrategy> {
        &mut self.0
    }
}

impl AliasMap {
    /// Bind the temporary to the target.
    pub fn load(&mut self, id: Ident, target: AliasTarget) {
        self.0.insert(id, target);
    }

    /// Drop every binding whose target mentions `loc`. Must be called on
    /// every write to `loc`, since the bound temporaries no longer hold its
    /// current value afterwards.
    pub fn store(&mut self, loc: &Loc) {
        if self.0.values().any(|target| target.loc() == loc) {
            self.0.retain(|_, target| target.loc() != loc);
        }
    }

    /// Look up the target of a temporary.
    pub fn find(&self, id: &Ident) -> Option<&AliasTarget> {
        self.0.get(id)
    }
}

impl AbstractDomain for AliasMap {
    fn leq(&self, other: &AliasMap) -> bool {
        self.0.leq(&other.0)
    }

    fn join(&self, other: &AliasMap) -> AliasMap {
        AliasMap(self.0.join(&other.0))
    }
}

impl HasTop for AliasMap {
    fn top() -> AliasMap {
        AliasMap::default()
    }

    fn is_top(&self) -> bool {
        self.0.is_empty()
    }
}

/// The alias attached to the return slot of the procedure: the flat lift of
/// [`AliasTarget`] with an explicit bottom and top.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub enum AliasReturn {
    /// No reachable path has set a return alias yet.
    #[default]
    Bottom,
    /// All reachable paths agree on this return alias.
    Target(AliasTarget),
    /// Reachable paths disagree.
    Top,
}

impl AliasReturn {
    /// Get the alias target, if the return alias carries one.
    pub fn find(&self) -> Option<&AliasTarget> {
        match self {
            AliasReturn::Target(target) => Some(target),
            _ => None,
        }
    }

    /// Drop the return alias if its target mentions `loc`.
    fn store(&mut self, loc: &Loc) {
        if matches!(self, AliasReturn::Target(target) if target.loc() == loc) {
            *self = AliasReturn::Top;
        }
    }
}

impl AbstractDomain for AliasReturn {
    fn leq(&self, other: &AliasReturn) -> bool {
        match (self, other) {
            (AliasReturn::Bottom, _) | (_, AliasReturn::Top) => true,
            (x, y) => x == y,
        }
    }

    fn join(&self, other: &AliasReturn) -> AliasReturn {
        match (self, other) {
            (AliasReturn::Bottom, x) | (x, AliasReturn::Bottom) => x.clone(),
            (x, y) if x == y => x.clone(),
            _ => AliasReturn::Top,
        }
    }
}

/// Alias information of one abstract memory: the per-temporary bindings and
/// the alias of the return slot.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct Alias {
    map: AliasMap,
    ret: AliasReturn,
}

impl Alias {
    /// Bind the temporary to the target.
    pub fn load(&mut self, id: Ident, target: AliasTarget) {
        self.map.load(id, target);
    }

    /// Invalidate all bindings that mention `loc`.
    pub fn store(&mut self, loc: &Loc) {
        self.map.store(loc);
        self.ret.store(loc);
    }

    /// Look up the target of a temporary.
    pub fn find(&self, id: &Ident) -> Option<&AliasTarget> {
        self.map.find(id)
    }

    /// Look up the location a temporary simply aliases, if any.
    pub fn find_simple(&self, id: &Ident) -> Option<&Loc> {
        match self.map.find(id) {
            Some(AliasTarget::Simple(loc)) => Some(loc),
            _ => None,
        }
    }

    /// Get the alias of the return slot, if any.
    pub fn find_return(&self) -> Option<&AliasTarget> {
        self.ret.find()
    }

    /// Record a store of `rhs` into `loc`: invalidate bindings mentioning
    /// `loc`, and set the return alias when a temporary aliased to a
    /// location is stored into the return slot.
    pub fn store_simple(&mut self, loc: &Loc, rhs: &Exp) {
        self.store(loc);
        if loc.is_return() {
            if let Exp::Var(id) = rhs {
                if let Some(alias_loc) = self.find_simple(id).cloned() {
                    self.ret = AliasReturn::Target(AliasTarget::Simple(alias_loc));
                }
            }
        }
    }

    /// Record that the return slot receives the result of an `empty()`-style
    /// query on the container passed as `formal`: invalidate bindings
    /// mentioning `loc`, and remember the queried container when it is
    /// uniquely determined.
    pub fn store_empty(&mut self, formal: &ValueDomain, loc: &Loc) {
        self.store(loc);
        let formal_locs = formal.get_all_locs();
        if let SingletonOrMore::Singleton(formal_loc) = formal_locs.is_singleton_or_more() {
            self.ret = AliasReturn::Target(AliasTarget::Empty(formal_loc.clone()));
        }
    }

    /// Drop the binding of a temporary that went out of scope.
    pub fn remove_temp(&mut self, id: &Ident) {
        self.map.remove(id);
    }
}

impl AbstractDomain for Alias {
    fn leq(&self, other: &Alias) -> bool {
        self.map.leq(&other.map) && self.ret.leq(&other.ret)
    }

    fn join(&self, other: &Alias) -> Alias {
        Alias {
            map: self.map.join(&other.map),
            ret: self.ret.join(&other.ret),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intermediate_representation::Pvar;

    fn loc(name: &str) -> Loc {
        Loc::Var(Pvar::new(name))
    }

    fn id(name: &str) -> Ident {
        Ident::new(name, 0)
    }

    #[test]
    fn stores_invalidate_bindings() {
        let mut alias = Alias::default();
        alias.load(id("r"), AliasTarget::Simple(loc("x")));
        assert_eq!(alias.find_simple(&id("r")), Some(&loc("x")));

        // A store to an unrelated location keeps the binding.
        alias.store(&loc("y"));
        assert!(alias.find(&id("r")).is_some());

        // A store to the aliased location drops it, including a binding that
        // was just inserted.
        alias.store(&loc("x"));
        assert!(alias.find(&id("r")).is_none());
    }

    #[test]
    fn return_alias_of_simple_store() {
        let mut alias = Alias::default();
        alias.load(id("r"), AliasTarget::Simple(loc("x")));
        let ret = Loc::Var(Pvar::return_slot());
        alias.store_simple(&ret, &Exp::Var(id("r")));
        assert_eq!(
            alias.find_return(),
            Some(&AliasTarget::Simple(loc("x")))
        );
        // Storing into the return slot again invalidates the recorded alias.
        alias.store_simple(&ret, &Exp::Const(0));
        assert_eq!(alias.find_return(), None);
    }

    #[test]
    fn return_alias_of_empty_query() {
        let mut alias = Alias::default();
        let container = ValueDomain::of_loc(loc("v"));
        alias.store_empty(&container, &Loc::Var(Pvar::return_slot()));
        assert_eq!(
            alias.find_return(),
            Some(&AliasTarget::Empty(loc("v")))
        );
    }

    #[test]
    fn join_keeps_agreeing_bindings() {
        let mut left = Alias::default();
        left.load(id("r"), AliasTarget::Simple(loc("x")));
        left.load(id("s"), AliasTarget::Simple(loc("y")));
        let mut right = Alias::default();
        right.load(id("r"), AliasTarget::Simple(loc("x")));

        let joined = left.join(&right);
        assert_eq!(joined.find_simple(&id("r")), Some(&loc("x")));
        assert!(joined.find(&id("s")).is_none());
        assert!(left.leq(&joined));
        assert!(right.leq(&joined));
        // The empty map is the top element.
        assert!(left.leq(&Alias::default()));
    }

    #[test]
    #[should_panic]
    fn joining_unequal_targets_is_a_contract_violation() {
        AliasTarget::Simple(loc("x")).join(&AliasTarget::Simple(loc("y")));
    }

    #[test]
    fn remove_temp_drops_binding() {
        let mut alias = Alias::default();
        alias.load(id("r"), AliasTarget::Simple(loc("x")));
        alias.remove_temp(&id("r"));
        assert!(alias.find(&id("r")).is_none());
    }
}
