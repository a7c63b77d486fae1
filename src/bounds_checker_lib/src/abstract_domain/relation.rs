use crate::intermediate_representation::Exp;
use crate::prelude::*;
use itertools::Itertools;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt::Display;
use std::sync::Arc;

use super::{AbstractDomain, Allocsite, HasBottom, HasTop, IntervalDomain, Loc, PowLoc};

/// A variable of the relational constraint store.
///
/// Each abstract location contributes up to three store variables: the
/// numeric value it holds, and the offset and size of the array it points to.
/// Allocation sites contribute the offset and size of their arrays.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum RelationVar {
    /// The numeric value stored at a location.
    Value(Loc),
    /// The offset of the array pointer stored at a location.
    Offset(Loc),
    /// The size of the array pointed to from a location.
    Size(Loc),
    /// The offset of pointers into the array allocated at a site.
    AllocOffset(Allocsite),
    /// The size of the array allocated at a site.
    AllocSize(Allocsite),
}

impl RelationVar {
    /// Get the location the variable talks about, if it is location-based.
    pub fn loc(&self) -> Option<&Loc> {
        match self {
            RelationVar::Value(loc) | RelationVar::Offset(loc) | RelationVar::Size(loc) => {
                Some(loc)
            }
            _ => None,
        }
    }
}

impl Display for RelationVar {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RelationVar::Value(loc) => write!(f, "{loc}"),
            RelationVar::Offset(loc) => write!(f, "{loc}.offset"),
            RelationVar::Size(loc) => write!(f, "{loc}.size"),
            RelationVar::AllocOffset(allocsite) => write!(f, "{allocsite}.offset"),
            RelationVar::AllocSize(allocsite) => write!(f, "{allocsite}.size"),
        }
    }
}

/// A relational symbol attached to an abstract value: the flat lattice over
/// constraint-store variables.
///
/// The symbol records under which store variable the value (or the offset or
/// size of the array it points to) is known to the constraint store.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum Sym {
    /// No value flows here.
    Bottom,
    /// The value is known to the store under this variable.
    Var(RelationVar),
    /// The value is not tracked relationally.
    Top,
}

impl Sym {
    /// The symbol naming the value stored at a location.
    pub fn of_loc(loc: &Loc) -> Sym {
        Sym::Var(RelationVar::Value(loc.clone()))
    }

    /// The symbol naming the array offset of the pointer stored at a location.
    pub fn of_loc_offset(loc: &Loc) -> Sym {
        Sym::Var(RelationVar::Offset(loc.clone()))
    }

    /// The symbol naming the array size of the pointer stored at a location.
    pub fn of_loc_size(loc: &Loc) -> Sym {
        Sym::Var(RelationVar::Size(loc.clone()))
    }

    /// The symbol naming the offsets into the array allocated at a site.
    pub fn of_allocsite_offset(allocsite: &Allocsite) -> Sym {
        Sym::Var(RelationVar::AllocOffset(allocsite.clone()))
    }

    /// The symbol naming the size of the array allocated at a site.
    pub fn of_allocsite_size(allocsite: &Allocsite) -> Sym {
        Sym::Var(RelationVar::AllocSize(allocsite.clone()))
    }

    /// Get the store variable of the symbol, if it has one.
    pub fn get_var(&self) -> Option<&RelationVar> {
        match self {
            Sym::Var(var) => Some(var),
            _ => None,
        }
    }
}

impl AbstractDomain for Sym {
    fn leq(&self, other: &Sym) -> bool {
        match (self, other) {
            (Sym::Bottom, _) | (_, Sym::Top) => true,
            (x, y) => x == y,
        }
    }

    fn join(&self, other: &Sym) -> Sym {
        match (self, other) {
            (Sym::Bottom, x) | (x, Sym::Bottom) => x.clone(),
            (x, y) if x == y => x.clone(),
            _ => Sym::Top,
        }
    }
}

impl HasBottom for Sym {
    fn bot() -> Sym {
        Sym::Bottom
    }

    fn is_bot(&self) -> bool {
        matches!(self, Sym::Bottom)
    }
}

impl HasTop for Sym {
    fn top() -> Sym {
        Sym::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, Sym::Top)
    }
}

impl Display for Sym {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Sym::Bottom => write!(f, "bot"),
            Sym::Var(var) => write!(f, "{var}"),
            Sym::Top => write!(f, "top"),
        }
    }
}

/// A symbolic expression over constraint-store variables.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum SymExp {
    /// A store variable.
    Var(RelationVar),
    /// An integer constant.
    Const(i128),
}

impl SymExp {
    /// Translate a front-end expression into a store expression, if it is
    /// simple enough to be represented.
    pub fn of_exp(exp: &Exp) -> Option<SymExp> {
        match exp {
            Exp::Lvar(pvar) => Some(SymExp::Var(RelationVar::Value(Loc::Var(pvar.clone())))),
            Exp::Const(value) => Some(SymExp::Const(*value)),
            _ => None,
        }
    }

    fn mentions(&self, var: &RelationVar) -> bool {
        matches!(self, SymExp::Var(own) if own == var)
    }
}

impl Display for SymExp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SymExp::Var(var) => write!(f, "{var}"),
            SymExp::Const(value) => write!(f, "{value}"),
        }
    }
}

/// One conjunct of the constraint store.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum Constraint {
    /// The variable equals the expression.
    Eq(RelationVar, SymExp),
    /// The variable is less or equal to the expression.
    Le(RelationVar, SymExp),
}

impl Constraint {
    fn mentions(&self, var: &RelationVar) -> bool {
        match self {
            Constraint::Eq(lhs, rhs) | Constraint::Le(lhs, rhs) => {
                lhs == var || rhs.mentions(var)
            }
        }
    }
}

impl Display for Constraint {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Constraint::Eq(lhs, rhs) => write!(f, "{lhs} = {rhs}"),
            Constraint::Le(lhs, rhs) => write!(f, "{lhs} <= {rhs}"),
        }
    }
}

/// A map sending callee-side constraint variables to caller-side expressions,
/// used to instantiate a callee constraint store at a call site.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct SubstMap(BTreeMap<RelationVar, SymExp>);

impl SubstMap {
    /// Create an empty substitution.
    pub fn new() -> SubstMap {
        SubstMap::default()
    }

    /// Map `var` to `target`.
    pub fn insert(&mut self, var: RelationVar, target: SymExp) {
        self.0.insert(var, target);
    }

    /// Look up the caller-side expression of a callee-side variable.
    pub fn get(&self, var: &RelationVar) -> Option<&SymExp> {
        self.0.get(var)
    }
}

/// The environment and conjuncts of a satisfiable constraint store.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ConstraintStore {
    vars: Arc<BTreeSet<RelationVar>>,
    constraints: Arc<BTreeSet<Constraint>>,
}

/// The relational constraint store: a conjunction of constraints over the
/// registered store variables, or bottom for unsatisfiable stores.
///
/// The store is deliberately syntactic: satisfiability checking is a pairwise
/// scan for contradicting conjuncts, which is enough to detect the unreachable
/// branches the transfer functions care about. Joins intersect the conjunct
/// sets, so ascending chains are finite and widening equals joining.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Relation {
    /// The unsatisfiable store.
    Bottom,
    /// A satisfiable conjunction of constraints.
    Store(ConstraintStore),
}

impl Default for Relation {
    /// The default store contains no constraints.
    fn default() -> Relation {
        Relation::empty()
    }
}

impl Relation {
    /// Create the store containing no constraints.
    pub fn empty() -> Relation {
        Relation::Store(ConstraintStore::default())
    }

    /// Returns true if the store is unsatisfiable.
    pub fn is_unsat(&self) -> bool {
        matches!(self, Relation::Bottom)
    }

    /// Iterate over the conjuncts of the store.
    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> {
        match self {
            Relation::Bottom => None,
            Relation::Store(store) => Some(store.constraints.iter()),
        }
        .into_iter()
        .flatten()
    }

    /// Add the given constraints to the store,
    /// marking the store unsatisfiable if a contradiction becomes provable.
    pub fn meet_constraints<I>(&self, constraints: I) -> Relation
    where
        I: IntoIterator<Item = Constraint>,
    {
        match self {
            Relation::Bottom => Relation::Bottom,
            Relation::Store(store) => {
                let mut merged = (*store.constraints).clone();
                merged.extend(constraints);
                if Self::has_contradiction(&merged) {
                    Relation::Bottom
                } else {
                    Relation::Store(ConstraintStore {
                        vars: store.vars.clone(),
                        constraints: Arc::new(merged),
                    })
                }
            }
        }
    }

    /// Record that the value (and array offset/size) stored at the target of
    /// a write is known under the given symbols. Writes to more than one
    /// possible target forget the targets instead.
    pub fn store_relation(&self, locs: &PowLoc, syms: &(Sym, Sym, Sym)) -> Relation {
        use super::SingletonOrMore;
        match self {
            Relation::Bottom => Relation::Bottom,
            Relation::Store(_) => match locs.is_singleton_or_more() {
                SingletonOrMore::Empty => self.clone(),
                SingletonOrMore::Singleton(loc) => {
                    let loc = loc.clone();
                    let forgotten = self.forget_locs(&PowLoc::singleton(loc.clone()));
                    let (sym_value, sym_offset, sym_size) = syms;
                    let mut new_constraints = Vec::new();
                    if let Some(var) = sym_value.get_var() {
                        new_constraints
                            .push(Constraint::Eq(RelationVar::Value(loc.clone()), SymExp::Var(var.clone())));
                    }
                    if let Some(var) = sym_offset.get_var() {
                        new_constraints
                            .push(Constraint::Eq(RelationVar::Offset(loc.clone()), SymExp::Var(var.clone())));
                    }
                    if let Some(var) = sym_size.get_var() {
                        new_constraints
                            .push(Constraint::Eq(RelationVar::Size(loc), SymExp::Var(var.clone())));
                    }
                    forgotten.meet_constraints(new_constraints)
                }
                SingletonOrMore::MoreThanOne => self.forget_locs(locs),
            },
        }
    }

    /// Forget everything the store knows about the given locations.
    pub fn forget_locs(&self, locs: &PowLoc) -> Relation {
        match self {
            Relation::Bottom => Relation::Bottom,
            Relation::Store(store) => {
                let var_is_dropped = |var: &RelationVar| var.loc().is_some_and(|loc| locs.mem(loc));
                let vars: BTreeSet<RelationVar> = store
                    .vars
                    .iter()
                    .filter(|var| !var_is_dropped(var))
                    .cloned()
                    .collect();
                let constraints: BTreeSet<Constraint> = store
                    .constraints
                    .iter()
                    .filter(|constraint| match constraint {
                        Constraint::Eq(lhs, rhs) | Constraint::Le(lhs, rhs) => {
                            !var_is_dropped(lhs)
                                && !matches!(rhs, SymExp::Var(var) if var_is_dropped(var))
                        }
                    })
                    .cloned()
                    .collect();
                Relation::Store(ConstraintStore {
                    vars: Arc::new(vars),
                    constraints: Arc::new(constraints),
                })
            }
        }
    }

    /// Register the store variables of a formal parameter.
    pub fn init_param(&self, loc: &Loc) -> Relation {
        match self {
            Relation::Bottom => Relation::Bottom,
            Relation::Store(store) => {
                let mut vars = (*store.vars).clone();
                vars.insert(RelationVar::Value(loc.clone()));
                vars.insert(RelationVar::Offset(loc.clone()));
                vars.insert(RelationVar::Size(loc.clone()));
                Relation::Store(ConstraintStore {
                    vars: Arc::new(vars),
                    constraints: store.constraints.clone(),
                })
            }
        }
    }

    /// Register the store variables of a fresh array allocation and record
    /// its constant offset and size where known. `size_exp` optionally names
    /// the source expression of the size.
    pub fn init_array(
        &self,
        allocsite: &Allocsite,
        offset: &IntervalDomain,
        size: &IntervalDomain,
        size_exp: Option<&SymExp>,
    ) -> Relation {
        match self {
            Relation::Bottom => Relation::Bottom,
            Relation::Store(store) => {
                let mut vars = (*store.vars).clone();
                vars.insert(RelationVar::AllocOffset(allocsite.clone()));
                vars.insert(RelationVar::AllocSize(allocsite.clone()));
                let registered = Relation::Store(ConstraintStore {
                    vars: Arc::new(vars),
                    constraints: store.constraints.clone(),
                });
                let mut constraints = Vec::new();
                if let Ok(offset) = offset.try_to_i64() {
                    constraints.push(Constraint::Eq(
                        RelationVar::AllocOffset(allocsite.clone()),
                        SymExp::Const(offset as i128),
                    ));
                }
                if let Ok(size) = size.try_to_i64() {
                    constraints.push(Constraint::Eq(
                        RelationVar::AllocSize(allocsite.clone()),
                        SymExp::Const(size as i128),
                    ));
                }
                if let Some(size_exp) = size_exp {
                    constraints.push(Constraint::Eq(
                        RelationVar::AllocSize(allocsite.clone()),
                        size_exp.clone(),
                    ));
                }
                registered.meet_constraints(constraints)
            }
        }
    }

    /// Substitute callee-side variables by caller-side expressions.
    /// Conjuncts that leave the representable fragment are dropped;
    /// conjuncts that become provably false make the store unsatisfiable.
    pub fn subst(&self, map: &SubstMap) -> Relation {
        let store = match self {
            Relation::Bottom => return Relation::Bottom,
            Relation::Store(store) => store,
        };
        let subst_exp = |exp: &SymExp| match exp {
            SymExp::Var(var) => map.get(var).cloned().unwrap_or_else(|| exp.clone()),
            SymExp::Const(_) => exp.clone(),
        };
        let mut constraints = BTreeSet::new();
        for constraint in store.constraints.iter() {
            let (lhs, rhs, is_eq) = match constraint {
                Constraint::Eq(lhs, rhs) => (lhs, rhs, true),
                Constraint::Le(lhs, rhs) => (lhs, rhs, false),
            };
            let rhs = subst_exp(rhs);
            let lhs = map.get(lhs).cloned().unwrap_or(SymExp::Var(lhs.clone()));
            match (lhs, rhs) {
                (SymExp::Var(lhs), rhs) => {
                    constraints.insert(if is_eq {
                        Constraint::Eq(lhs, rhs)
                    } else {
                        Constraint::Le(lhs, rhs)
                    });
                }
                (SymExp::Const(lhs), SymExp::Const(rhs)) => {
                    let still_holds = if is_eq { lhs == rhs } else { lhs <= rhs };
                    if !still_holds {
                        return Relation::Bottom;
                    }
                }
                (SymExp::Const(lhs), SymExp::Var(rhs)) => {
                    if is_eq {
                        constraints.insert(Constraint::Eq(rhs, SymExp::Const(lhs)));
                    }
                    // A constant lower bound on a variable is not representable; drop it.
                }
            }
        }
        let vars: BTreeSet<RelationVar> = store
            .vars
            .iter()
            .map(|var| match map.get(var) {
                Some(SymExp::Var(target)) => target.clone(),
                _ => var.clone(),
            })
            .collect();
        if Self::has_contradiction(&constraints) {
            Relation::Bottom
        } else {
            Relation::Store(ConstraintStore {
                vars: Arc::new(vars),
                constraints: Arc::new(constraints),
            })
        }
    }

    /// Instantiate a callee store at a call site: substitute the callee
    /// constraints into the caller's vocabulary and conjoin them with the
    /// caller store. A bottom callee leaves the caller unchanged (the callee
    /// summary carries no reachable exit state to propagate).
    pub fn instantiate(map: &SubstMap, caller: &Relation, callee: &Relation) -> Relation {
        match callee {
            Relation::Bottom => caller.clone(),
            Relation::Store(_) => {
                let instantiated = callee.subst(map);
                match instantiated {
                    Relation::Bottom => Relation::Bottom,
                    Relation::Store(store) => {
                        let met =
                            caller.meet_constraints(store.constraints.iter().cloned());
                        match met {
                            Relation::Store(met_store) => {
                                let vars: BTreeSet<RelationVar> =
                                    met_store.vars.union(&store.vars).cloned().collect();
                                Relation::Store(ConstraintStore {
                                    vars: Arc::new(vars),
                                    constraints: met_store.constraints,
                                })
                            }
                            bottom => bottom,
                        }
                    }
                }
            }
        }
    }

    /// Pairwise scan for contradicting conjuncts.
    fn has_contradiction(constraints: &BTreeSet<Constraint>) -> bool {
        for constraint in constraints.iter() {
            match constraint {
                Constraint::Eq(var, SymExp::Const(value)) => {
                    for other in constraints.iter() {
                        match other {
                            Constraint::Eq(other_var, SymExp::Const(other_value))
                                if other_var == var && other_value != value =>
                            {
                                return true;
                            }
                            Constraint::Le(other_var, SymExp::Const(upper))
                                if other_var == var && value > upper =>
                            {
                                return true;
                            }
                            _ => (),
                        }
                    }
                }
                _ => (),
            }
        }
        false
    }
}

impl AbstractDomain for Relation {
    /// A store with more conjuncts describes fewer states and is smaller.
    fn leq(&self, other: &Relation) -> bool {
        match (self, other) {
            (Relation::Bottom, _) => true,
            (_, Relation::Bottom) => false,
            (Relation::Store(own), Relation::Store(other)) => {
                other.constraints.is_subset(&own.constraints)
            }
        }
    }

    /// Joining keeps the conjuncts common to both stores.
    fn join(&self, other: &Relation) -> Relation {
        match (self, other) {
            (Relation::Bottom, x) | (x, Relation::Bottom) => x.clone(),
            (Relation::Store(own), Relation::Store(other)) => {
                let constraints: BTreeSet<Constraint> = own
                    .constraints
                    .intersection(&other.constraints)
                    .cloned()
                    .collect();
                let vars: BTreeSet<RelationVar> =
                    own.vars.union(&other.vars).cloned().collect();
                Relation::Store(ConstraintStore {
                    vars: Arc::new(vars),
                    constraints: Arc::new(constraints),
                })
            }
        }
    }
}

impl HasBottom for Relation {
    fn bot() -> Relation {
        Relation::Bottom
    }

    fn is_bot(&self) -> bool {
        matches!(self, Relation::Bottom)
    }
}

impl Display for Relation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Relation::Bottom => write!(f, "unsat"),
            Relation::Store(store) => {
                write!(f, "{{{}}}", store.constraints.iter().format(" /\\ "))
            }
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

    #[test]
    fn meet_detects_contradictions() {
        let store = Relation::empty().meet_constraints([Constraint::Eq(
            RelationVar::Value(loc("x")),
            SymExp::Const(1),
        )]);
        assert!(!store.is_unsat());
        let contradicted = store.meet_constraints([Constraint::Eq(
            RelationVar::Value(loc("x")),
            SymExp::Const(2),
        )]);
        assert!(contradicted.is_unsat());
    }

    #[test]
    fn store_forgets_overwritten_targets() {
        let store = Relation::empty().meet_constraints([Constraint::Eq(
            RelationVar::Value(loc("x")),
            SymExp::Const(1),
        )]);
        let overwritten = store.store_relation(
            &PowLoc::singleton(loc("x")),
            &(Sym::of_loc(&loc("y")), Sym::Bottom, Sym::Bottom),
        );
        let constraints: Vec<_> = overwritten.constraints().cloned().collect();
        assert_eq!(
            constraints,
            vec![Constraint::Eq(
                RelationVar::Value(loc("x")),
                SymExp::Var(RelationVar::Value(loc("y")))
            )]
        );
    }

    #[test]
    fn instantiate_substitutes_callee_constraints() {
        let callee = Relation::empty().meet_constraints([Constraint::Eq(
            RelationVar::Value(loc("formal")),
            SymExp::Const(7),
        )]);
        let mut map = SubstMap::new();
        map.insert(
            RelationVar::Value(loc("formal")),
            SymExp::Var(RelationVar::Value(loc("actual"))),
        );
        let caller = Relation::empty();
        let instantiated = Relation::instantiate(&map, &caller, &callee);
        let constraints: Vec<_> = instantiated.constraints().cloned().collect();
        assert_eq!(
            constraints,
            vec![Constraint::Eq(
                RelationVar::Value(loc("actual")),
                SymExp::Const(7)
            )]
        );
        // A bottom callee summary leaves the caller unchanged.
        let unchanged = Relation::instantiate(&map, &caller, &Relation::Bottom);
        assert_eq!(unchanged, caller);
    }

    #[test]
    fn join_intersects_conjuncts() {
        let left = Relation::empty().meet_constraints([
            Constraint::Eq(RelationVar::Value(loc("x")), SymExp::Const(1)),
            Constraint::Eq(RelationVar::Value(loc("y")), SymExp::Const(2)),
        ]);
        let right = Relation::empty().meet_constraints([Constraint::Eq(
            RelationVar::Value(loc("x")),
            SymExp::Const(1),
        )]);
        let joined = left.join(&right);
        assert!(left.leq(&joined));
        assert!(right.leq(&joined));
        assert_eq!(joined.constraints().count(), 1);
    }
}
