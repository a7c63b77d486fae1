use crate::abstract_domain::{
    AbstractDomain, Allocsite, Constraint, DomainMap, HasBottom, IntervalDomain, Loc,
    NonNegativePolynomial, PowLoc, Relation, SingletonOrMore, SubstMap, Sym, SymExp,
    UnionMergeStrategy, ValueDomain,
};
use crate::intermediate_representation::{Exp, Ident, ProcName, UnOpType};
use crate::prelude::*;
use crate::utils::debug::ToJsonCompact;
use crate::utils::log::{Config, Diagnostics};
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};
use std::sync::Arc;

use super::{Alias, AliasTarget, LatestPrune, PrunePairs};


/// The set of locations known to live on the current stack frame.
///
/// Membership decides the read default of a location: an untracked stack
/// location holds no value yet (bottom), while an untracked heap location
/// holds an arbitrary number.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct StackLocs(Arc<BTreeSet<Loc>>);

impl StackLocs {
    /// Add a location to the set.
    pub fn add(&mut self, loc: Loc) {
        Arc::make_mut(&mut self.0).insert(loc);
    }

    /// Remove a location from the set.
    fn remove(&mut self, loc: &Loc) {
        if self.0.contains(loc) {
            Arc::make_mut(&mut self.0).remove(loc);
        }
    }

    /// Returns true if the location is in the set.
    pub fn contains(&self, loc: &Loc) -> bool {
        self.0.contains(loc)
    }

    /// Iterate over the locations of the set.
    pub fn iter(&self) -> impl Iterator<Item = &Loc> {
        self.0.iter()
    }
}

impl AbstractDomain for StackLocs {
    fn leq(&self, other: &StackLocs) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.is_subset(&other.0)
    }

    fn join(&self, other: &StackLocs) -> StackLocs {
        if self == other {
            self.clone()
        } else {
            StackLocs(Arc::new(self.0.union(&other.0).cloned().collect()))
        }
    }
}

impl HasBottom for StackLocs {
    fn bot() -> StackLocs {
        StackLocs::default()
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for StackLocs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.iter().format(", "))
    }
}

/// The per-location value map of the abstract memory.
///
/// Absent entries denote bottom for stack locations and an unconstrained
/// numeric cell for heap locations; the read policy lives in [`State`].
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct PureMemory(DomainMap<Loc, ValueDomain, UnionMergeStrategy>);

impl Deref for PureMemory {
    type Target = DomainMap<Loc, ValueDomain, UnionMergeStrategy>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PureMemory {
    fn deref_mut(&mut self) -> &mut DomainMap<Loc, ValueDomain, UnionMergeStrategy> {
        &mut self.0
    }
}

impl PureMemory {
    /// The product of the interval ranges of all values whose location
    /// passes `filter`, top-lifted. Used to bound loop trip counts.
    pub fn range<F>(&self, filter: F) -> NonNegativePolynomial
    where
        F: Fn(&Loc) -> bool,
    {
        self.0
            .iter()
            .filter(|(loc, _)| filter(loc))
            .fold(NonNegativePolynomial::one(), |acc, (_, value)| {
                acc.mult(&NonNegativePolynomial::of_interval_range(value.get_itv()))
            })
    }
}

impl AbstractDomain for PureMemory {
    fn leq(&self, other: &PureMemory) -> bool {
        self.0.leq(&other.0)
    }

    fn join(&self, other: &PureMemory) -> PureMemory {
        PureMemory(self.0.join(&other.0))
    }

    fn widen(&self, other: &PureMemory, num_iters: u64) -> PureMemory {
        PureMemory(self.0.widen(&other.0, num_iters))
    }
}

impl HasBottom for PureMemory {
    fn bot() -> PureMemory {
        PureMemory::default()
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }
}

/// The working abstract memory of a reachable program point.
///
/// Transfer functions clone the incoming state and mutate the clone; the
/// map- and set-shaped components share structure, so cloning is cheap and
/// earlier snapshots stay valid for the fixed-point engine.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct State {
    stack_locs: StackLocs,
    mem_pure: PureMemory,
    alias: Alias,
    latest_prune: LatestPrune,
    relation: Relation,
}

impl State {
    /// The state at procedure entry: nothing is tracked yet.
    pub fn new() -> State {
        State {
            stack_locs: StackLocs::default(),
            mem_pure: PureMemory::default(),
            alias: Alias::default(),
            latest_prune: LatestPrune::Top,
            relation: Relation::empty(),
        }
    }

    /// Get the stack-location set of the state.
    pub fn stack_locs(&self) -> &StackLocs {
        &self.stack_locs
    }

    /// Get the per-location value map of the state.
    pub fn mem_pure(&self) -> &PureMemory {
        &self.mem_pure
    }

    /// Get the alias information of the state.
    pub fn alias(&self) -> &Alias {
        &self.alias
    }

    /// Get the branch-condition record of the state.
    pub fn latest_prune(&self) -> &LatestPrune {
        &self.latest_prune
    }

    /// Returns true if the location lives on the current stack frame.
    pub fn is_stack_loc(&self, loc: &Loc) -> bool {
        self.stack_locs.contains(loc)
    }

    /// Raw lookup of the value stored at a location.
    pub fn find_opt(&self, loc: &Loc) -> Option<&ValueDomain> {
        self.mem_pure.get(loc)
    }

    /// Read a stack location. An untracked stack cell holds no value.
    pub fn find_stack(&self, loc: &Loc) -> ValueDomain {
        self.find_opt(loc).cloned().unwrap_or_else(ValueDomain::bot)
    }

    /// Read a heap location. An untracked heap cell holds an arbitrary
    /// number, but provably no pointer.
    pub fn find_heap(&self, loc: &Loc) -> ValueDomain {
        self.find_opt(loc)
            .cloned()
            .unwrap_or_else(ValueDomain::top_interval)
    }

    /// Read a location with the default matching its kind.
    pub fn find(&self, loc: &Loc) -> ValueDomain {
        if self.is_stack_loc(loc) {
            self.find_stack(loc)
        } else {
            self.find_heap(loc)
        }
    }

    /// The join of the values of all locations in the set.
    pub fn find_set(&self, locs: &PowLoc) -> ValueDomain {
        locs.iter()
            .fold(ValueDomain::bot(), |acc, loc| acc.join(&self.find(loc)))
    }

    /// Register `loc` as a stack location holding `value`.
    pub fn add_stack(&mut self, loc: Loc, value: ValueDomain) {
        self.stack_locs.add(loc.clone());
        self.mem_pure.insert(loc, value);
    }

    /// Register `loc` as a stack location without binding a value.
    pub fn add_stack_loc(&mut self, loc: Loc) {
        self.stack_locs.add(loc);
    }

    /// Overwrite the value of an already-registered stack location.
    pub fn replace_stack(&mut self, loc: Loc, value: ValueDomain) {
        self.mem_pure.insert(loc, value);
    }

    /// Store `value` to the heap location `loc`, materializing the
    /// relational-store symbols under which the stored value is known.
    pub fn add_heap(&mut self, loc: Loc, value: ValueDomain) {
        let value = value.with_symbols_of_loc(&loc);
        self.mem_pure.insert(loc, value);
    }

    /// Returns true if a write to the location set may replace instead of
    /// join: the set must be a single location that is not a summary of
    /// several concrete cells.
    pub fn can_strong_update(&self, locs: &PowLoc) -> bool {
        match locs.is_singleton_or_more() {
            SingletonOrMore::Singleton(loc) => !loc.represents_multiple_values(),
            _ => false,
        }
    }

    /// Replacement write of `value` to every location of the set.
    pub fn strong_update(&mut self, locs: &PowLoc, value: ValueDomain) {
        for loc in locs.iter() {
            if self.is_stack_loc(loc) {
                self.replace_stack(loc.clone(), value.clone());
            } else {
                self.add_heap(loc.clone(), value.clone());
            }
        }
    }

    /// Join-in write of `value` to every location of the set.
    pub fn weak_update(&mut self, locs: &PowLoc, value: ValueDomain) {
        for loc in locs.iter() {
            let joined = self.find(loc).join(&value);
            if self.is_stack_loc(loc) {
                self.replace_stack(loc.clone(), joined);
            } else {
                self.add_heap(loc.clone(), joined);
            }
        }
    }

    /// Write `value` to the location set, strongly when the set is a single
    /// must-alias target and weakly otherwise.
    pub fn update_mem(&mut self, locs: &PowLoc, value: ValueDomain, diag: &mut Diagnostics) {
        if self.can_strong_update(locs) {
            self.strong_update(locs, value);
        } else {
            diag.debug_note(|| format!("weak update for {locs}"));
            self.weak_update(locs, value);
        }
    }

    /// Apply `f` to the current value of every location of the set and store
    /// the result back, with the read/write defaults of the location kind.
    pub fn transform_mem<F>(&mut self, f: F, locs: &PowLoc)
    where
        F: Fn(&ValueDomain) -> ValueDomain,
    {
        for loc in locs.iter() {
            if self.is_stack_loc(loc) {
                let transformed = f(&self.find_stack(loc));
                self.replace_stack(loc.clone(), transformed);
            } else {
                let transformed = f(&self.find_heap(loc));
                self.add_heap(loc.clone(), transformed);
            }
        }
    }

    /// Record the result of a call to an unmodeled procedure: the temporary
    /// receives an unknown value, and the same pollution is joined into the
    /// unknown heap location, where later reads through unknown pointers
    /// observe it.
    pub fn add_unknown_from(&mut self, id: &Ident, callee: Option<&ProcName>, location: &Tid) {
        let value = ValueDomain::unknown_from(callee, location);
        self.add_stack(Loc::of_id(id), value.clone());
        let polluted = match self.find_opt(&Loc::Unknown) {
            Some(existing) => existing.join(&value),
            None => value,
        };
        self.add_heap(Loc::Unknown, polluted);
    }

    /// Record the refinements of the branch condition that was just evaluated.
    pub fn set_prune_pairs(&mut self, pairs: PrunePairs) {
        self.latest_prune = LatestPrune::Latest(pairs);
    }

    /// Track the store `lhs := rhs` in the branch-condition record: storing
    /// the constants `1` or `0` to a program variable right after a pruning
    /// attaches the variable to the recorded refinements. Every other store
    /// invalidates the record.
    ///
    /// Transfer functions must call this on every store, after updating the
    /// memory itself.
    pub fn update_latest_prune(&mut self, lhs: &Exp, rhs: &Exp) {
        let previous = std::mem::take(&mut self.latest_prune);
        self.latest_prune = match (lhs, rhs, previous) {
            (Exp::Lvar(pvar), Exp::Const(1), LatestPrune::Latest(pairs)) => {
                LatestPrune::TrueBranch(pvar.clone(), pairs)
            }
            (Exp::Lvar(pvar), Exp::Const(0), LatestPrune::Latest(pairs)) => {
                LatestPrune::FalseBranch(pvar.clone(), pairs)
            }
            _ => LatestPrune::Top,
        };
    }

    /// Replay memorized branch refinements when the boolean variable that
    /// carries them is tested again: if the condition is a temporary (or its
    /// logical negation) that aliases the recorded variable, fold the
    /// matching refinement side back into the memory.
    ///
    /// Returns the replayed refinements, empty if none applied.
    pub fn apply_latest_prune(&mut self, cond: &Exp, diag: &mut Diagnostics) -> PrunePairs {
        let extracted = match (&self.latest_prune, cond) {
            (LatestPrune::Branches(pvar, true_pairs, _), Exp::Var(id)) => {
                Some((pvar.clone(), id.clone(), true_pairs.clone()))
            }
            (
                LatestPrune::Branches(pvar, _, false_pairs),
                Exp::UnOp {
                    op: UnOpType::LogicalNot,
                    arg,
                },
            ) => match arg.as_ref() {
                Exp::Var(id) => Some((pvar.clone(), id.clone(), false_pairs.clone())),
                _ => None,
            },
            _ => None,
        };
        let Some((pvar, id, pairs)) = extracted else {
            return PrunePairs::empty();
        };
        let aliases_pruned_var = matches!(
            self.alias.find_simple(&id),
            Some(Loc::Var(aliased)) if *aliased == pvar
        );
        if aliases_pruned_var {
            for (loc, value) in pairs.iter() {
                self.update_mem(&PowLoc::singleton(loc.clone()), value.clone(), diag);
            }
            pairs
        } else {
            PrunePairs::empty()
        }
    }

    /// The smallest set of locations containing `roots` that is closed under
    /// following stored pointers and field projections. Used to restrict
    /// summaries to the locations reachable from formals and globals.
    pub fn get_reachable_locs_from(&self, roots: &PowLoc) -> PowLoc {
        let mut reachable: BTreeSet<Loc> = BTreeSet::new();
        let mut worklist: Vec<Loc> = roots.iter().cloned().collect();
        while let Some(loc) = worklist.pop() {
            if !reachable.insert(loc.clone()) {
                continue;
            }
            for field_loc in self.mem_pure.keys() {
                if let Loc::Field { base, .. } = field_loc {
                    if **base == loc {
                        worklist.push(field_loc.clone());
                    }
                }
            }
            if let Some(value) = self.find_opt(&loc) {
                worklist.extend(value.get_all_locs().iter().cloned());
            }
        }
        reachable.into_iter().collect()
    }

    /// Drop the tracked values of all locations not reachable from `roots`.
    pub fn forget_unreachable_locs(&mut self, roots: &PowLoc) {
        let reachable = self.get_reachable_locs_from(roots);
        if self.mem_pure.keys().all(|loc| reachable.mem(loc)) {
            return;
        }
        self.mem_pure.retain(|loc, _| reachable.mem(loc));
    }

    /// Remove SSA temporaries that went out of scope from the alias map, the
    /// value map and the stack-location set.
    pub fn remove_temps(&mut self, ids: &[Ident]) {
        for id in ids {
            self.alias.remove_temp(id);
            let loc = Loc::of_id(id);
            self.mem_pure.remove(&loc);
            self.stack_locs.remove(&loc);
        }
    }

    /// Bind the temporary to the target in the alias map.
    pub fn load_alias(&mut self, id: Ident, target: AliasTarget) {
        self.alias.load(id, target);
    }

    /// Record a store of `rhs` into `loc` in the alias map.
    pub fn store_simple_alias(&mut self, loc: &Loc, rhs: &Exp) {
        self.alias.store_simple(loc, rhs);
    }

    /// Record an `empty()`-style query result in the alias map.
    pub fn store_empty_alias(&mut self, formal: &ValueDomain, loc: &Loc) {
        self.alias.store_empty(formal, loc);
    }

    /// Get the relational constraint store of the state.
    pub fn get_relation(&self) -> &Relation {
        &self.relation
    }

    /// Returns true if the constraint store is unsatisfiable, i.e. the
    /// program point cannot actually be reached with the assumed relations.
    pub fn is_relation_unsat(&self) -> bool {
        self.relation.is_unsat()
    }

    /// Conjoin constraints into the store.
    pub fn meet_constraints<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = Constraint>,
    {
        self.relation = self.relation.meet_constraints(constraints);
    }

    /// Record a store in the constraint store.
    pub fn store_relation(&mut self, locs: &PowLoc, syms: &(Sym, Sym, Sym)) {
        self.relation = self.relation.store_relation(locs, syms);
    }

    /// Forget everything the constraint store knows about the locations.
    pub fn forget_locs(&mut self, locs: &PowLoc) {
        self.relation = self.relation.forget_locs(locs);
    }

    /// Register a formal parameter in the constraint store.
    pub fn init_param_relation(&mut self, loc: &Loc) {
        self.relation = self.relation.init_param(loc);
    }

    /// Register a fresh array allocation in the constraint store.
    pub fn init_array_relation(
        &mut self,
        allocsite: &Allocsite,
        offset: &IntervalDomain,
        size: &IntervalDomain,
        size_exp: Option<&SymExp>,
    ) {
        self.relation = self.relation.init_array(allocsite, offset, size, size_exp);
    }

    /// Instantiate a callee constraint store into this state.
    pub fn instantiate_relation(&mut self, subst_map: &SubstMap, callee: &Relation) {
        self.relation = Relation::instantiate(subst_map, &self.relation, callee);
    }

    /// Render the state, including the parts enabled by the configuration:
    /// provenance traces at debug level 1 and the relational store when the
    /// relational domain is switched on.
    pub fn render(&self, config: &Config) -> String {
        let mut rendered = format!(
            "stack: {}, mem: {{{}}}",
            self.stack_locs,
            self.mem_pure
                .iter()
                .map(|(loc, value)| if config.debug_level >= 1 {
                    format!("{loc} -> {value} {}", value.get_traces())
                } else {
                    format!("{loc} -> {value}")
                })
                .format(", ")
        );
        if config.relational_domain_enabled {
            rendered.push_str(&format!(", relation: {}", self.relation));
        }
        rendered
    }
}

impl AbstractDomain for State {
    fn leq(&self, other: &State) -> bool {
        if self == other {
            return true;
        }
        self.stack_locs.leq(&other.stack_locs)
            && self.mem_pure.leq(&other.mem_pure)
            && self.alias.leq(&other.alias)
            && self.latest_prune.leq(&other.latest_prune)
            && self.relation.leq(&other.relation)
    }

    fn join(&self, other: &State) -> State {
        if self == other {
            return self.clone();
        }
        State {
            stack_locs: self.stack_locs.join(&other.stack_locs),
            mem_pure: self.mem_pure.join(&other.mem_pure),
            alias: self.alias.join(&other.alias),
            latest_prune: self.latest_prune.join(&other.latest_prune),
            relation: self.relation.join(&other.relation),
        }
    }

    fn widen(&self, other: &State, num_iters: u64) -> State {
        if self == other {
            return self.clone();
        }
        State {
            stack_locs: self.stack_locs.join(&other.stack_locs),
            mem_pure: self.mem_pure.widen(&other.mem_pure, num_iters),
            alias: self.alias.join(&other.alias),
            latest_prune: self.latest_prune.widen(&other.latest_prune, num_iters),
            relation: self.relation.widen(&other.relation, num_iters),
        }
    }
}

impl Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(&Config::default()))
    }
}

impl ToJsonCompact for State {
    fn to_json_compact(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        map.insert("stack_locs".to_string(), self.stack_locs.to_string().into());
        map.insert(
            "mem_pure".to_string(),
            serde_json::Value::Object(
                self.mem_pure
                    .iter()
                    .map(|(loc, value)| (loc.to_string(), value.to_json_compact()))
                    .collect(),
            ),
        );
        map.insert(
            "latest_prune".to_string(),
            self.latest_prune.to_string().into(),
        );
        map.insert("relation".to_string(), self.relation.to_string().into());
        serde_json::Value::Object(map)
    }
}

/// The abstract memory attached to a program point: either the point is
/// unreachable, or a [`State`] over-approximates the concrete states that
/// may reach it.
///
/// All operations of [`State`] are lifted: reads on an unreachable memory
/// return the bottom of their result domain, writes are no-ops.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum Memory {
    /// No concrete state reaches the program point.
    Unreachable,
    /// The program point may be reached by the described states.
    Reachable(State),
}

impl Memory {
    /// The memory at procedure entry.
    pub fn init() -> Memory {
        Memory::Reachable(State::new())
    }

    /// Get the underlying state, if the memory is reachable.
    pub fn as_state(&self) -> Option<&State> {
        match self {
            Memory::Reachable(state) => Some(state),
            Memory::Unreachable => None,
        }
    }

    fn on_state<R>(&self, default: R, f: impl FnOnce(&State) -> R) -> R {
        match self {
            Memory::Reachable(state) => f(state),
            Memory::Unreachable => default,
        }
    }

    fn on_state_mut(&mut self, f: impl FnOnce(&mut State)) {
        if let Memory::Reachable(state) = self {
            f(state)
        }
    }

    /// Returns false on unreachable memories.
    pub fn is_stack_loc(&self, loc: &Loc) -> bool {
        self.on_state(false, |state| state.is_stack_loc(loc))
    }

    /// Returns `None` on unreachable memories.
    pub fn find_opt(&self, loc: &Loc) -> Option<&ValueDomain> {
        self.as_state().and_then(|state| state.find_opt(loc))
    }

    /// Returns the bottom value on unreachable memories.
    pub fn find_stack(&self, loc: &Loc) -> ValueDomain {
        self.on_state(ValueDomain::bot(), |state| state.find_stack(loc))
    }

    /// Returns the bottom value on unreachable memories.
    pub fn find_heap(&self, loc: &Loc) -> ValueDomain {
        self.on_state(ValueDomain::bot(), |state| state.find_heap(loc))
    }

    /// Returns the bottom value on unreachable memories.
    pub fn find(&self, loc: &Loc) -> ValueDomain {
        self.on_state(ValueDomain::bot(), |state| state.find(loc))
    }

    /// Returns the bottom value on unreachable memories.
    pub fn find_set(&self, locs: &PowLoc) -> ValueDomain {
        self.on_state(ValueDomain::bot(), |state| state.find_set(locs))
    }

    /// Returns `None` on unreachable memories.
    pub fn find_ret_alias(&self) -> Option<&AliasTarget> {
        self.as_state().and_then(|state| state.alias().find_return())
    }

    /// No-op on unreachable memories.
    pub fn add_stack(&mut self, loc: Loc, value: ValueDomain) {
        self.on_state_mut(|state| state.add_stack(loc, value));
    }

    /// No-op on unreachable memories.
    pub fn add_stack_loc(&mut self, loc: Loc) {
        self.on_state_mut(|state| state.add_stack_loc(loc));
    }

    /// No-op on unreachable memories.
    pub fn add_heap(&mut self, loc: Loc, value: ValueDomain) {
        self.on_state_mut(|state| state.add_heap(loc, value));
    }

    /// Returns false on unreachable memories.
    pub fn can_strong_update(&self, locs: &PowLoc) -> bool {
        self.on_state(false, |state| state.can_strong_update(locs))
    }

    /// No-op on unreachable memories.
    pub fn strong_update(&mut self, locs: &PowLoc, value: ValueDomain) {
        self.on_state_mut(|state| state.strong_update(locs, value));
    }

    /// No-op on unreachable memories.
    pub fn weak_update(&mut self, locs: &PowLoc, value: ValueDomain) {
        self.on_state_mut(|state| state.weak_update(locs, value));
    }

    /// No-op on unreachable memories.
    pub fn update_mem(&mut self, locs: &PowLoc, value: ValueDomain, diag: &mut Diagnostics) {
        self.on_state_mut(|state| state.update_mem(locs, value, diag));
    }

    /// No-op on unreachable memories.
    pub fn transform_mem<F>(&mut self, f: F, locs: &PowLoc)
    where
        F: Fn(&ValueDomain) -> ValueDomain,
    {
        self.on_state_mut(|state| state.transform_mem(f, locs));
    }

    /// No-op on unreachable memories.
    pub fn add_unknown_from(&mut self, id: &Ident, callee: Option<&ProcName>, location: &Tid) {
        self.on_state_mut(|state| state.add_unknown_from(id, callee, location));
    }

    /// No-op on unreachable memories.
    pub fn set_prune_pairs(&mut self, pairs: PrunePairs) {
        self.on_state_mut(|state| state.set_prune_pairs(pairs));
    }

    /// Returns the top record on unreachable memories.
    pub fn get_latest_prune(&self) -> LatestPrune {
        self.on_state(LatestPrune::Top, |state| state.latest_prune().clone())
    }

    /// No-op on unreachable memories.
    pub fn update_latest_prune(&mut self, lhs: &Exp, rhs: &Exp) {
        self.on_state_mut(|state| state.update_latest_prune(lhs, rhs));
    }

    /// Returns the empty refinement record on unreachable memories.
    pub fn apply_latest_prune(&mut self, cond: &Exp, diag: &mut Diagnostics) -> PrunePairs {
        match self {
            Memory::Reachable(state) => state.apply_latest_prune(cond, diag),
            Memory::Unreachable => PrunePairs::empty(),
        }
    }

    /// Returns the empty set on unreachable memories.
    pub fn get_reachable_locs_from(&self, roots: &PowLoc) -> PowLoc {
        self.on_state(PowLoc::empty(), |state| {
            state.get_reachable_locs_from(roots)
        })
    }

    /// No-op on unreachable memories.
    pub fn forget_unreachable_locs(&mut self, roots: &PowLoc) {
        self.on_state_mut(|state| state.forget_unreachable_locs(roots));
    }

    /// No-op on unreachable memories.
    pub fn remove_temps(&mut self, ids: &[Ident]) {
        self.on_state_mut(|state| state.remove_temps(ids));
    }

    /// No-op on unreachable memories.
    pub fn load_alias(&mut self, id: Ident, target: AliasTarget) {
        self.on_state_mut(|state| state.load_alias(id, target));
    }

    /// No-op on unreachable memories.
    pub fn store_simple_alias(&mut self, loc: &Loc, rhs: &Exp) {
        self.on_state_mut(|state| state.store_simple_alias(loc, rhs));
    }

    /// No-op on unreachable memories.
    pub fn store_empty_alias(&mut self, formal: &ValueDomain, loc: &Loc) {
        self.on_state_mut(|state| state.store_empty_alias(formal, loc));
    }

    /// Returns the unsatisfiable store on unreachable memories.
    pub fn get_relation(&self) -> Relation {
        self.on_state(Relation::bot(), |state| state.get_relation().clone())
    }

    /// Unreachable memories have no satisfiable relations.
    pub fn is_relation_unsat(&self) -> bool {
        self.on_state(true, |state| state.is_relation_unsat())
    }

    /// No-op on unreachable memories.
    pub fn meet_constraints<I>(&mut self, constraints: I)
    where
        I: IntoIterator<Item = Constraint>,
    {
        self.on_state_mut(|state| state.meet_constraints(constraints));
    }

    /// No-op on unreachable memories.
    pub fn store_relation(&mut self, locs: &PowLoc, syms: &(Sym, Sym, Sym)) {
        self.on_state_mut(|state| state.store_relation(locs, syms));
    }

    /// No-op on unreachable memories.
    pub fn forget_locs(&mut self, locs: &PowLoc) {
        self.on_state_mut(|state| state.forget_locs(locs));
    }

    /// No-op on unreachable memories.
    pub fn init_param_relation(&mut self, loc: &Loc) {
        self.on_state_mut(|state| state.init_param_relation(loc));
    }

    /// No-op on unreachable memories.
    pub fn init_array_relation(
        &mut self,
        allocsite: &Allocsite,
        offset: &IntervalDomain,
        size: &IntervalDomain,
        size_exp: Option<&SymExp>,
    ) {
        self.on_state_mut(|state| state.init_array_relation(allocsite, offset, size, size_exp));
    }

    /// Instantiate a callee memory's constraint store into the caller memory.
    /// An unreachable callee leaves the caller unchanged; an unreachable
    /// caller stays unreachable.
    pub fn instantiate_relation(
        subst_map: &SubstMap,
        caller: &Memory,
        callee: &Memory,
    ) -> Memory {
        match (caller, callee) {
            (_, Memory::Unreachable) => caller.clone(),
            (Memory::Unreachable, _) => Memory::Unreachable,
            (Memory::Reachable(caller_state), Memory::Reachable(callee_state)) => {
                let mut instantiated = caller_state.clone();
                instantiated.instantiate_relation(subst_map, callee_state.get_relation());
                Memory::Reachable(instantiated)
            }
        }
    }

    /// Render the memory with the parts enabled by the configuration.
    pub fn render(&self, config: &Config) -> String {
        match self {
            Memory::Unreachable => "unreachable".to_string(),
            Memory::Reachable(state) => state.render(config),
        }
    }
}

impl From<State> for Memory {
    fn from(state: State) -> Memory {
        Memory::Reachable(state)
    }
}

impl AbstractDomain for Memory {
    fn leq(&self, other: &Memory) -> bool {
        match (self, other) {
            (Memory::Unreachable, _) => true,
            (_, Memory::Unreachable) => false,
            (Memory::Reachable(own), Memory::Reachable(other)) => own.leq(other),
        }
    }

    fn join(&self, other: &Memory) -> Memory {
        match (self, other) {
            (Memory::Unreachable, x) | (x, Memory::Unreachable) => x.clone(),
            (Memory::Reachable(own), Memory::Reachable(other)) => {
                Memory::Reachable(own.join(other))
            }
        }
    }

    fn widen(&self, other: &Memory, num_iters: u64) -> Memory {
        match (self, other) {
            (Memory::Unreachable, x) | (x, Memory::Unreachable) => x.clone(),
            (Memory::Reachable(own), Memory::Reachable(other)) => {
                Memory::Reachable(own.widen(other, num_iters))
            }
        }
    }
}

impl HasBottom for Memory {
    fn bot() -> Memory {
        Memory::Unreachable
    }

    fn is_bot(&self) -> bool {
        matches!(self, Memory::Unreachable)
    }
}

impl Display for Memory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.render(&Config::default()))
    }
}

impl ToJsonCompact for Memory {
    fn to_json_compact(&self) -> serde_json::Value {
        match self {
            Memory::Unreachable => serde_json::Value::String("unreachable".to_string()),
            Memory::Reachable(state) => state.to_json_compact(),
        }
    }
}
