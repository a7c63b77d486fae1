use crate::intermediate_representation::ProcName;
use crate::prelude::*;
use derive_more::Deref;
use itertools::Itertools;
use std::collections::BTreeSet;
use std::fmt::Display;
use std::sync::Arc;

use super::Loc;

/// Bound on the number of traces produced when composing caller and callee
/// traces at a call site. Joins are unbounded; only the composition product
/// is cut off.
const MAX_INSTANTIATED_TRACES: usize = 16;

/// One step in the history of how an abstract value came to be.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord)]
pub enum TraceElem {
    /// The value was assigned at the given program point.
    Assign(Tid),
    /// The value of the given location was replaced by a symbolic input value.
    SymAssign(Loc, Tid),
    /// An array was declared or its length set at the given program point.
    ArrDecl(Tid),
    /// Control passed through a call at the given program point.
    Call(Tid),
    /// The value was returned by a call to an unmodeled procedure.
    UnknownFrom(Option<ProcName>, Tid),
}

impl Display for TraceElem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TraceElem::Assign(tid) => write!(f, "Assign@{tid}"),
            TraceElem::SymAssign(loc, tid) => write!(f, "SymAssign({loc})@{tid}"),
            TraceElem::ArrDecl(tid) => write!(f, "ArrDecl@{tid}"),
            TraceElem::Call(tid) => write!(f, "Call@{tid}"),
            TraceElem::UnknownFrom(Some(callee), tid) => write!(f, "UnknownFrom({callee})@{tid}"),
            TraceElem::UnknownFrom(None, tid) => write!(f, "UnknownFrom(?)@{tid}"),
        }
    }
}

/// A sequence of trace elements recording one possible history of a value,
/// oldest element first.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, PartialOrd, Ord, Default)]
pub struct Trace {
    elems: Vec<TraceElem>,
}

impl Trace {
    /// Create a trace consisting of a single element.
    pub fn singleton(elem: TraceElem) -> Trace {
        Trace { elems: vec![elem] }
    }

    /// Append an element to the trace.
    pub fn add_elem(&self, elem: TraceElem) -> Trace {
        let mut elems = self.elems.clone();
        elems.push(elem);
        Trace { elems }
    }

    /// Concatenate two traces.
    fn concat(&self, other: &Trace) -> Trace {
        let mut elems = self.elems.clone();
        elems.extend(other.elems.iter().cloned());
        Trace { elems }
    }

    /// Iterate over the elements of the trace, oldest first.
    pub fn elems(&self) -> impl Iterator<Item = &TraceElem> {
        self.elems.iter()
    }
}

impl Display for Trace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.elems.iter().format(" -> "))
    }
}

/// The set of provenance traces attached to an abstract value.
///
/// Each trace records one possible history of the value; the set grows by
/// joins at control-flow merges and by composition at call sites. It carries
/// no semantic information and exists purely for diagnostics.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Default, Deref)]
#[deref(forward)]
pub struct TraceSet(Arc<BTreeSet<Trace>>);

impl TraceSet {
    /// Create an empty trace set.
    pub fn empty() -> TraceSet {
        TraceSet::default()
    }

    /// Create a set containing the single-element trace of `elem`.
    pub fn singleton(elem: TraceElem) -> TraceSet {
        TraceSet(Arc::new(BTreeSet::from([Trace::singleton(elem)])))
    }

    /// Append `elem` to every trace of the set. On the empty set this starts
    /// a fresh trace, so that the element is never lost.
    pub fn add_elem(&self, elem: TraceElem) -> TraceSet {
        if self.0.is_empty() {
            TraceSet::singleton(elem)
        } else {
            TraceSet(Arc::new(
                self.0
                    .iter()
                    .map(|trace| trace.add_elem(elem.clone()))
                    .collect(),
            ))
        }
    }

    /// Return the union of the two sets.
    pub fn join(&self, other: &TraceSet) -> TraceSet {
        if self.0.is_empty() || Arc::ptr_eq(&self.0, &other.0) {
            other.clone()
        } else if other.0.is_empty() {
            self.clone()
        } else {
            TraceSet(Arc::new(self.0.union(&other.0).cloned().collect()))
        }
    }

    /// Returns whether `self` is a subset of `other`.
    pub fn leq(&self, other: &TraceSet) -> bool {
        Arc::ptr_eq(&self.0, &other.0) || self.0.is_subset(&other.0)
    }

    /// Compose caller-side and callee-side traces across the call at
    /// `location`. The composition product is bounded by
    /// [`MAX_INSTANTIATED_TRACES`]; the retained prefix is deterministic.
    pub fn call(location: &Tid, caller: &TraceSet, callee: &TraceSet) -> TraceSet {
        let call_elem = TraceElem::Call(location.clone());
        let mut composed = BTreeSet::new();
        if caller.0.is_empty() {
            for callee_trace in callee.0.iter().take(MAX_INSTANTIATED_TRACES) {
                composed.insert(Trace::singleton(call_elem.clone()).concat(callee_trace));
            }
        } else if callee.0.is_empty() {
            for caller_trace in caller.0.iter().take(MAX_INSTANTIATED_TRACES) {
                composed.insert(caller_trace.add_elem(call_elem.clone()));
            }
        } else {
            'outer: for caller_trace in caller.0.iter() {
                for callee_trace in callee.0.iter() {
                    if composed.len() >= MAX_INSTANTIATED_TRACES {
                        break 'outer;
                    }
                    composed.insert(caller_trace.add_elem(call_elem.clone()).concat(callee_trace));
                }
            }
        }
        TraceSet(Arc::new(composed))
    }

    /// Returns true if some trace of the set contains the given element.
    pub fn has_elem(&self, elem: &TraceElem) -> bool {
        self.0.iter().any(|trace| trace.elems.contains(elem))
    }
}

impl FromIterator<Trace> for TraceSet {
    fn from_iter<I: IntoIterator<Item = Trace>>(iter: I) -> TraceSet {
        TraceSet(Arc::new(iter.into_iter().collect()))
    }
}

impl Display for TraceSet {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{{{}}}", self.0.iter().format("; "))
    }
}
