use crate::abstract_domain::{
    AbstractDomain, DomainMap, HasTop, IntersectMergeStrategy, Loc, ValueDomain,
};
use crate::intermediate_representation::Pvar;
use crate::prelude::*;
use itertools::Itertools;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};

/// The locations refined by the most recent branch condition, together with
/// their refined values.
///
/// The map is inverted: more entries mean more refinements and thus a
/// smaller element; the empty map (no refinement) is the top element.
/// It exists to carry refinements from the basic block evaluating a branch
/// condition into the blocks guarded by it.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct PrunePairs(DomainMap<Loc, ValueDomain, IntersectMergeStrategy>);

impl Deref for PrunePairs {
    type Target = DomainMap<Loc, ValueDomain, IntersectMergeStrategy>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for PrunePairs {
    fn deref_mut(&mut self) -> &mut DomainMap<Loc, ValueDomain, IntersectMergeStrategy> {
        &mut self.0
    }
}

impl PrunePairs {
    /// The record of no refinements.
    pub fn empty() -> PrunePairs {
        PrunePairs::default()
    }

    /// Record that the branch refined `loc` to `value`.
    pub fn add(&mut self, loc: Loc, value: ValueDomain) {
        self.0.insert(loc, value);
    }
}

impl AbstractDomain for PrunePairs {
    fn leq(&self, other: &PrunePairs) -> bool {
        self.0.leq(&other.0)
    }

    fn join(&self, other: &PrunePairs) -> PrunePairs {
        PrunePairs(self.0.join(&other.0))
    }

    fn widen(&self, other: &PrunePairs, num_iters: u64) -> PrunePairs {
        PrunePairs(self.0.widen(&other.0, num_iters))
    }
}

impl HasTop for PrunePairs {
    fn top() -> PrunePairs {
        PrunePairs::default()
    }

    fn is_top(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for PrunePairs {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.0
                .iter()
                .map(|(loc, value)| format!("{loc} -> {value}"))
                .format(", ")
        )
    }
}

/// Tracks how the most recent branch condition relates to a boolean program
/// variable.
///
/// When a branch condition is evaluated, its refinements are recorded as
/// `Latest`. If the guarded blocks then assign `1` (resp. `0`) to a program
/// variable, the record is promoted to `TrueBranch` (resp. `FalseBranch`),
/// and joining the two assignments yields `Branches`. When the variable is
/// tested again later (through a temporary that aliases it), the memorized
/// refinements of the matching side can be replayed. Any other memory write
/// invalidates the record to `Top`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub enum LatestPrune {
    /// The most recent pruning produced these refinements; no boolean
    /// variable has been assigned from it yet.
    Latest(PrunePairs),
    /// After pruning, the variable was assigned `1`.
    TrueBranch(Pvar, PrunePairs),
    /// After pruning, the variable was assigned `0`.
    FalseBranch(Pvar, PrunePairs),
    /// The joined state of the two branches of a test: when the variable is
    /// `1` the true refinements hold, when it is `0` the false refinements hold.
    Branches(Pvar, PrunePairs, PrunePairs),
    /// No information.
    #[default]
    Top,
}

impl AbstractDomain for LatestPrune {
    fn leq(&self, other: &LatestPrune) -> bool {
        use LatestPrune::*;
        match (self, other) {
            (_, Top) => true,
            (Latest(p1), Latest(p2)) => p1.leq(p2),
            (TrueBranch(x1, p1), TrueBranch(x2, p2))
            | (FalseBranch(x1, p1), FalseBranch(x2, p2)) => x1 == x2 && p1.leq(p2),
            (TrueBranch(x, p), Branches(y, p_true, _)) => x == y && p.leq(p_true),
            (FalseBranch(x, p), Branches(y, _, p_false)) => x == y && p.leq(p_false),
            (Branches(x1, t1, f1), Branches(x2, t2, f2)) => {
                x1 == x2 && t1.leq(t2) && f1.leq(f2)
            }
            _ => false,
        }
    }

    fn join(&self, other: &LatestPrune) -> LatestPrune {
        use LatestPrune::*;
        if self.leq(other) {
            return other.clone();
        }
        if other.leq(self) {
            return self.clone();
        }
        match (self, other) {
            (Latest(p1), Latest(p2)) => Latest(p1.join(p2)),
            (TrueBranch(x1, p1), TrueBranch(x2, p2)) if x1 == x2 => {
                TrueBranch(x1.clone(), p1.join(p2))
            }
            (FalseBranch(x1, p1), FalseBranch(x2, p2)) if x1 == x2 => {
                FalseBranch(x1.clone(), p1.join(p2))
            }
            (TrueBranch(x1, p_true), FalseBranch(x2, p_false))
            | (FalseBranch(x2, p_false), TrueBranch(x1, p_true))
                if x1 == x2 =>
            {
                Branches(x1.clone(), p_true.clone(), p_false.clone())
            }
            (Branches(x1, t1, f1), Branches(x2, t2, f2)) if x1 == x2 => {
                Branches(x1.clone(), t1.join(t2), f1.join(f2))
            }
            _ => Top,
        }
    }

    // The lattice has finite height, so the default widening (join) suffices.
}

impl HasTop for LatestPrune {
    fn top() -> LatestPrune {
        LatestPrune::Top
    }

    fn is_top(&self) -> bool {
        matches!(self, LatestPrune::Top)
    }
}

impl Display for LatestPrune {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        use LatestPrune::*;
        match self {
            Latest(pairs) => write!(f, "latest: {pairs}"),
            TrueBranch(pvar, pairs) => write!(f, "{pvar} == 1: {pairs}"),
            FalseBranch(pvar, pairs) => write!(f, "{pvar} == 0: {pairs}"),
            Branches(pvar, p_true, p_false) => {
                write!(f, "{pvar} ? {p_true} : {p_false}")
            }
            Top => write!(f, "top"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pairs(name: &str, value: i64) -> PrunePairs {
        let mut pairs = PrunePairs::empty();
        pairs.add(Loc::Var(Pvar::new(name)), ValueDomain::of_i64(value));
        pairs
    }

    fn x() -> Pvar {
        Pvar::new("x")
    }

    #[test]
    fn prune_pairs_is_inverted() {
        let refined = pairs("a", 5);
        assert!(refined.leq(&PrunePairs::empty()));
        assert!(!PrunePairs::empty().leq(&refined));
        // Joining keeps only shared refinements.
        let joined = refined.join(&pairs("b", 6));
        assert!(joined.is_top());
    }

    #[test]
    fn branch_join_produces_branches() {
        let true_side = LatestPrune::TrueBranch(x(), pairs("x", 5));
        let false_side = LatestPrune::FalseBranch(x(), pairs("x", 6));
        let joined = true_side.join(&false_side);
        assert_eq!(
            joined,
            LatestPrune::Branches(x(), pairs("x", 5), pairs("x", 6))
        );
        assert!(true_side.leq(&joined));
        assert!(false_side.leq(&joined));
    }

    #[test]
    fn unrelated_variables_join_to_top() {
        let on_x = LatestPrune::TrueBranch(x(), pairs("x", 5));
        let on_y = LatestPrune::TrueBranch(Pvar::new("y"), pairs("y", 6));
        assert_eq!(on_x.join(&on_y), LatestPrune::Top);
        assert!(!on_x.leq(&on_y));
    }

    #[test]
    fn branch_order_against_joined_branches() {
        let joined = LatestPrune::Branches(x(), pairs("x", 5), pairs("x", 6));
        assert!(LatestPrune::TrueBranch(x(), pairs("x", 5)).leq(&joined));
        assert!(LatestPrune::FalseBranch(x(), pairs("x", 6)).leq(&joined));
        // The pairs must be at least as refined as the corresponding side.
        assert!(!LatestPrune::TrueBranch(x(), PrunePairs::empty()).leq(&joined));
        // The wrong side does not compare.
        assert!(!LatestPrune::FalseBranch(x(), pairs("x", 5)).leq(&joined));
    }

    #[test]
    fn lattice_laws() {
        let elements = [
            LatestPrune::Latest(pairs("x", 1)),
            LatestPrune::TrueBranch(x(), pairs("x", 1)),
            LatestPrune::FalseBranch(x(), pairs("x", 0)),
            LatestPrune::Branches(x(), pairs("x", 1), pairs("x", 0)),
            LatestPrune::Top,
        ];
        for a in &elements {
            assert!(a.leq(a));
            assert!(a.leq(&LatestPrune::Top));
            for b in &elements {
                let joined = a.join(b);
                assert!(a.leq(&joined), "{a} not leq {joined}");
                assert!(b.leq(&joined));
                assert_eq!(joined, b.join(a));
                // Widening equals joining on this finite-height lattice.
                assert_eq!(a.widen(b, 3), joined);
            }
        }
    }
}
