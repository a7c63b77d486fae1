use super::*;
use crate::intermediate_representation::Pvar;

fn finite(lower: i64, upper: i64) -> IntervalDomain {
    IntervalDomain::new_finite(lower, upper)
}

fn symbolic_pair(name: &str, table: &mut SymbolTable, counter: &mut Counter) -> IntervalDomain {
    IntervalDomain::make_sym(
        &ProcName("test_proc".to_string()),
        &SymbolPath::of_pvar(Pvar::new(name)),
        table,
        counter,
        false,
    )
}

#[test]
fn constructors() {
    assert_eq!(IntervalDomain::zero(), finite(0, 0));
    assert_eq!(IntervalDomain::one(), finite(1, 1));
    assert_eq!(IntervalDomain::minus_one_to_255(), finite(-1, 255));
    assert_eq!(IntervalDomain::of_bool(true), IntervalDomain::one());
    assert_eq!(IntervalDomain::of_bool(false), IntervalDomain::zero());
    assert_eq!(IntervalDomain::of_i128(7), IntervalDomain::of_i64(7));
    assert!(IntervalDomain::nat().leq(&IntervalDomain::top()));
    assert!(IntervalDomain::pos().leq(&IntervalDomain::nat()));
    assert!(!IntervalDomain::nat().leq(&IntervalDomain::pos()));
    // Wide constants saturate instead of wrapping.
    let wide = IntervalDomain::of_i128(i128::from(i64::MAX) * 2);
    assert!(finite(i64::MAX, i64::MAX).leq(&wide));
    // Intervals that are provably empty normalize to bottom.
    assert_eq!(finite(3, 2), IntervalDomain::Bottom);
}

#[test]
fn lattice_laws() {
    let elements = [
        IntervalDomain::Bottom,
        IntervalDomain::zero(),
        finite(0, 10),
        finite(-5, 3),
        IntervalDomain::nat(),
        IntervalDomain::top(),
    ];
    for x in &elements {
        assert!(IntervalDomain::Bottom.leq(x));
        assert!(x.leq(&IntervalDomain::top()));
        assert!(x.leq(x));
        for y in &elements {
            let joined = x.join(y);
            assert!(x.leq(&joined));
            assert!(y.leq(&joined));
            assert_eq!(joined, y.join(x));
            assert!(joined.leq(&x.widen(y, 0)));
            for z in &elements {
                assert_eq!(x.join(&y.join(z)), x.join(y).join(z));
            }
        }
    }
}

#[test]
fn widening_jumps_to_infinities() {
    let widened = finite(0, 5).widen(&finite(0, 6), 0);
    assert_eq!(
        widened,
        IntervalDomain::new(Bound::int(0), Bound::PlusInfty)
    );
    let widened = finite(0, 5).widen(&finite(-1, 5), 0);
    assert_eq!(
        widened,
        IntervalDomain::new(Bound::MinusInfty, Bound::int(5))
    );
    // Stable chains are left untouched.
    assert_eq!(finite(0, 5).widen(&finite(0, 5), 1), finite(0, 5));
    assert_eq!(finite(0, 5).widen(&finite(1, 4), 1), finite(0, 5));
}

#[test]
fn interval_arithmetic() {
    use BinOpType::*;
    assert_eq!(finite(1, 2).bin_op(Plus, &finite(10, 20)), finite(11, 22));
    assert_eq!(finite(1, 2).bin_op(Minus, &finite(10, 20)), finite(-19, -8));
    assert_eq!(finite(-2, 3).bin_op(Mult, &finite(4, 5)), finite(-10, 15));
    assert_eq!(finite(10, 20).bin_op(Div, &IntervalDomain::of_i64(3)), finite(3, 6));
    assert_eq!(finite(0, 100).bin_op(Mod, &IntervalDomain::of_i64(8)), finite(0, 7));
    assert_eq!(finite(1, 3).bin_op(ShiftLeft, &IntervalDomain::of_i64(4)), finite(16, 48));
    assert_eq!(finite(16, 48).bin_op(ShiftRight, &IntervalDomain::of_i64(4)), finite(1, 3));
    assert_eq!(finite(0, 7).bin_op(BitAnd, &finite(0, 3)), finite(0, 3));
    assert_eq!(finite(1, 2).un_op(UnOpType::Neg), finite(-2, -1));
    // Unbounded operands saturate instead of wrapping.
    let sum = IntervalDomain::nat().bin_op(Plus, &finite(1, 1));
    assert_eq!(sum, IntervalDomain::pos());
    assert!(IntervalDomain::top().bin_op(Mult, &IntervalDomain::top()).is_top());
    assert_eq!(
        IntervalDomain::nat().bin_op(Mult, &IntervalDomain::nat()),
        IntervalDomain::nat()
    );
    // Division by an interval containing only zero is unreachable.
    assert!(finite(1, 2).bin_op(Div, &IntervalDomain::zero()).is_bot());
}

#[test]
fn comparisons_yield_boolean_intervals() {
    use BinOpType::*;
    assert_eq!(finite(0, 1).bin_op(Lt, &finite(2, 3)), IntervalDomain::one());
    assert_eq!(finite(2, 3).bin_op(Lt, &finite(0, 1)), IntervalDomain::zero());
    assert_eq!(
        finite(0, 5).bin_op(Lt, &finite(3, 4)),
        IntervalDomain::unknown_bool()
    );
    assert_eq!(finite(0, 1).bin_op(Le, &finite(1, 3)), IntervalDomain::one());
    assert_eq!(
        IntervalDomain::of_i64(4).bin_op(Eq, &IntervalDomain::of_i64(4)),
        IntervalDomain::one()
    );
    assert_eq!(
        IntervalDomain::of_i64(4).bin_op(Ne, &IntervalDomain::of_i64(4)),
        IntervalDomain::zero()
    );
    assert_eq!(finite(0, 1).bin_op(Eq, &finite(5, 6)), IntervalDomain::zero());
    assert_eq!(
        finite(1, 2).bin_op(LogicalAnd, &finite(3, 4)),
        IntervalDomain::one()
    );
    assert_eq!(
        IntervalDomain::zero().bin_op(LogicalAnd, &finite(0, 9)),
        IntervalDomain::zero()
    );
    assert_eq!(
        IntervalDomain::zero().bin_op(LogicalOr, &finite(0, 9)),
        IntervalDomain::unknown_bool()
    );
    assert_eq!(IntervalDomain::zero().un_op(UnOpType::LogicalNot), IntervalDomain::one());
    assert_eq!(finite(1, 9).un_op(UnOpType::LogicalNot), IntervalDomain::zero());
}

#[test]
fn pruning() {
    use BinOpType::*;
    assert_eq!(
        finite(0, 100).prune_comp(Lt, &IntervalDomain::of_i64(10)),
        finite(0, 9)
    );
    assert_eq!(
        finite(0, 100).prune_comp(Le, &IntervalDomain::of_i64(10)),
        finite(0, 10)
    );
    assert_eq!(
        finite(0, 100).prune_comp(Gt, &IntervalDomain::of_i64(10)),
        finite(11, 100)
    );
    assert_eq!(
        finite(0, 100).prune_comp(Ge, &IntervalDomain::of_i64(10)),
        finite(10, 100)
    );
    // Contradictory assumptions prune to bottom.
    assert!(finite(0, 5).prune_comp(Gt, &IntervalDomain::of_i64(10)).is_bot());
    assert_eq!(finite(0, 5).prune_eq(&finite(3, 10)), finite(3, 5));
    assert_eq!(finite(0, 5).prune_ne(&IntervalDomain::of_i64(5)), finite(0, 4));
    assert_eq!(finite(0, 5).prune_ne(&IntervalDomain::of_i64(3)), finite(0, 5));
    assert_eq!(finite(0, 5).prune_eq_zero(), IntervalDomain::zero());
    assert_eq!(finite(0, 5).prune_ne_zero(), finite(1, 5));
    assert!(IntervalDomain::zero().prune_ne_zero().is_bot());
}

#[test]
fn symbolic_bounds() {
    let mut table = SymbolTable::new();
    let mut counter = Counter::new();
    let symbolic = symbolic_pair("n", &mut table, &mut counter);
    assert_eq!(symbolic.get_symbols().len(), 2);
    assert!(!symbolic.is_range_one());
    assert!(symbolic.try_to_i64().is_err());
    // A symbolic interval is only comparable with itself.
    assert!(symbolic.leq(&symbolic));
    assert!(symbolic.leq(&IntervalDomain::top()));
    assert!(!symbolic.leq(&finite(0, 100)));
    let other = symbolic_pair("m", &mut table, &mut counter);
    assert!(!symbolic.leq(&other));
    // Joining incomparable symbolic bounds degrades to infinities.
    assert!(symbolic.join(&other).is_top());
    // Adding a constant keeps the symbolic bounds.
    let shifted = symbolic.bin_op(BinOpType::Plus, &IntervalDomain::of_i64(1));
    assert_eq!(shifted.get_symbols().len(), 2);
    assert!(!shifted.leq(&symbolic));
}

#[test]
fn substitution() {
    let mut table = SymbolTable::new();
    let mut counter = Counter::new();
    let symbolic = symbolic_pair("n", &mut table, &mut counter);
    let instantiated = symbolic.subst(&|symbol: &Symbol| match symbol.bound_end() {
        BoundEnd::LowerBound => finite(0, 0),
        BoundEnd::UpperBound => finite(10, 10),
    });
    assert_eq!(instantiated, finite(0, 10));

    // Substitution into a shifted interval adds the constant summand.
    let shifted = symbolic.bin_op(BinOpType::Plus, &IntervalDomain::of_i64(5));
    let instantiated = shifted.subst(&|symbol: &Symbol| match symbol.bound_end() {
        BoundEnd::LowerBound => finite(0, 0),
        BoundEnd::UpperBound => finite(10, 10),
    });
    assert_eq!(instantiated, finite(5, 15));

    // Unknown symbols degrade to the unconstrained interval.
    let unknown = symbolic.subst(&|_: &Symbol| IntervalDomain::top());
    assert!(unknown.is_top());

    // Unreachable symbols make the interval unreachable.
    let unreachable = symbolic.subst(&|_: &Symbol| IntervalDomain::Bottom);
    assert!(unreachable.is_bot());
}

#[test]
fn iterator_and_range_queries() {
    assert_eq!(finite(10, 10).get_iterator_interval(), finite(0, 9));
    assert!(IntervalDomain::zero().get_iterator_interval().is_bot());
    assert_eq!(finite(0, 9).finite_range(), Some(10));
    assert_eq!(IntervalDomain::Bottom.finite_range(), Some(0));
    assert_eq!(IntervalDomain::nat().finite_range(), None);
    assert!(IntervalDomain::nat().has_infinite_bound());
    assert!(finite(3, 3).eq_const(3));
    assert!(!finite(3, 4).eq_const(3));
    assert!(finite(3, 3).is_range_one());
    assert_eq!(finite(3, 3).try_to_i64().unwrap(), 3);
}
