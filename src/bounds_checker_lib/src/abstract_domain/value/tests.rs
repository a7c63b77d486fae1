use super::*;
use crate::intermediate_representation::Pvar;

fn var(name: &str) -> Loc {
    Loc::of_pvar(Pvar::new(name))
}

fn array_value(offset: (i64, i64), size: (i64, i64)) -> ValueDomain {
    ValueDomain::of_array_alloc(
        Allocsite::new(Tid::new("alloc_0")),
        Some(4),
        IntervalDomain::new_finite(offset.0, offset.1),
        IntervalDomain::new_finite(size.0, size.1),
        TraceSet::empty(),
    )
}

#[test]
fn lattice_laws() {
    let values = [
        ValueDomain::bot(),
        ValueDomain::of_i64(3),
        ValueDomain::top_interval(),
        ValueDomain::of_loc(var("x")),
        array_value((0, 0), (10, 10)),
    ];
    for x in &values {
        assert!(ValueDomain::bot().leq(x));
        assert!(x.leq(x));
        for y in &values {
            let joined = x.join(y);
            assert!(x.leq(&joined));
            assert!(y.leq(&joined));
            assert_eq!(joined, y.join(x));
            assert!(joined.leq(&x.widen(y, 0)));
            for z in &values {
                assert_eq!(x.join(&y.join(z)), x.join(y).join(z));
            }
        }
    }
}

#[test]
fn constant_arithmetic_matches_concrete_arithmetic() {
    let checks: [(BinOpType, fn(i64, i64) -> i64); 5] = [
        (BinOpType::Plus, |a, b| a + b),
        (BinOpType::Minus, |a, b| a - b),
        (BinOpType::Mult, |a, b| a * b),
        (BinOpType::Div, |a, b| a / b),
        (BinOpType::Mod, |a, b| a % b),
    ];
    for (op, concrete) in checks {
        for (a, b) in [(12, 5), (-7, 3), (0, 9), (30, -4)] {
            let result = ValueDomain::of_i64(a).bin_op(op, &ValueDomain::of_i64(b));
            assert_eq!(
                result.get_itv(),
                &IntervalDomain::of_i64(concrete(a, b)),
                "{a} {op:?} {b}"
            );
        }
    }
    let shifted = ValueDomain::of_i64(3).bin_op(BinOpType::ShiftLeft, &ValueDomain::of_i64(2));
    assert_eq!(shifted.get_itv(), &IntervalDomain::of_i64(12));
    let masked = ValueDomain::of_i64(5).bin_op(BinOpType::BitAnd, &ValueDomain::of_i64(3));
    assert!(IntervalDomain::new_finite(0, 3).leq(masked.get_itv()));
}

#[test]
fn arithmetic_unions_traces_and_drops_pointers() {
    let lhs = ValueDomain::of_interval(
        IntervalDomain::of_i64(1),
        TraceSet::singleton(TraceElem::Assign(Tid::new("a"))),
    );
    let rhs = ValueDomain::of_interval(
        IntervalDomain::of_i64(2),
        TraceSet::singleton(TraceElem::Assign(Tid::new("b"))),
    );
    let sum = lhs.bin_op(BinOpType::Plus, &rhs);
    assert_eq!(sum.get_itv(), &IntervalDomain::of_i64(3));
    assert_eq!(sum.get_traces().len(), 2);
    assert!(sum.get_pow_loc().is_bot());
    assert!(sum.get_array_blk().is_bot());
}

#[test]
fn comparison_with_pointer_is_undetermined() {
    let pointer = ValueDomain::of_loc(var("p"));
    let three = ValueDomain::of_i64(3);
    let result = pointer.bin_op(BinOpType::Lt, &three);
    assert_eq!(result.get_itv(), &IntervalDomain::unknown_bool());
    let result = three.bin_op(BinOpType::Eq, &array_value((0, 0), (10, 10)));
    assert_eq!(result.get_itv(), &IntervalDomain::unknown_bool());
    // Without pointer information, comparisons stay precise.
    let result = three.bin_op(BinOpType::Lt, &ValueDomain::of_i64(5));
    assert_eq!(result.get_itv(), &IntervalDomain::of_bool(true));
}

#[test]
fn get_all_locs_of_pointers() {
    let pointer = ValueDomain::of_loc(var("x"));
    assert_eq!(pointer.get_all_locs(), PowLoc::singleton(var("x")));

    let array = array_value((0, 0), (10, 10));
    let locs = array.get_all_locs();
    assert_eq!(locs.len(), 1);
    assert!(matches!(locs.iter().next().unwrap(), Loc::Allocsite(_)));
}

#[test]
fn pointer_offset_arithmetic() {
    let array = array_value((0, 5), (10, 10));
    let shifted = array.add_pointer_offset(&ValueDomain::of_i64(3));
    let info_offset = shifted.get_array_blk().values().next().unwrap().offset().clone();
    assert_eq!(info_offset, IntervalDomain::new_finite(3, 8));

    // Shifting a pointer to a non-array loses all precision.
    let non_array = ValueDomain::of_loc(var("p"));
    let shifted = non_array.add_pointer_offset(&ValueDomain::of_i64(3));
    assert!(shifted.get_itv().is_top());
    assert!(shifted.get_array_blk().is_bot());
    assert!(shifted.get_pow_loc().is_bot());

    // The difference of two pointers into the same array is the offset difference.
    let left = array_value((5, 5), (10, 10));
    let right = array_value((2, 2), (10, 10));
    assert_eq!(left.pointer_diff(&right).get_itv(), &IntervalDomain::of_i64(3));
    let diff = non_array.pointer_diff(&ValueDomain::of_loc(var("q")));
    assert!(diff.get_itv().is_top());
}

#[test]
fn pruning_refines_interval_and_array_block() {
    let mut diag = Diagnostics::default();
    let index = ValueDomain::of_interval(IntervalDomain::new_finite(0, 100), TraceSet::empty());
    let bound = ValueDomain::of_i64(10);
    let pruned = index.prune_comp(BinOpType::Lt, &bound, &mut diag);
    assert_eq!(pruned.get_itv(), &IntervalDomain::new_finite(0, 9));

    let pointer = array_value((0, 100), (10, 10));
    let limit = array_value((10, 10), (10, 10));
    let pruned = pointer.prune_comp(BinOpType::Lt, &limit, &mut diag);
    assert_eq!(
        pruned.get_array_blk().values().next().unwrap().offset(),
        &IntervalDomain::new_finite(0, 9)
    );

    let nonzero = ValueDomain::of_interval(IntervalDomain::new_finite(0, 5), TraceSet::empty())
        .prune_ne_zero();
    assert_eq!(nonzero.get_itv(), &IntervalDomain::new_finite(1, 5));
    let zero = ValueDomain::of_interval(IntervalDomain::new_finite(0, 5), TraceSet::empty())
        .prune_eq_zero();
    assert_eq!(zero.get_itv(), &IntervalDomain::zero());
    assert!(diag.messages().is_empty());
}

#[test]
fn pruning_a_summary_value_emits_a_note() {
    use crate::utils::log::Config;
    let mut diag = Diagnostics::new(Config {
        write_html: true,
        ..Config::default()
    });
    let summary = ValueDomain::of_interval(IntervalDomain::new_finite(0, 5), TraceSet::empty())
        .with_represents_multiple_values();
    let pruned = summary.prune_comp(BinOpType::Lt, &ValueDomain::of_i64(3), &mut diag);
    // The refinement is unchanged by the diagnostic.
    assert_eq!(pruned.get_itv(), &IntervalDomain::new_finite(0, 2));
    assert!(pruned.represents_multiple_values());
    assert_eq!(diag.messages().len(), 1);
}

#[test]
fn symbolic_input_value() {
    use crate::intermediate_representation::ProcName;
    let mut table = SymbolTable::new();
    let mut counter = Counter::new();
    let proc = ProcName("main".to_string());
    let path = SymbolPath::of_pvar(Pvar::new("n"));
    let location = Tid::new("entry");
    let value = ValueDomain::make_symbolic(
        &var("n"),
        &proc,
        &path,
        &mut table,
        &mut counter,
        &location,
        false,
    );
    assert!(!value.get_symbols().is_empty());
    assert!(!value.represents_multiple_values());
    assert_eq!(value.get_traces().len(), 1);
    assert!(value
        .get_traces()
        .has_elem(&TraceElem::SymAssign(var("n"), location.clone())));
    assert_eq!(value.get_sym(), &Sym::of_loc(&var("n")));

    // A path through an array dereference marks the value as a summary.
    use super::super::DerefKind;
    let array_path = SymbolPath::deref(DerefKind::ArrayIndex, SymbolPath::of_pvar(Pvar::new("a")));
    let value = ValueDomain::make_symbolic(
        &var("a"),
        &proc,
        &array_path,
        &mut table,
        &mut counter,
        &location,
        false,
    );
    assert!(value.represents_multiple_values());

    // Repeated reads of the same path agree on their symbols.
    let again = IntervalDomain::make_sym(&proc, &path, &mut table, &mut counter, false);
    let first = IntervalDomain::make_sym(&proc, &path, &mut table, &mut counter, false);
    assert_eq!(again, first);
}

#[test]
fn array_allocation_and_length_update() {
    let value = array_value((0, 0), (10, 10));
    assert!(value.get_itv().is_bot());
    assert!(value.get_offset_sym().get_var().is_some());
    assert!(value.get_size_sym().get_var().is_some());

    let location = Tid::new("decl");
    let resized = value.set_array_length(&location, &ValueDomain::of_i64(20));
    assert_eq!(
        resized.get_array_blk().values().next().unwrap().size(),
        &IntervalDomain::of_i64(20)
    );
    assert!(resized.get_traces().has_elem(&TraceElem::ArrDecl(location)));

    let restrided = resized.set_array_stride(8);
    assert_eq!(
        restrided.get_array_blk().strideof(),
        IntervalDomain::of_i64(8)
    );
    // Setting the current stride is a no-op.
    assert_eq!(restrided.set_array_stride(8), restrided);
}

#[test]
fn unknown_from_is_top_with_provenance() {
    use crate::intermediate_representation::ProcName;
    let callee = ProcName("mystery".to_string());
    let location = Tid::new("call");
    let value = ValueDomain::unknown_from(Some(&callee), &location);
    assert!(value.get_itv().is_top());
    assert!(!value.get_pow_loc().is_bot());
    assert!(!value.get_array_blk().is_bot());
    assert!(value
        .get_traces()
        .has_elem(&TraceElem::UnknownFrom(Some(callee), location)));
}

#[test]
fn substitution_instantiates_symbols() {
    use crate::intermediate_representation::ProcName;
    let mut table = SymbolTable::new();
    let mut counter = Counter::new();
    let proc = ProcName("callee".to_string());
    let path = SymbolPath::of_pvar(Pvar::new("n"));
    let entry = Tid::new("entry");
    let symbolic =
        ValueDomain::make_symbolic(&var("n"), &proc, &path, &mut table, &mut counter, &entry, false);

    let call_site = Tid::new("call");
    let caller_traces = TraceSet::singleton(TraceElem::Assign(Tid::new("caller_assign")));
    let instantiated = symbolic.substitute(
        &|_symbol: &Symbol| IntervalDomain::new_finite(0, 41),
        &|_symbol: &Symbol| caller_traces.clone(),
        &call_site,
    );
    assert_eq!(instantiated.get_itv(), &IntervalDomain::new_finite(0, 41));
    assert!(instantiated
        .get_traces()
        .has_elem(&TraceElem::Call(call_site.clone())));
    assert!(instantiated
        .get_traces()
        .has_elem(&TraceElem::Assign(Tid::new("caller_assign"))));

    // A symbol evaluating to the empty interval normalizes the value to bottom.
    let unreachable = symbolic.substitute(
        &|_symbol: &Symbol| IntervalDomain::Bottom,
        &|_symbol: &Symbol| TraceSet::empty(),
        &call_site,
    );
    assert!(unreachable.is_bot());
}

#[test]
fn heap_materialization_sets_relational_symbols() {
    let numeric = ValueDomain::of_i64(7).with_symbols_of_loc(&var("h"));
    assert_eq!(numeric.get_sym(), &Sym::of_loc(&var("h")));
    assert!(numeric.get_offset_sym().is_bot());

    let array = array_value((0, 0), (10, 10)).with_symbols_of_loc(&var("h"));
    assert!(array.get_sym().is_bot());
    assert_eq!(array.get_offset_sym(), &Sym::of_loc_offset(&var("h")));
    assert_eq!(array.get_size_sym(), &Sym::of_loc_size(&var("h")));
}

#[test]
fn widening_stabilizes_growing_chains() {
    let mut state = ValueDomain::of_i64(0);
    let mut iterations = 0;
    loop {
        // A transfer function that increments the upper bound each round.
        let grown = ValueDomain::of_interval(
            state
                .get_itv()
                .bin_op(BinOpType::Plus, &IntervalDomain::new_finite(0, 1)),
            TraceSet::empty(),
        );
        let widened = state.widen(&grown, iterations);
        assert!(state.leq(&widened));
        assert!(grown.leq(&widened));
        if widened == state {
            break;
        }
        state = widened;
        iterations += 1;
        assert!(iterations < 10, "widening failed to stabilize");
    }
}
