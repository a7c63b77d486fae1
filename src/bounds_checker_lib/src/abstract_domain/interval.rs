use std::fmt::Display;

use crate::intermediate_representation::{BinOpType, ProcName, UnOpType};
use crate::prelude::*;

use super::{AbstractDomain, HasBottom, HasTop};
use super::{BoundEnd, Counter, Symbol, SymbolPath, SymbolSet, SymbolTable};

#[cfg(test)]
mod tests;

/// One endpoint of an interval: minus infinity, plus infinity, or a linear
/// expression `constant + symbol` where the symbol part is optional.
///
/// Two symbolic endpoints are only comparable when they mention the same
/// symbol; operations degrade to the infinity matching the endpoint they
/// compute whenever a result is not representable in this form.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub enum Bound {
    /// Smaller than every representable value.
    MinusInfty,
    /// The value `constant + symbol` (or just `constant` if no symbol is present).
    Linear {
        /// The constant summand of the bound.
        constant: i64,
        /// The optional symbolic summand of the bound.
        symbol: Option<Symbol>,
    },
    /// Larger than every representable value.
    PlusInfty,
}

impl Bound {
    /// Create a constant bound.
    pub fn int(constant: i64) -> Bound {
        Bound::Linear {
            constant,
            symbol: None,
        }
    }

    /// Create the bound consisting of the given symbol alone.
    pub fn of_symbol(symbol: Symbol) -> Bound {
        Bound::Linear {
            constant: 0,
            symbol: Some(symbol),
        }
    }

    /// Create a bound from a wide integer, saturating towards the infinity
    /// matching the given endpoint when the value is not representable.
    fn of_i128(value: i128, end: BoundEnd) -> Bound {
        if let Ok(value) = i64::try_from(value) {
            Bound::int(value)
        } else {
            match end {
                // A lower endpoint may be lowered, an upper endpoint raised.
                BoundEnd::LowerBound => {
                    if value < i64::MIN as i128 {
                        Bound::MinusInfty
                    } else {
                        Bound::int(i64::MAX)
                    }
                }
                BoundEnd::UpperBound => {
                    if value > i64::MAX as i128 {
                        Bound::PlusInfty
                    } else {
                        Bound::int(i64::MIN)
                    }
                }
            }
        }
    }

    /// The infinity matching the given endpoint.
    fn infty(end: BoundEnd) -> Bound {
        match end {
            BoundEnd::LowerBound => Bound::MinusInfty,
            BoundEnd::UpperBound => Bound::PlusInfty,
        }
    }

    /// If the bound is a constant, return it.
    pub fn try_to_i64(&self) -> Option<i64> {
        match self {
            Bound::Linear {
                constant,
                symbol: None,
            } => Some(*constant),
            _ => None,
        }
    }

    /// Get the symbol mentioned by the bound, if any.
    pub fn symbol(&self) -> Option<&Symbol> {
        match self {
            Bound::Linear {
                symbol: Some(symbol),
                ..
            } => Some(symbol),
            _ => None,
        }
    }

    /// Soundly decide `self <= other`. Incomparable bounds yield `false`.
    pub fn le(&self, other: &Bound) -> bool {
        use Bound::*;
        match (self, other) {
            (MinusInfty, _) | (_, PlusInfty) => true,
            (PlusInfty, _) | (_, MinusInfty) => false,
            (
                Linear {
                    constant: c1,
                    symbol: s1,
                },
                Linear {
                    constant: c2,
                    symbol: s2,
                },
            ) => match (s1, s2) {
                (None, None) => c1 <= c2,
                (Some(s1), Some(s2)) => s1 == s2 && c1 <= c2,
                // `c1 <= c2 + s` holds whenever the symbol is non-negative.
                (None, Some(s)) => s.is_unsigned() && c1 <= c2,
                (Some(_), None) => false,
            },
        }
    }

    /// Soundly decide `self < other`. Incomparable bounds yield `false`.
    pub fn lt(&self, other: &Bound) -> bool {
        use Bound::*;
        match (self, other) {
            (MinusInfty, MinusInfty) | (PlusInfty, PlusInfty) => false,
            (MinusInfty, _) | (_, PlusInfty) => true,
            (PlusInfty, _) | (_, MinusInfty) => false,
            (
                Linear {
                    constant: c1,
                    symbol: s1,
                },
                Linear {
                    constant: c2,
                    symbol: s2,
                },
            ) => match (s1, s2) {
                (None, None) => c1 < c2,
                (Some(s1), Some(s2)) => s1 == s2 && c1 < c2,
                (None, Some(s)) => s.is_unsigned() && c1 < c2,
                (Some(_), None) => false,
            },
        }
    }

    /// Add two bounds, degrading to the infinity matching `end` when the sum
    /// is not representable.
    fn add(&self, other: &Bound, end: BoundEnd) -> Bound {
        use Bound::*;
        match (self, other) {
            (MinusInfty, PlusInfty) | (PlusInfty, MinusInfty) => Bound::infty(end),
            (MinusInfty, _) | (_, MinusInfty) => MinusInfty,
            (PlusInfty, _) | (_, PlusInfty) => PlusInfty,
            (
                Linear {
                    constant: c1,
                    symbol: s1,
                },
                Linear {
                    constant: c2,
                    symbol: s2,
                },
            ) => {
                let symbol = match (s1, s2) {
                    (None, None) => None,
                    (Some(s), None) | (None, Some(s)) => Some(s.clone()),
                    (Some(_), Some(_)) => return Bound::infty(end),
                };
                match c1.checked_add(*c2) {
                    Some(constant) => Linear { constant, symbol },
                    None => Bound::infty(end),
                }
            }
        }
    }

    /// Add a constant to the bound.
    fn add_const(&self, summand: i64, end: BoundEnd) -> Bound {
        self.add(&Bound::int(summand), end)
    }

    /// Negate the bound, degrading to the infinity matching `end` for
    /// symbolic bounds (there is no negated-symbol form).
    fn neg(&self, end: BoundEnd) -> Bound {
        use Bound::*;
        match self {
            MinusInfty => PlusInfty,
            PlusInfty => MinusInfty,
            Linear {
                constant,
                symbol: None,
            } => match constant.checked_neg() {
                Some(constant) => Bound::int(constant),
                None => Bound::infty(end),
            },
            Linear { .. } => Bound::infty(end),
        }
    }

    /// Multiply the bound with a nonzero constant. The caller is responsible
    /// for swapping endpoints when the factor is negative.
    fn scale(&self, factor: i64, end: BoundEnd) -> Bound {
        use Bound::*;
        match self {
            MinusInfty => {
                if factor > 0 {
                    MinusInfty
                } else {
                    PlusInfty
                }
            }
            PlusInfty => {
                if factor > 0 {
                    PlusInfty
                } else {
                    MinusInfty
                }
            }
            Linear {
                constant,
                symbol: None,
            } => match constant.checked_mul(factor) {
                Some(constant) => Bound::int(constant),
                None => Bound::infty(end),
            },
            Linear { .. } => {
                if factor == 1 {
                    self.clone()
                } else {
                    Bound::infty(end)
                }
            }
        }
    }

    /// Divide the bound by a nonzero constant, truncating towards zero.
    /// The caller is responsible for swapping endpoints for negative divisors.
    fn scale_div(&self, divisor: i64, end: BoundEnd) -> Bound {
        use Bound::*;
        match self {
            MinusInfty => {
                if divisor > 0 {
                    MinusInfty
                } else {
                    PlusInfty
                }
            }
            PlusInfty => {
                if divisor > 0 {
                    PlusInfty
                } else {
                    MinusInfty
                }
            }
            Linear {
                constant,
                symbol: None,
            } => match constant.checked_div(divisor) {
                Some(constant) => Bound::int(constant),
                None => Bound::infty(end),
            },
            Linear { .. } => Bound::infty(end),
        }
    }

    /// Substitute the symbol of the bound using `eval`, which maps each
    /// symbol to the interval of values it may take on the caller side.
    ///
    /// Returns `None` if the symbol evaluates to the empty interval.
    fn subst<F>(&self, eval: &F, end: BoundEnd) -> Option<Bound>
    where
        F: Fn(&Symbol) -> IntervalDomain,
    {
        match self {
            Bound::Linear {
                constant,
                symbol: Some(symbol),
            } => match eval(symbol) {
                IntervalDomain::Bottom => None,
                IntervalDomain::Value(interval) => {
                    let evaluated = match end {
                        BoundEnd::LowerBound => interval.lower,
                        BoundEnd::UpperBound => interval.upper,
                    };
                    Some(evaluated.add_const(*constant, end))
                }
            },
            _ => Some(self.clone()),
        }
    }
}

impl Display for Bound {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Bound::MinusInfty => write!(f, "-oo"),
            Bound::PlusInfty => write!(f, "+oo"),
            Bound::Linear {
                constant,
                symbol: None,
            } => write!(f, "{constant}"),
            Bound::Linear {
                constant: 0,
                symbol: Some(symbol),
            } => write!(f, "{symbol}"),
            Bound::Linear {
                constant,
                symbol: Some(symbol),
            } => {
                if *constant < 0 {
                    write!(f, "{symbol}{constant}")
                } else {
                    write!(f, "{symbol}+{constant}")
                }
            }
        }
    }
}

/// A (possibly unbounded) interval of integers with symbolic endpoints.
///
/// Both endpoints are included in the represented interval. The struct itself
/// does not enforce nonemptiness; [`IntervalDomain::normalize`] maps provably
/// empty intervals to the bottom element.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct Interval {
    /// The lower endpoint of the interval.
    pub lower: Bound,
    /// The upper endpoint of the interval.
    pub upper: Bound,
}

impl Interval {
    /// Construct a new interval with the given endpoints.
    pub fn new(lower: Bound, upper: Bound) -> Interval {
        Interval { lower, upper }
    }

    /// Returns true if the interval is provably empty,
    /// i.e. its upper endpoint is provably smaller than its lower endpoint.
    fn is_provably_empty(&self) -> bool {
        self.upper.lt(&self.lower)
    }
}

/// An abstract domain representing the set of values an integer quantity may
/// take: either the empty set or an interval with (possibly symbolic,
/// possibly infinite) endpoints.
///
/// The symbolic endpoints name unknown input values of the analyzed
/// procedure; substituting them at a call site instantiates the interval in
/// the calling context.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub enum IntervalDomain {
    /// The empty interval, denoting no attainable value.
    Bottom,
    /// A nonempty interval.
    Value(Interval),
}

impl IntervalDomain {
    /// Construct the interval with the given endpoints, normalizing provably
    /// empty intervals to `Bottom`.
    pub fn new(lower: Bound, upper: Bound) -> IntervalDomain {
        IntervalDomain::Value(Interval::new(lower, upper)).normalize()
    }

    /// Construct the interval `[lower, upper]` of constants.
    pub fn new_finite(lower: i64, upper: i64) -> IntervalDomain {
        IntervalDomain::new(Bound::int(lower), Bound::int(upper))
    }

    /// The interval containing exactly the given value.
    pub fn of_i64(value: i64) -> IntervalDomain {
        IntervalDomain::new_finite(value, value)
    }

    /// The interval containing the given wide value,
    /// saturated to representable endpoints.
    pub fn of_i128(value: i128) -> IntervalDomain {
        IntervalDomain::new(
            Bound::of_i128(value, BoundEnd::LowerBound),
            Bound::of_i128(value, BoundEnd::UpperBound),
        )
    }

    /// The interval of the boolean constant: `[1, 1]` for true, `[0, 0]` for false.
    pub fn of_bool(value: bool) -> IntervalDomain {
        if value {
            IntervalDomain::one()
        } else {
            IntervalDomain::zero()
        }
    }

    /// The interval `[0, 1]` of an undetermined boolean value.
    pub fn unknown_bool() -> IntervalDomain {
        IntervalDomain::new_finite(0, 1)
    }

    /// The interval `[0, +oo]` of the natural numbers.
    pub fn nat() -> IntervalDomain {
        IntervalDomain::new(Bound::int(0), Bound::PlusInfty)
    }

    /// The interval `[1, +oo]` of the positive numbers.
    pub fn pos() -> IntervalDomain {
        IntervalDomain::new(Bound::int(1), Bound::PlusInfty)
    }

    /// The interval containing exactly zero.
    pub fn zero() -> IntervalDomain {
        IntervalDomain::of_i64(0)
    }

    /// The interval containing exactly one.
    pub fn one() -> IntervalDomain {
        IntervalDomain::of_i64(1)
    }

    /// The interval `[-1, 255]` of a byte read that may fail.
    pub fn minus_one_to_255() -> IntervalDomain {
        IntervalDomain::new_finite(-1, 255)
    }

    /// Get the lower endpoint of the interval, if it is not empty.
    pub fn lower_bound(&self) -> Option<&Bound> {
        match self {
            IntervalDomain::Bottom => None,
            IntervalDomain::Value(interval) => Some(&interval.lower),
        }
    }

    /// Get the upper endpoint of the interval, if it is not empty.
    pub fn upper_bound(&self) -> Option<&Bound> {
        match self {
            IntervalDomain::Bottom => None,
            IntervalDomain::Value(interval) => Some(&interval.upper),
        }
    }

    /// Map provably empty intervals to `Bottom`.
    pub fn normalize(self) -> IntervalDomain {
        match self {
            IntervalDomain::Value(ref interval) if interval.is_provably_empty() => {
                IntervalDomain::Bottom
            }
            other => other,
        }
    }

    /// Returns true if the interval contains exactly the given constant.
    pub fn eq_const(&self, constant: i64) -> bool {
        match self {
            IntervalDomain::Value(interval) => {
                interval.lower == Bound::int(constant) && interval.upper == Bound::int(constant)
            }
            IntervalDomain::Bottom => false,
        }
    }

    /// Returns true if the interval contains exactly one value.
    pub fn is_range_one(&self) -> bool {
        match self {
            IntervalDomain::Value(interval) => {
                interval.lower == interval.upper && interval.lower.try_to_i64().is_some()
            }
            IntervalDomain::Bottom => false,
        }
    }

    /// If the interval contains exactly one constant, return it.
    pub fn try_to_i64(&self) -> Result<i64, Error> {
        match self {
            IntervalDomain::Value(interval) if interval.lower == interval.upper => interval
                .lower
                .try_to_i64()
                .ok_or_else(|| anyhow!("The value is symbolic.")),
            IntervalDomain::Bottom => Err(anyhow!("The interval is empty.")),
            _ => Err(anyhow!("More than one value in the interval.")),
        }
    }

    /// Returns true if zero is (possibly) contained in the interval.
    fn may_contain_zero(&self) -> bool {
        match self {
            IntervalDomain::Bottom => false,
            IntervalDomain::Value(interval) => {
                !Bound::int(0).lt(&interval.lower) && !interval.upper.lt(&Bound::int(0))
            }
        }
    }

    /// Returns true if all values of the interval are provably non-negative.
    fn is_non_negative(&self) -> bool {
        match self {
            IntervalDomain::Bottom => true,
            IntervalDomain::Value(interval) => Bound::int(0).le(&interval.lower),
        }
    }

    /// Returns true if all values of the interval are provably non-positive.
    fn is_non_positive(&self) -> bool {
        match self {
            IntervalDomain::Bottom => true,
            IntervalDomain::Value(interval) => interval.upper.le(&Bound::int(0)),
        }
    }

    /// Compute the interval of the values an iterator counting up to `self`
    /// visits, i.e. `[0, upper - 1]`.
    pub fn get_iterator_interval(&self) -> IntervalDomain {
        match self {
            IntervalDomain::Bottom => IntervalDomain::Bottom,
            IntervalDomain::Value(interval) => IntervalDomain::new(
                Bound::int(0),
                interval.upper.add_const(-1, BoundEnd::UpperBound),
            ),
        }
    }

    /// The number of values contained in the interval, if it is finite and
    /// symbol-free.
    pub fn finite_range(&self) -> Option<u128> {
        match self {
            IntervalDomain::Bottom => Some(0),
            IntervalDomain::Value(interval) => {
                let lower = interval.lower.try_to_i64()? as i128;
                let upper = interval.upper.try_to_i64()? as i128;
                Some((upper - lower + 1).max(0) as u128)
            }
        }
    }

    /// Returns true if one of the endpoints is an infinity.
    pub fn has_infinite_bound(&self) -> bool {
        match self {
            IntervalDomain::Bottom => false,
            IntervalDomain::Value(interval) => {
                matches!(interval.lower, Bound::MinusInfty)
                    || matches!(interval.upper, Bound::PlusInfty)
            }
        }
    }

    /// Collect the symbols mentioned by the endpoints of the interval.
    pub fn get_symbols(&self) -> SymbolSet {
        let mut symbols = SymbolSet::new();
        if let IntervalDomain::Value(interval) = self {
            if let Some(symbol) = interval.lower.symbol() {
                symbols.insert(symbol.clone());
            }
            if let Some(symbol) = interval.upper.symbol() {
                symbols.insert(symbol.clone());
            }
        }
        symbols
    }

    /// Create the symbolic interval `[s_lower, s_upper]` naming the unknown
    /// input value reached through `path`. The symbol pair is interned in
    /// `table` so that repeated reads of the same path agree.
    pub fn make_sym(
        proc: &ProcName,
        path: &SymbolPath,
        table: &mut SymbolTable,
        counter: &mut Counter,
        unsigned: bool,
    ) -> IntervalDomain {
        let (lower, upper) = table.lookup(proc, path, counter, unsigned);
        IntervalDomain::Value(Interval::new(
            Bound::of_symbol(lower),
            Bound::of_symbol(upper),
        ))
    }

    /// Substitute the symbols of the endpoints using `eval`, which maps each
    /// symbol to the interval of values it may take on the caller side.
    pub fn subst<F>(&self, eval: &F) -> IntervalDomain
    where
        F: Fn(&Symbol) -> IntervalDomain,
    {
        match self {
            IntervalDomain::Bottom => IntervalDomain::Bottom,
            IntervalDomain::Value(interval) => {
                let lower = interval.lower.subst(eval, BoundEnd::LowerBound);
                let upper = interval.upper.subst(eval, BoundEnd::UpperBound);
                match (lower, upper) {
                    (Some(lower), Some(upper)) => IntervalDomain::new(lower, upper),
                    _ => IntervalDomain::Bottom,
                }
            }
        }
    }

    /// Compute the intersection of two intervals.
    ///
    /// Incomparable symbolic endpoints keep the endpoint of `self`, so the
    /// result over-approximates the exact intersection.
    pub fn intersect(&self, other: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, other) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => {
                let lower = if a.lower.le(&b.lower) {
                    b.lower.clone()
                } else {
                    a.lower.clone()
                };
                let upper = if a.upper.le(&b.upper) {
                    a.upper.clone()
                } else {
                    b.upper.clone()
                };
                IntervalDomain::new(lower, upper)
            }
        }
    }

    /// Compute the (abstract) result of a binary operation between two intervals.
    pub fn bin_op(&self, op: BinOpType, rhs: &IntervalDomain) -> IntervalDomain {
        use BinOpType::*;
        match op {
            Plus => self.add(rhs),
            Minus => self.sub(rhs),
            Mult => self.mul(rhs),
            Div => self.div(rhs),
            Mod => self.rem(rhs),
            ShiftLeft => self.shift_left(rhs),
            ShiftRight => self.shift_right(rhs),
            BitAnd => self.bit_and(rhs),
            Lt => self.lt_sem(rhs),
            Gt => rhs.lt_sem(self),
            Le => self.le_sem(rhs),
            Ge => rhs.le_sem(self),
            Eq => self.eq_sem(rhs),
            Ne => self.ne_sem(rhs),
            LogicalAnd => self.land_sem(rhs),
            LogicalOr => self.lor_sem(rhs),
        }
    }

    /// Compute the (abstract) result of a unary operation on the interval.
    pub fn un_op(&self, op: UnOpType) -> IntervalDomain {
        match op {
            UnOpType::Neg => self.neg(),
            UnOpType::BitNot => match self {
                IntervalDomain::Bottom => IntervalDomain::Bottom,
                _ => IntervalDomain::top(),
            },
            UnOpType::LogicalNot => self.lnot_sem(),
        }
    }

    fn add(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => IntervalDomain::new(
                a.lower.add(&b.lower, BoundEnd::LowerBound),
                a.upper.add(&b.upper, BoundEnd::UpperBound),
            ),
        }
    }

    fn sub(&self, rhs: &IntervalDomain) -> IntervalDomain {
        self.add(&rhs.neg())
    }

    fn neg(&self) -> IntervalDomain {
        use IntervalDomain::*;
        match self {
            Bottom => Bottom,
            Value(interval) => IntervalDomain::new(
                interval.upper.neg(BoundEnd::LowerBound),
                interval.lower.neg(BoundEnd::UpperBound),
            ),
        }
    }

    /// Multiply the interval with a constant factor.
    fn scale(&self, factor: i64) -> IntervalDomain {
        use IntervalDomain::*;
        match self {
            Bottom => Bottom,
            _ if factor == 0 => IntervalDomain::zero(),
            Value(interval) => {
                if factor > 0 {
                    IntervalDomain::new(
                        interval.lower.scale(factor, BoundEnd::LowerBound),
                        interval.upper.scale(factor, BoundEnd::UpperBound),
                    )
                } else {
                    IntervalDomain::new(
                        interval.upper.scale(factor, BoundEnd::LowerBound),
                        interval.lower.scale(factor, BoundEnd::UpperBound),
                    )
                }
            }
        }
    }

    fn mul(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            _ if self.eq_const(0) || rhs.eq_const(0) => IntervalDomain::zero(),
            (Value(a), Value(b)) => {
                if let Ok(factor) = rhs.try_to_i64() {
                    return self.scale(factor);
                }
                if let Ok(factor) = self.try_to_i64() {
                    return rhs.scale(factor);
                }
                match (
                    a.lower.try_to_i64(),
                    a.upper.try_to_i64(),
                    b.lower.try_to_i64(),
                    b.upper.try_to_i64(),
                ) {
                    (Some(al), Some(au), Some(bl), Some(bu)) => {
                        let products = [
                            al as i128 * bl as i128,
                            al as i128 * bu as i128,
                            au as i128 * bl as i128,
                            au as i128 * bu as i128,
                        ];
                        let min = *products.iter().min().unwrap();
                        let max = *products.iter().max().unwrap();
                        IntervalDomain::new(
                            Bound::of_i128(min, BoundEnd::LowerBound),
                            Bound::of_i128(max, BoundEnd::UpperBound),
                        )
                    }
                    _ if self.is_non_negative() && rhs.is_non_negative() => {
                        IntervalDomain::new(Bound::int(0), Bound::PlusInfty)
                    }
                    _ => IntervalDomain::top(),
                }
            }
        }
    }

    fn div(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(interval), _) => match rhs.try_to_i64() {
                Ok(0) => Bottom,
                Ok(divisor) => {
                    if divisor > 0 {
                        IntervalDomain::new(
                            interval.lower.scale_div(divisor, BoundEnd::LowerBound),
                            interval.upper.scale_div(divisor, BoundEnd::UpperBound),
                        )
                    } else {
                        IntervalDomain::new(
                            interval.upper.scale_div(divisor, BoundEnd::LowerBound),
                            interval.lower.scale_div(divisor, BoundEnd::UpperBound),
                        )
                    }
                }
                Err(_) => {
                    if self.is_non_negative() && IntervalDomain::pos().leq_lower_of(rhs) {
                        // Dividing a non-negative value by a positive one
                        // shrinks it towards zero.
                        IntervalDomain::new(Bound::int(0), interval.upper.clone())
                    } else {
                        IntervalDomain::top()
                    }
                }
            },
        }
    }

    /// Returns true if the lower endpoint of `other` is at least the lower
    /// endpoint of `self`.
    fn leq_lower_of(&self, other: &IntervalDomain) -> bool {
        match (self.lower_bound(), other.lower_bound()) {
            (Some(own), Some(other)) => own.le(other),
            _ => false,
        }
    }

    fn rem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            _ => {
                if let (Ok(lhs), Ok(rhs)) = (self.try_to_i64(), rhs.try_to_i64()) {
                    return match lhs.checked_rem(rhs) {
                        Some(remainder) => IntervalDomain::of_i64(remainder),
                        None => Bottom,
                    };
                }
                let modulus = match rhs.try_to_i64() {
                    Ok(0) => return Bottom,
                    Ok(value) => Some(value.saturating_abs()),
                    Err(_) => match rhs.upper_bound().and_then(Bound::try_to_i64) {
                        Some(upper) if upper > 0 && rhs.is_non_negative() => Some(upper),
                        _ => None,
                    },
                };
                match modulus {
                    Some(modulus) => {
                        if self.is_non_negative() {
                            IntervalDomain::new_finite(0, modulus - 1)
                        } else if self.is_non_positive() {
                            IntervalDomain::new_finite(-(modulus - 1), 0)
                        } else {
                            IntervalDomain::new_finite(-(modulus - 1), modulus - 1)
                        }
                    }
                    None => IntervalDomain::top(),
                }
            }
        }
    }

    fn shift_left(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            _ => match rhs.try_to_i64() {
                Ok(shift) if (0..63).contains(&shift) => self.scale(1i64 << shift),
                _ => IntervalDomain::top(),
            },
        }
    }

    fn shift_right(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(interval), _) => match rhs.try_to_i64() {
                Ok(shift) if (0..64).contains(&shift) => {
                    let shift_bound = |bound: &Bound, end| match bound.try_to_i64() {
                        Some(constant) => Bound::int(constant >> shift),
                        None => match bound {
                            Bound::MinusInfty => Bound::MinusInfty,
                            Bound::PlusInfty => Bound::PlusInfty,
                            _ => Bound::infty(end),
                        },
                    };
                    IntervalDomain::new(
                        shift_bound(&interval.lower, BoundEnd::LowerBound),
                        shift_bound(&interval.upper, BoundEnd::UpperBound),
                    )
                }
                _ => IntervalDomain::top(),
            },
        }
    }

    fn bit_and(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => {
                if self.is_non_negative() && rhs.is_non_negative() {
                    // The conjunction of two non-negative values is bounded by both.
                    let upper = if a.upper.le(&b.upper) {
                        a.upper.clone()
                    } else {
                        b.upper.clone()
                    };
                    IntervalDomain::new(Bound::int(0), upper)
                } else {
                    IntervalDomain::top()
                }
            }
        }
    }

    /// The boolean interval of `self < rhs`.
    fn lt_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => {
                if a.upper.lt(&b.lower) {
                    IntervalDomain::of_bool(true)
                } else if b.upper.le(&a.lower) {
                    IntervalDomain::of_bool(false)
                } else {
                    IntervalDomain::unknown_bool()
                }
            }
        }
    }

    /// The boolean interval of `self <= rhs`.
    fn le_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => {
                if a.upper.le(&b.lower) {
                    IntervalDomain::of_bool(true)
                } else if b.upper.lt(&a.lower) {
                    IntervalDomain::of_bool(false)
                } else {
                    IntervalDomain::unknown_bool()
                }
            }
        }
    }

    /// The boolean interval of `self == rhs`.
    fn eq_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            (Value(a), Value(b)) => {
                if a.lower == a.upper && b.lower == b.upper && a.lower == b.lower {
                    IntervalDomain::of_bool(true)
                } else if a.upper.lt(&b.lower) || b.upper.lt(&a.lower) {
                    IntervalDomain::of_bool(false)
                } else {
                    IntervalDomain::unknown_bool()
                }
            }
        }
    }

    /// The boolean interval of `self != rhs`.
    fn ne_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        match self.eq_sem(rhs) {
            IntervalDomain::Bottom => IntervalDomain::Bottom,
            result if result.eq_const(0) => IntervalDomain::of_bool(true),
            result if result.eq_const(1) => IntervalDomain::of_bool(false),
            _ => IntervalDomain::unknown_bool(),
        }
    }

    /// The boolean interval of `self && rhs`.
    fn land_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            _ => {
                if self.eq_const(0) || rhs.eq_const(0) {
                    IntervalDomain::of_bool(false)
                } else if !self.may_contain_zero() && !rhs.may_contain_zero() {
                    IntervalDomain::of_bool(true)
                } else {
                    IntervalDomain::unknown_bool()
                }
            }
        }
    }

    /// The boolean interval of `self || rhs`.
    fn lor_sem(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs) {
            (Bottom, _) | (_, Bottom) => Bottom,
            _ => {
                if !self.may_contain_zero() || !rhs.may_contain_zero() {
                    IntervalDomain::of_bool(true)
                } else if self.eq_const(0) && rhs.eq_const(0) {
                    IntervalDomain::of_bool(false)
                } else {
                    IntervalDomain::unknown_bool()
                }
            }
        }
    }

    /// The boolean interval of `!self`.
    fn lnot_sem(&self) -> IntervalDomain {
        match self {
            IntervalDomain::Bottom => IntervalDomain::Bottom,
            _ if self.eq_const(0) => IntervalDomain::of_bool(true),
            _ if !self.may_contain_zero() => IntervalDomain::of_bool(false),
            _ => IntervalDomain::unknown_bool(),
        }
    }

    /// Refine the interval under the assumption that its value equals zero.
    pub fn prune_eq_zero(&self) -> IntervalDomain {
        self.intersect(&IntervalDomain::zero())
    }

    /// Refine the interval under the assumption that its value is nonzero.
    pub fn prune_ne_zero(&self) -> IntervalDomain {
        self.prune_ne(&IntervalDomain::zero())
    }

    /// Refine the interval under the assumption that `self op rhs` holds,
    /// where `op` is one of the four ordering comparisons.
    /// Other operators leave the interval unchanged.
    pub fn prune_comp(&self, op: BinOpType, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        let (self_interval, rhs_interval) = match (self, rhs) {
            (Bottom, _) | (_, Bottom) => return Bottom,
            (Value(a), Value(b)) => (a, b),
        };
        let constraint = match op {
            BinOpType::Lt => Interval::new(
                Bound::MinusInfty,
                rhs_interval.upper.add_const(-1, BoundEnd::UpperBound),
            ),
            BinOpType::Le => Interval::new(Bound::MinusInfty, rhs_interval.upper.clone()),
            BinOpType::Gt => Interval::new(
                rhs_interval.lower.add_const(1, BoundEnd::LowerBound),
                Bound::PlusInfty,
            ),
            BinOpType::Ge => Interval::new(rhs_interval.lower.clone(), Bound::PlusInfty),
            _ => self_interval.clone(),
        };
        self.intersect(&IntervalDomain::Value(constraint))
    }

    /// Refine the interval under the assumption that its value equals a value of `rhs`.
    pub fn prune_eq(&self, rhs: &IntervalDomain) -> IntervalDomain {
        self.intersect(rhs)
    }

    /// Refine the interval under the assumption that its value differs from
    /// the value of `rhs`. Only constant `rhs` at one of the endpoints of
    /// `self` allows a refinement.
    pub fn prune_ne(&self, rhs: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, rhs.try_to_i64()) {
            (Bottom, _) => Bottom,
            (Value(interval), Ok(constant)) => {
                let mut pruned = interval.clone();
                if pruned.lower == Bound::int(constant) {
                    pruned.lower = pruned.lower.add_const(1, BoundEnd::LowerBound);
                }
                if pruned.upper == Bound::int(constant) {
                    pruned.upper = pruned.upper.add_const(-1, BoundEnd::UpperBound);
                }
                IntervalDomain::Value(pruned).normalize()
            }
            (Value(_), Err(_)) => self.clone(),
        }
    }
}

impl AbstractDomain for IntervalDomain {
    /// Compare two intervals. Incomparable symbolic endpoints yield `false`.
    fn leq(&self, other: &IntervalDomain) -> bool {
        use IntervalDomain::*;
        match (self, other) {
            (Bottom, _) => true,
            (_, Bottom) => false,
            (Value(a), Value(b)) => b.lower.le(&a.lower) && a.upper.le(&b.upper),
        }
    }

    /// Merge two intervals by joining their endpoints. Incomparable symbolic
    /// endpoints degrade to the matching infinity.
    fn join(&self, other: &IntervalDomain) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => x.clone(),
            (Value(a), Value(b)) => {
                let lower = if a.lower.le(&b.lower) {
                    a.lower.clone()
                } else if b.lower.le(&a.lower) {
                    b.lower.clone()
                } else {
                    Bound::MinusInfty
                };
                let upper = if b.upper.le(&a.upper) {
                    a.upper.clone()
                } else if a.upper.le(&b.upper) {
                    b.upper.clone()
                } else {
                    Bound::PlusInfty
                };
                IntervalDomain::new(lower, upper)
            }
        }
    }

    /// Widen by jumping to the matching infinity on every endpoint that is
    /// still growing, so that ascending chains stabilize after at most two steps.
    fn widen(&self, other: &IntervalDomain, _num_iters: u64) -> IntervalDomain {
        use IntervalDomain::*;
        match (self, other) {
            (Bottom, x) | (x, Bottom) => x.clone(),
            (Value(a), Value(b)) => {
                let lower = if a.lower.le(&b.lower) {
                    a.lower.clone()
                } else {
                    Bound::MinusInfty
                };
                let upper = if b.upper.le(&a.upper) {
                    a.upper.clone()
                } else {
                    Bound::PlusInfty
                };
                IntervalDomain::new(lower, upper)
            }
        }
    }
}

impl HasTop for IntervalDomain {
    /// Return the unconstrained interval.
    fn top() -> IntervalDomain {
        IntervalDomain::Value(Interval::new(Bound::MinusInfty, Bound::PlusInfty))
    }

    fn is_top(&self) -> bool {
        matches!(
            self,
            IntervalDomain::Value(Interval {
                lower: Bound::MinusInfty,
                upper: Bound::PlusInfty,
            })
        )
    }
}

impl HasBottom for IntervalDomain {
    fn bot() -> IntervalDomain {
        IntervalDomain::Bottom
    }

    fn is_bot(&self) -> bool {
        matches!(self, IntervalDomain::Bottom)
    }
}

impl Display for IntervalDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            IntervalDomain::Bottom => write!(f, "bot"),
            IntervalDomain::Value(interval) => {
                write!(f, "[{}, {}]", interval.lower, interval.upper)
            }
        }
    }
}
