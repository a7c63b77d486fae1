use crate::prelude::*;
use itertools::Itertools;
use std::fmt::Display;

use super::{IntervalDomain, SymbolSet};

/// A non-negative quantity used to bound loop trip counts: a known constant,
/// a bound depending on symbolic procedure inputs, or no known bound at all.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub enum NonNegativePolynomial {
    /// A known constant bound.
    Constant(u128),
    /// A finite bound that depends on the given input symbols.
    Symbolic(SymbolSet),
    /// No finite bound is known.
    Top,
}

impl NonNegativePolynomial {
    /// The multiplicative unit.
    pub fn one() -> NonNegativePolynomial {
        NonNegativePolynomial::Constant(1)
    }

    /// The number of values an interval may take, top-lifted: unbounded or
    /// symbol-free-but-infinite ranges yield `Top`, symbolic finite ranges
    /// record the symbols the bound depends on.
    pub fn of_interval_range(interval: &IntervalDomain) -> NonNegativePolynomial {
        if let Some(range) = interval.finite_range() {
            NonNegativePolynomial::Constant(range)
        } else if interval.has_infinite_bound() {
            NonNegativePolynomial::Top
        } else {
            NonNegativePolynomial::Symbolic(interval.get_symbols())
        }
    }

    /// Multiply two bounds. Multiplication saturates to `Top` on overflow;
    /// the constant zero annihilates every other bound.
    pub fn mult(&self, other: &NonNegativePolynomial) -> NonNegativePolynomial {
        use NonNegativePolynomial::*;
        match (self, other) {
            (Constant(0), _) | (_, Constant(0)) => Constant(0),
            (Constant(a), Constant(b)) => match a.checked_mul(*b) {
                Some(product) => Constant(product),
                None => Top,
            },
            (Constant(_), Symbolic(symbols)) | (Symbolic(symbols), Constant(_)) => {
                Symbolic(symbols.clone())
            }
            (Symbolic(a), Symbolic(b)) => Symbolic(a.union(b)),
            (Top, _) | (_, Top) => Top,
        }
    }
}

impl Display for NonNegativePolynomial {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NonNegativePolynomial::Constant(value) => write!(f, "{value}"),
            NonNegativePolynomial::Symbolic(symbols) => {
                write!(f, "f({})", symbols.iter().format(", "))
            }
            NonNegativePolynomial::Top => write!(f, "unbounded"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::abstract_domain::HasTop;

    #[test]
    fn interval_ranges() {
        assert_eq!(
            NonNegativePolynomial::of_interval_range(&IntervalDomain::new_finite(0, 9)),
            NonNegativePolynomial::Constant(10)
        );
        assert_eq!(
            NonNegativePolynomial::of_interval_range(&IntervalDomain::Bottom),
            NonNegativePolynomial::Constant(0)
        );
        assert_eq!(
            NonNegativePolynomial::of_interval_range(&IntervalDomain::top()),
            NonNegativePolynomial::Top
        );
    }

    #[test]
    fn multiplication_saturates() {
        let large = NonNegativePolynomial::Constant(u128::MAX);
        assert_eq!(
            large.mult(&NonNegativePolynomial::Constant(2)),
            NonNegativePolynomial::Top
        );
        assert_eq!(
            large.mult(&NonNegativePolynomial::Constant(0)),
            NonNegativePolynomial::Constant(0)
        );
        assert_eq!(
            NonNegativePolynomial::one().mult(&NonNegativePolynomial::Constant(5)),
            NonNegativePolynomial::Constant(5)
        );
    }
}
