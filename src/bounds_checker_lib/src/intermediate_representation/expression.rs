use super::{Ident, Pvar};
use crate::prelude::*;

/// An expression is a calculation rule
/// on how to compute a certain value given program variables and temporaries
/// as input.
///
/// Expressions are produced by the front-end when lowering statements and
/// branch conditions. Computing the value of an expression is a
/// side-effect-free operation; the abstract semantics of each operator is
/// given by the corresponding operation on the value domain.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub enum Exp {
    /// An SSA temporary holding an intermediate result.
    Var(Ident),
    /// A source-level program variable.
    Lvar(Pvar),
    /// An integer literal.
    Const(i128),
    /// A binary operation.
    BinOp {
        /// The opcode/type of the operation.
        op: BinOpType,
        /// The left hand side expression.
        lhs: Box<Exp>,
        /// The right hand side expression.
        rhs: Box<Exp>,
    },
    /// A unary operation.
    UnOp {
        /// The opcode/type of the operation.
        op: UnOpType,
        /// The argument expression.
        arg: Box<Exp>,
    },
}

/// The opcodes of binary expressions.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum BinOpType {
    /// Integer addition.
    Plus,
    /// Integer subtraction.
    Minus,
    /// Integer multiplication.
    Mult,
    /// Integer division, truncating towards zero.
    Div,
    /// Integer remainder.
    Mod,
    /// Left shift.
    ShiftLeft,
    /// Arithmetic right shift.
    ShiftRight,
    /// Bitwise and.
    BitAnd,
    /// Strictly-less-than comparison.
    Lt,
    /// Strictly-greater-than comparison.
    Gt,
    /// Less-or-equal comparison.
    Le,
    /// Greater-or-equal comparison.
    Ge,
    /// Equality comparison.
    Eq,
    /// Disequality comparison.
    Ne,
    /// Logical and on boolean values.
    LogicalAnd,
    /// Logical or on boolean values.
    LogicalOr,
}

impl BinOpType {
    /// Return whether the operation is a comparison or logical connective,
    /// i.e. whether its result is a boolean value.
    pub fn is_comparative(&self) -> bool {
        use BinOpType::*;
        matches!(self, Lt | Gt | Le | Ge | Eq | Ne | LogicalAnd | LogicalOr)
    }
}

/// The opcodes of unary expressions.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone, Copy)]
pub enum UnOpType {
    /// Arithmetic negation.
    Neg,
    /// Bitwise complement.
    BitNot,
    /// Logical negation on boolean values.
    LogicalNot,
}

impl std::fmt::Display for Exp {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Exp::Var(id) => write!(f, "{id}"),
            Exp::Lvar(pvar) => write!(f, "&{pvar}"),
            Exp::Const(c) => write!(f, "{c}"),
            Exp::BinOp { op, lhs, rhs } => write!(f, "({lhs} {op:?} {rhs})"),
            Exp::UnOp { op, arg } => write!(f, "{op:?}({arg})"),
        }
    }
}
