use crate::intermediate_representation::{BinOpType, ProcName, UnOpType};
use crate::prelude::*;
use crate::utils::debug::ToJsonCompact;
use crate::utils::log::Diagnostics;
use std::fmt::Display;

use super::{
    AbstractDomain, Allocsite, ArrayBlock, Counter, HasBottom, HasTop, IntervalDomain, Loc,
    PowLoc, Sym, Symbol, SymbolPath, SymbolSet, SymbolTable, TraceElem, TraceSet,
};

#[cfg(test)]
mod tests;

/// The abstract value attached to every location and expression of the
/// analyzed procedure.
///
/// A value simultaneously tracks the numeric interval the quantity may lie
/// in, the non-array locations it may point to, the descriptors of the
/// arrays it may point into, the relational-store symbols naming it, and the
/// provenance traces recording how it arose. The
/// `represents_multiple_values` flag marks values summarizing several
/// concrete cells (e.g. all elements of an array); such values must never be
/// strongly updated.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct ValueDomain {
    itv: IntervalDomain,
    sym: Sym,
    powloc: PowLoc,
    array_block: ArrayBlock,
    offset_sym: Sym,
    size_sym: Sym,
    traces: TraceSet,
    represents_multiple_values: bool,
}

impl ValueDomain {
    /// The value of a numeric cell about which nothing is known: top
    /// interval, but provably not a pointer.
    pub fn top_interval() -> ValueDomain {
        ValueDomain {
            itv: IntervalDomain::top(),
            ..ValueDomain::bot()
        }
    }

    /// The value containing exactly the given integer.
    pub fn of_i64(value: i64) -> ValueDomain {
        ValueDomain::of_interval(IntervalDomain::of_i64(value), TraceSet::empty())
    }

    /// The value containing exactly the given wide integer.
    pub fn of_i128(value: i128) -> ValueDomain {
        ValueDomain::of_interval(IntervalDomain::of_i128(value), TraceSet::empty())
    }

    /// The value of a numeric quantity lying in the given interval.
    pub fn of_interval(itv: IntervalDomain, traces: TraceSet) -> ValueDomain {
        ValueDomain {
            itv,
            traces,
            ..ValueDomain::bot()
        }
    }

    /// The value of a pointer to the single given (non-array) location.
    pub fn of_loc(loc: Loc) -> ValueDomain {
        ValueDomain::of_pow_loc(PowLoc::singleton(loc), TraceSet::empty())
    }

    /// The value of a pointer to one of the given (non-array) locations.
    pub fn of_pow_loc(powloc: PowLoc, traces: TraceSet) -> ValueDomain {
        ValueDomain {
            powloc,
            traces,
            ..ValueDomain::bot()
        }
    }

    /// The value of a pointer to the array freshly allocated at `allocsite`.
    ///
    /// An unknown `stride` defaults to the natural numbers. The offset and
    /// size of the array are named in the relational store under symbols
    /// derived from the allocation site.
    pub fn of_array_alloc(
        allocsite: Allocsite,
        stride: Option<i64>,
        offset: IntervalDomain,
        size: IntervalDomain,
        traces: TraceSet,
    ) -> ValueDomain {
        let stride = match stride {
            Some(stride) => IntervalDomain::of_i64(stride),
            None => IntervalDomain::nat(),
        };
        ValueDomain {
            array_block: ArrayBlock::make(allocsite.clone(), offset, size, stride),
            offset_sym: Sym::of_allocsite_offset(&allocsite),
            size_sym: Sym::of_allocsite_size(&allocsite),
            traces,
            ..ValueDomain::bot()
        }
    }

    /// The symbolic value standing for the unknown input read from `loc`
    /// through the access path `path`.
    ///
    /// The interval symbols are interned in the shared symbol table; the
    /// relational store names the value after the location it was read from;
    /// a trace element records the symbolic assignment; and the value is
    /// marked as summarizing multiple cells whenever the path is.
    pub fn make_symbolic(
        loc: &Loc,
        proc: &ProcName,
        path: &SymbolPath,
        table: &mut SymbolTable,
        counter: &mut Counter,
        location: &Tid,
        unsigned: bool,
    ) -> ValueDomain {
        ValueDomain {
            itv: IntervalDomain::make_sym(proc, path, table, counter, unsigned),
            sym: Sym::of_loc(loc),
            traces: TraceSet::singleton(TraceElem::SymAssign(loc.clone(), location.clone())),
            represents_multiple_values: path.represents_multiple_values(),
            ..ValueDomain::bot()
        }
    }

    /// The value returned by a call to an unmodeled procedure: everything is
    /// possible, and a trace element records where the value came from.
    pub fn unknown_from(callee: Option<&ProcName>, location: &Tid) -> ValueDomain {
        ValueDomain {
            itv: IntervalDomain::top(),
            powloc: PowLoc::unknown(),
            array_block: ArrayBlock::unknown(),
            traces: TraceSet::singleton(TraceElem::UnknownFrom(callee.cloned(), location.clone())),
            ..ValueDomain::bot()
        }
    }

    /// Get the interval of the value.
    pub fn get_itv(&self) -> &IntervalDomain {
        &self.itv
    }

    /// Get the relational symbol naming the value.
    pub fn get_sym(&self) -> &Sym {
        &self.sym
    }

    /// Get the set of non-array locations the value may point to.
    pub fn get_pow_loc(&self) -> &PowLoc {
        &self.powloc
    }

    /// Get the array descriptors of the value.
    pub fn get_array_blk(&self) -> &ArrayBlock {
        &self.array_block
    }

    /// Get the relational symbol naming the array offset of the value.
    pub fn get_offset_sym(&self) -> &Sym {
        &self.offset_sym
    }

    /// Get the relational symbol naming the array size of the value.
    pub fn get_size_sym(&self) -> &Sym {
        &self.size_sym
    }

    /// Get the provenance traces of the value.
    pub fn get_traces(&self) -> &TraceSet {
        &self.traces
    }

    /// Returns true if the value summarizes several concrete cells.
    pub fn represents_multiple_values(&self) -> bool {
        self.represents_multiple_values
    }

    /// Return the value with its traces replaced.
    pub fn with_traces(&self, traces: TraceSet) -> ValueDomain {
        ValueDomain {
            traces,
            ..self.clone()
        }
    }

    /// Return the value marked as summarizing several concrete cells.
    pub fn with_represents_multiple_values(&self) -> ValueDomain {
        ValueDomain {
            represents_multiple_values: true,
            ..self.clone()
        }
    }

    /// All locations the value may point to, including the arrays described
    /// by its array block.
    pub fn get_all_locs(&self) -> PowLoc {
        self.powloc.union(&self.array_block.get_pow_loc())
    }

    /// Collect the bound symbols mentioned by the interval and the array block.
    pub fn get_symbols(&self) -> SymbolSet {
        self.itv.get_symbols().union(&self.array_block.get_symbols())
    }

    /// Returns true if the value may be a pointer (to a location or into an array).
    fn has_pointer_info(&self) -> bool {
        !self.powloc.is_bot() || !self.array_block.is_bot()
    }

    /// Returns true if the value points to non-array locations only.
    fn is_pointer_to_non_array(&self) -> bool {
        !self.powloc.is_bot() && self.array_block.is_bot()
    }

    /// Compute the (abstract) result of a binary operation between two values.
    ///
    /// Arithmetic results carry only the computed interval; the domain does
    /// not track pointers through arithmetic (see the pointer-specific
    /// operations for array offset arithmetic). Comparisons on possible
    /// pointers yield the undetermined boolean, since the domain does not
    /// reason about pointer-value equality.
    pub fn bin_op(&self, op: BinOpType, rhs: &ValueDomain) -> ValueDomain {
        let itv = if op.is_comparative() && (self.has_pointer_info() || rhs.has_pointer_info()) {
            IntervalDomain::unknown_bool()
        } else {
            self.itv.bin_op(op, &rhs.itv)
        };
        ValueDomain {
            itv,
            traces: self.traces.join(&rhs.traces),
            ..ValueDomain::bot()
        }
    }

    /// Compute the (abstract) result of a unary operation on the value.
    pub fn un_op(&self, op: UnOpType) -> ValueDomain {
        ValueDomain {
            itv: self.itv.un_op(op),
            traces: self.traces.clone(),
            ..ValueDomain::bot()
        }
    }

    /// Shift an array pointer forwards by the given index value.
    ///
    /// Pointer arithmetic on a pointer to a non-array collapses to the
    /// unconstrained interval, losing the pointer.
    pub fn add_pointer_offset(&self, index: &ValueDomain) -> ValueDomain {
        let traces = self.traces.join(&index.traces);
        if self.is_pointer_to_non_array() {
            ValueDomain {
                itv: IntervalDomain::top(),
                traces,
                ..ValueDomain::bot()
            }
        } else {
            ValueDomain {
                array_block: self.array_block.plus_offset(&index.itv),
                traces,
                ..ValueDomain::bot()
            }
        }
    }

    /// Shift an array pointer backwards by the given index value.
    pub fn sub_pointer_offset(&self, index: &ValueDomain) -> ValueDomain {
        let traces = self.traces.join(&index.traces);
        if self.is_pointer_to_non_array() {
            ValueDomain {
                itv: IntervalDomain::top(),
                traces,
                ..ValueDomain::bot()
            }
        } else {
            ValueDomain {
                array_block: self.array_block.minus_offset(&index.itv),
                traces,
                ..ValueDomain::bot()
            }
        }
    }

    /// The numeric difference of two array pointers.
    /// Collapses to the unconstrained interval if both point to non-arrays.
    pub fn pointer_diff(&self, rhs: &ValueDomain) -> ValueDomain {
        let traces = self.traces.join(&rhs.traces);
        let itv = if self.is_pointer_to_non_array() && rhs.is_pointer_to_non_array() {
            IntervalDomain::top()
        } else {
            self.array_block.diff(&rhs.array_block)
        };
        ValueDomain {
            itv,
            traces,
            ..ValueDomain::bot()
        }
    }

    /// Refine the value under the assumption that it equals zero.
    pub fn prune_eq_zero(&self) -> ValueDomain {
        ValueDomain {
            itv: self.itv.prune_eq_zero(),
            ..self.clone()
        }
    }

    /// Refine the value under the assumption that it is nonzero.
    pub fn prune_ne_zero(&self) -> ValueDomain {
        ValueDomain {
            itv: self.itv.prune_ne_zero(),
            ..self.clone()
        }
    }

    /// Refine the value under the assumption that `self op rhs` holds for an
    /// ordering comparison. Besides the interval this also refines the array
    /// offsets, which lets bounds tests shrink array descriptors.
    pub fn prune_comp(
        &self,
        op: BinOpType,
        rhs: &ValueDomain,
        diag: &mut Diagnostics,
    ) -> ValueDomain {
        self.note_pruned_summary(diag);
        ValueDomain {
            itv: self.itv.prune_comp(op, &rhs.itv),
            array_block: self.array_block.prune_comp(op, &rhs.array_block),
            traces: self.traces.join(&rhs.traces),
            ..self.clone()
        }
    }

    /// Refine the value under the assumption that it equals `rhs`.
    pub fn prune_eq(&self, rhs: &ValueDomain, diag: &mut Diagnostics) -> ValueDomain {
        self.note_pruned_summary(diag);
        ValueDomain {
            itv: self.itv.prune_eq(&rhs.itv),
            array_block: self.array_block.prune_eq(&rhs.array_block),
            traces: self.traces.join(&rhs.traces),
            ..self.clone()
        }
    }

    /// Refine the value under the assumption that it differs from `rhs`.
    pub fn prune_ne(&self, rhs: &ValueDomain, diag: &mut Diagnostics) -> ValueDomain {
        self.note_pruned_summary(diag);
        ValueDomain {
            itv: self.itv.prune_ne(&rhs.itv),
            array_block: self.array_block.prune_ne(&rhs.array_block),
            traces: self.traces.join(&rhs.traces),
            ..self.clone()
        }
    }

    fn note_pruned_summary(&self, diag: &mut Diagnostics) {
        if self.represents_multiple_values {
            diag.html_note(|| format!("Pruning a value summarizing multiple cells: {self}"));
        }
    }

    /// Instantiate the symbols of a callee-side value at a call site.
    ///
    /// `eval_symbol` maps each bound symbol to its caller-side interval and
    /// `trace_of_symbol` to the caller-side traces of the value it was
    /// created from. The resulting traces record the call; the resulting
    /// interval and array block are the substituted ones.
    pub fn substitute<E, T>(
        &self,
        eval_symbol: &E,
        trace_of_symbol: &T,
        call_site: &Tid,
    ) -> ValueDomain
    where
        E: Fn(&Symbol) -> IntervalDomain,
        T: Fn(&Symbol) -> TraceSet,
    {
        let mut caller_traces = TraceSet::empty();
        for symbol in self.get_symbols().iter() {
            caller_traces = caller_traces.join(&trace_of_symbol(symbol));
        }
        ValueDomain {
            itv: self.itv.subst(eval_symbol),
            array_block: self.array_block.subst(eval_symbol),
            traces: TraceSet::call(call_site, &caller_traces, &self.traces),
            ..self.clone()
        }
        .normalize()
    }

    /// Replace the array length of the value and record the declaration in
    /// its traces.
    pub fn set_array_length(&self, location: &Tid, length: &ValueDomain) -> ValueDomain {
        ValueDomain {
            array_block: self.array_block.set_length(&length.itv),
            traces: self.traces.add_elem(TraceElem::ArrDecl(location.clone())),
            ..self.clone()
        }
    }

    /// Replace the array stride of the value, if it differs from the current one.
    pub fn set_array_stride(&self, stride: i64) -> ValueDomain {
        let stride = IntervalDomain::of_i64(stride);
        if self.array_block.strideof() == stride {
            self.clone()
        } else {
            ValueDomain {
                array_block: self.array_block.set_stride(&stride),
                ..self.clone()
            }
        }
    }

    /// Materialize the relational-store symbols of a value stored to the heap
    /// location `loc`: the value is henceforth known to the store under the
    /// symbols of that location.
    pub fn with_symbols_of_loc(&self, loc: &Loc) -> ValueDomain {
        let sym = if self.itv.is_bot() {
            Sym::Bottom
        } else {
            Sym::of_loc(loc)
        };
        let (offset_sym, size_sym) = if self.array_block.is_bot() {
            (Sym::Bottom, Sym::Bottom)
        } else {
            (Sym::of_loc_offset(loc), Sym::of_loc_size(loc))
        };
        ValueDomain {
            sym,
            offset_sym,
            size_sym,
            ..self.clone()
        }
    }

    /// Map a value whose numeric and pointer components all became empty to
    /// the bottom value.
    pub fn normalize(self) -> ValueDomain {
        let normalized = ValueDomain {
            itv: self.itv.clone().normalize(),
            array_block: self.array_block.normalize(),
            ..self
        };
        if normalized.itv.is_bot()
            && normalized.powloc.is_bot()
            && normalized.array_block.is_bot()
        {
            ValueDomain::bot()
        } else {
            normalized
        }
    }
}

impl AbstractDomain for ValueDomain {
    fn leq(&self, other: &ValueDomain) -> bool {
        if self == other {
            return true;
        }
        self.itv.leq(&other.itv)
            && self.sym.leq(&other.sym)
            && self.powloc.leq(&other.powloc)
            && self.array_block.leq(&other.array_block)
            && self.offset_sym.leq(&other.offset_sym)
            && self.size_sym.leq(&other.size_sym)
            && self.traces.leq(&other.traces)
            && (!self.represents_multiple_values || other.represents_multiple_values)
    }

    /// Merge two values componentwise. Joining never shrinks any component.
    fn join(&self, other: &ValueDomain) -> ValueDomain {
        if self == other {
            return self.clone();
        }
        ValueDomain {
            itv: self.itv.join(&other.itv),
            sym: self.sym.join(&other.sym),
            powloc: self.powloc.join(&other.powloc),
            array_block: self.array_block.join(&other.array_block),
            offset_sym: self.offset_sym.join(&other.offset_sym),
            size_sym: self.size_sym.join(&other.size_sym),
            traces: self.traces.join(&other.traces),
            represents_multiple_values: self.represents_multiple_values
                || other.represents_multiple_values,
        }
    }

    /// Widen componentwise, delegating the iteration count to each component.
    fn widen(&self, other: &ValueDomain, num_iters: u64) -> ValueDomain {
        if self == other {
            return self.clone();
        }
        ValueDomain {
            itv: self.itv.widen(&other.itv, num_iters),
            sym: self.sym.join(&other.sym),
            powloc: self.powloc.join(&other.powloc),
            array_block: self.array_block.widen(&other.array_block, num_iters),
            offset_sym: self.offset_sym.join(&other.offset_sym),
            size_sym: self.size_sym.join(&other.size_sym),
            traces: self.traces.join(&other.traces),
            represents_multiple_values: self.represents_multiple_values
                || other.represents_multiple_values,
        }
    }
}

impl HasBottom for ValueDomain {
    fn bot() -> ValueDomain {
        ValueDomain {
            itv: IntervalDomain::Bottom,
            sym: Sym::Bottom,
            powloc: PowLoc::empty(),
            array_block: ArrayBlock::bot(),
            offset_sym: Sym::Bottom,
            size_sym: Sym::Bottom,
            traces: TraceSet::empty(),
            represents_multiple_values: false,
        }
    }

    fn is_bot(&self) -> bool {
        self.itv.is_bot()
            && self.sym.is_bot()
            && self.powloc.is_bot()
            && self.array_block.is_bot()
            && self.offset_sym.is_bot()
            && self.size_sym.is_bot()
    }
}

impl Display for ValueDomain {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_bot() {
            return write!(f, "bot");
        }
        let mut sep = "";
        write!(f, "(")?;
        if !self.itv.is_bot() {
            write!(f, "itv: {}", self.itv)?;
            sep = ", ";
        }
        if !self.powloc.is_bot() {
            write!(f, "{sep}powloc: {}", self.powloc)?;
            sep = ", ";
        }
        if !self.array_block.is_bot() {
            write!(f, "{sep}arrayblk: {}", self.array_block)?;
            sep = ", ";
        }
        if self.represents_multiple_values {
            write!(f, "{sep}summary")?;
        }
        write!(f, ")")
    }
}

impl ToJsonCompact for ValueDomain {
    fn to_json_compact(&self) -> serde_json::Value {
        let mut map = serde_json::Map::new();
        if !self.itv.is_bot() {
            map.insert("itv".to_string(), self.itv.to_string().into());
        }
        if !matches!(self.sym, Sym::Bottom) {
            map.insert("sym".to_string(), self.sym.to_string().into());
        }
        if !self.powloc.is_bot() {
            map.insert("powloc".to_string(), self.powloc.to_string().into());
        }
        if !self.array_block.is_bot() {
            map.insert("arrayblk".to_string(), self.array_block.to_string().into());
            map.insert("offset_sym".to_string(), self.offset_sym.to_string().into());
            map.insert("size_sym".to_string(), self.size_sym.to_string().into());
        }
        if !self.traces.is_empty() {
            map.insert("traces".to_string(), self.traces.to_string().into());
        }
        if self.represents_multiple_values {
            map.insert("represents_multiple_values".to_string(), true.into());
        }
        serde_json::Value::Object(map)
    }
}
