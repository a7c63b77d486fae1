use crate::intermediate_representation::BinOpType;
use crate::prelude::*;
use itertools::Itertools;
use std::fmt::Display;
use std::ops::{Deref, DerefMut};

use super::{
    AbstractDomain, Allocsite, DomainMap, HasBottom, HasTop, IntervalDomain, Loc, PowLoc, Symbol,
    SymbolSet, UnionMergeStrategy,
};

/// The descriptor of the arrays allocated at one allocation site: where
/// inside the array a pointer may point (`offset`), how many elements the
/// array holds (`size`) and the byte stride of its elements.
///
/// Offsets and sizes are counted in elements, not bytes.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Hash, Clone)]
pub struct ArrayInfo {
    offset: IntervalDomain,
    size: IntervalDomain,
    stride: IntervalDomain,
}

impl ArrayInfo {
    /// Create a new array descriptor.
    pub fn new(offset: IntervalDomain, size: IntervalDomain, stride: IntervalDomain) -> ArrayInfo {
        ArrayInfo {
            offset,
            size,
            stride,
        }
    }

    /// Get the offset interval of the descriptor.
    pub fn offset(&self) -> &IntervalDomain {
        &self.offset
    }

    /// Get the size interval of the descriptor.
    pub fn size(&self) -> &IntervalDomain {
        &self.size
    }

    /// Get the stride interval of the descriptor.
    pub fn stride(&self) -> &IntervalDomain {
        &self.stride
    }

    /// The descriptor of an array about which nothing is known.
    fn unknown_info() -> ArrayInfo {
        ArrayInfo {
            offset: IntervalDomain::top(),
            size: IntervalDomain::top(),
            stride: IntervalDomain::top(),
        }
    }
}

impl AbstractDomain for ArrayInfo {
    fn leq(&self, other: &ArrayInfo) -> bool {
        self.offset.leq(&other.offset)
            && self.size.leq(&other.size)
            && self.stride.leq(&other.stride)
    }

    fn join(&self, other: &ArrayInfo) -> ArrayInfo {
        ArrayInfo {
            offset: self.offset.join(&other.offset),
            size: self.size.join(&other.size),
            stride: self.stride.join(&other.stride),
        }
    }

    fn widen(&self, other: &ArrayInfo, num_iters: u64) -> ArrayInfo {
        ArrayInfo {
            offset: self.offset.widen(&other.offset, num_iters),
            size: self.size.widen(&other.size, num_iters),
            stride: self.stride.widen(&other.stride, num_iters),
        }
    }
}

impl Display for ArrayInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "offset: {}, size: {}, stride: {}",
            self.offset, self.size, self.stride
        )
    }
}

/// The array descriptors of all allocation sites a value may refer to,
/// as a map from allocation site to [`ArrayInfo`].
///
/// The bottom element is the empty map; values that are not array pointers
/// carry it.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone, Default)]
pub struct ArrayBlock(DomainMap<Allocsite, ArrayInfo, UnionMergeStrategy>);

impl Deref for ArrayBlock {
    type Target = DomainMap<Allocsite, ArrayInfo, UnionMergeStrategy>;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl DerefMut for ArrayBlock {
    fn deref_mut(&mut self) -> &mut DomainMap<Allocsite, ArrayInfo, UnionMergeStrategy> {
        &mut self.0
    }
}

impl ArrayBlock {
    /// Create the descriptor map of a single freshly allocated array.
    pub fn make(
        allocsite: Allocsite,
        offset: IntervalDomain,
        size: IntervalDomain,
        stride: IntervalDomain,
    ) -> ArrayBlock {
        ArrayBlock(
            [(allocsite, ArrayInfo::new(offset, size, stride))]
                .into_iter()
                .collect(),
        )
    }

    /// The descriptor map standing for an array of unknown origin.
    pub fn unknown() -> ArrayBlock {
        ArrayBlock(
            [(Allocsite::Unknown, ArrayInfo::unknown_info())]
                .into_iter()
                .collect(),
        )
    }

    /// Replace the size interval of every descriptor in the map.
    pub fn set_length(&self, length: &IntervalDomain) -> ArrayBlock {
        self.map_info(|info| ArrayInfo::new(info.offset.clone(), length.clone(), info.stride.clone()))
    }

    /// Replace the stride interval of every descriptor in the map.
    /// Returns `self` unchanged if all strides already match.
    pub fn set_stride(&self, stride: &IntervalDomain) -> ArrayBlock {
        if self.0.values().all(|info| &info.stride == stride) {
            self.clone()
        } else {
            self.map_info(|info| {
                ArrayInfo::new(info.offset.clone(), info.size.clone(), stride.clone())
            })
        }
    }

    /// The join of the strides of all descriptors in the map.
    pub fn strideof(&self) -> IntervalDomain {
        self.0
            .values()
            .fold(IntervalDomain::Bottom, |acc, info| acc.join(&info.stride))
    }

    /// The locations of all arrays the map describes.
    pub fn get_pow_loc(&self) -> PowLoc {
        self.0
            .keys()
            .map(|allocsite| Loc::of_allocsite(allocsite.clone()))
            .collect()
    }

    /// Collect the symbols mentioned by the offset and size intervals.
    pub fn get_symbols(&self) -> SymbolSet {
        self.0.values().fold(SymbolSet::new(), |acc, info| {
            acc.union(&info.offset.get_symbols())
                .union(&info.size.get_symbols())
        })
    }

    /// Shift the offset of every descriptor by the given interval.
    pub fn plus_offset(&self, shift: &IntervalDomain) -> ArrayBlock {
        self.map_info(|info| {
            ArrayInfo::new(
                info.offset.bin_op(BinOpType::Plus, shift),
                info.size.clone(),
                info.stride.clone(),
            )
        })
    }

    /// Shift the offset of every descriptor backwards by the given interval.
    pub fn minus_offset(&self, shift: &IntervalDomain) -> ArrayBlock {
        self.map_info(|info| {
            ArrayInfo::new(
                info.offset.bin_op(BinOpType::Minus, shift),
                info.size.clone(),
                info.stride.clone(),
            )
        })
    }

    /// The interval of offset differences between two descriptor maps,
    /// joined over the allocation sites present in both.
    /// Yields the unconstrained interval when the maps share no site.
    pub fn diff(&self, other: &ArrayBlock) -> IntervalDomain {
        let mut result = IntervalDomain::Bottom;
        for (allocsite, info) in self.0.iter() {
            if let Some(other_info) = other.0.get(allocsite) {
                result = result.join(&info.offset.bin_op(BinOpType::Minus, &other_info.offset));
            }
        }
        if result.is_bot() {
            IntervalDomain::top()
        } else {
            result
        }
    }

    /// Refine the offsets under the assumption that `self op other` holds for
    /// the represented pointers, pairwise per shared allocation site.
    pub fn prune_comp(&self, op: BinOpType, other: &ArrayBlock) -> ArrayBlock {
        self.prune_with(other, |info, other_info| {
            ArrayInfo::new(
                info.offset.prune_comp(op, &other_info.offset),
                info.size.clone(),
                info.stride.clone(),
            )
        })
    }

    /// Refine offsets and sizes under the assumption that the represented
    /// pointers are equal, pairwise per shared allocation site.
    pub fn prune_eq(&self, other: &ArrayBlock) -> ArrayBlock {
        self.prune_with(other, |info, other_info| {
            ArrayInfo::new(
                info.offset.prune_eq(&other_info.offset),
                info.size.prune_eq(&other_info.size),
                info.stride.clone(),
            )
        })
    }

    /// Refine the offsets under the assumption that the represented pointers
    /// differ, pairwise per shared allocation site.
    pub fn prune_ne(&self, other: &ArrayBlock) -> ArrayBlock {
        self.prune_with(other, |info, other_info| {
            ArrayInfo::new(
                info.offset.prune_ne(&other_info.offset),
                info.size.clone(),
                info.stride.clone(),
            )
        })
    }

    /// Substitute the symbols of all offset and size intervals using `eval`.
    pub fn subst<F>(&self, eval: &F) -> ArrayBlock
    where
        F: Fn(&Symbol) -> IntervalDomain,
    {
        self.map_info(|info| {
            ArrayInfo::new(
                info.offset.subst(eval),
                info.size.subst(eval),
                info.stride.clone(),
            )
        })
        .normalize()
    }

    /// Drop descriptors whose offset or size became empty.
    pub fn normalize(&self) -> ArrayBlock {
        if self
            .0
            .values()
            .all(|info| !info.offset.is_bot() && !info.size.is_bot())
        {
            return self.clone();
        }
        ArrayBlock(
            self.0
                .iter()
                .filter(|(_, info)| !info.offset.is_bot() && !info.size.is_bot())
                .map(|(allocsite, info)| (allocsite.clone(), info.clone()))
                .collect(),
        )
    }

    fn map_info<F>(&self, f: F) -> ArrayBlock
    where
        F: Fn(&ArrayInfo) -> ArrayInfo,
    {
        ArrayBlock(
            self.0
                .iter()
                .map(|(allocsite, info)| (allocsite.clone(), f(info)))
                .collect(),
        )
    }

    fn prune_with<F>(&self, other: &ArrayBlock, f: F) -> ArrayBlock
    where
        F: Fn(&ArrayInfo, &ArrayInfo) -> ArrayInfo,
    {
        ArrayBlock(
            self.0
                .iter()
                .map(|(allocsite, info)| {
                    let pruned = match other.0.get(allocsite) {
                        Some(other_info) => f(info, other_info),
                        None => info.clone(),
                    };
                    (allocsite.clone(), pruned)
                })
                .collect(),
        )
        .normalize()
    }
}

impl AbstractDomain for ArrayBlock {
    fn leq(&self, other: &ArrayBlock) -> bool {
        self.0.leq(&other.0)
    }

    fn join(&self, other: &ArrayBlock) -> ArrayBlock {
        ArrayBlock(self.0.join(&other.0))
    }

    fn widen(&self, other: &ArrayBlock, num_iters: u64) -> ArrayBlock {
        ArrayBlock(self.0.widen(&other.0, num_iters))
    }
}

impl HasBottom for ArrayBlock {
    fn bot() -> ArrayBlock {
        ArrayBlock::default()
    }

    fn is_bot(&self) -> bool {
        self.0.is_empty()
    }
}

impl Display for ArrayBlock {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{{{}}}",
            self.0
                .iter()
                .map(|(allocsite, info)| format!("{allocsite} -> ({info})"))
                .format(", ")
        )
    }
}
