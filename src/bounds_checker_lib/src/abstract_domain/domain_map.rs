use std::collections::BTreeMap;
use std::marker::PhantomData;
use std::ops::Deref;
use std::ops::DerefMut;
use std::sync::Arc;

use crate::prelude::*;

use super::AbstractDomain;

/// A `DomainMap<Key, Value, MapLatticeStrategy>` is a wrapper type around a `BTreeMap<Key, Value>`
/// where the `Value` type is an abstract domain and the map itself is also an abstract domain.
///
/// For example, a map from abstract locations to an abstract domain representing
/// the contained values can be represented by a `DomainMap`.
///
/// A `DomainMap` has two main advantages over a regular `BTreeMap`:
/// * The map itself is wrapped into an `Arc<..>` to enable cheap cloning of `DomainMaps`.
/// * The `DomainMap` automatically implements the [`AbstractDomain`] trait
///   according to the provided [`MapLatticeStrategy`], which determines the
///   meaning of keys that are absent from the map.
///
/// Since a `DomainMap` implements the `Deref` and `DerefMut` traits with target the inner `BTreeMap`,
/// it can be used just like a `BTreeMap`.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    inner: Arc<BTreeMap<K, V>>,
    phantom: PhantomData<S>,
}

impl<K, V, S> Deref for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    type Target = BTreeMap<K, V>;

    fn deref(&self) -> &Self::Target {
        &self.inner
    }
}

impl<K, V, S> DerefMut for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    fn deref_mut(&mut self) -> &mut BTreeMap<K, V> {
        Arc::make_mut(&mut self.inner)
    }
}

impl<K, V, S> Default for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    fn default() -> Self {
        DomainMap {
            inner: Arc::new(BTreeMap::new()),
            phantom: PhantomData,
        }
    }
}

impl<K, V, S> From<BTreeMap<K, V>> for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    /// Generate a new `DomainMap` from the `BTreeMap` that it should contain.
    fn from(map: BTreeMap<K, V>) -> Self {
        DomainMap {
            inner: Arc::new(map),
            phantom: PhantomData,
        }
    }
}

impl<K, V, S> FromIterator<(K, V)> for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V>,
{
    /// Generate a new `DomainMap` from an iterator over the key-value pairs that it should contain.
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
    {
        DomainMap {
            inner: Arc::new(iter.into_iter().collect()),
            phantom: PhantomData,
        }
    }
}

impl<K, V, S> AbstractDomain for DomainMap<K, V, S>
where
    K: PartialOrd + Ord + Clone,
    V: AbstractDomain,
    S: MapLatticeStrategy<K, V> + Clone + Eq,
{
    /// Compare two `DomainMaps` according to the [`MapLatticeStrategy`] of the `DomainMap`.
    fn leq(&self, other: &Self) -> bool {
        if Arc::ptr_eq(&self.inner, &other.inner) {
            true
        } else {
            S::leq_map(&self.inner, &other.inner)
        }
    }

    /// Merge two `DomainMaps` according to the [`MapLatticeStrategy`] of the `DomainMap`.
    fn join(&self, other: &Self) -> Self {
        if self == other {
            self.clone()
        } else {
            DomainMap {
                inner: Arc::new(S::join_map(&self.inner, &other.inner)),
                phantom: PhantomData,
            }
        }
    }

    /// Widen two `DomainMaps` according to the [`MapLatticeStrategy`] of the `DomainMap`.
    fn widen(&self, other: &Self, num_iters: u64) -> Self {
        if self == other {
            self.clone()
        } else {
            DomainMap {
                inner: Arc::new(S::widen_map(&self.inner, &other.inner, num_iters)),
                phantom: PhantomData,
            }
        }
    }
}

/// A `MapLatticeStrategy` determines how the lattice operations of a [`DomainMap`] work.
///
/// The possible strategies are:
/// * [`UnionMergeStrategy`]
/// * [`IntersectMergeStrategy`]
pub trait MapLatticeStrategy<K: Ord + Clone, V: AbstractDomain> {
    /// This function determines how two [`DomainMap`] instances are compared as abstract domains.
    fn leq_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> bool;

    /// This function determines how two [`DomainMap`] instances are joined as abstract domains.
    fn join_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> BTreeMap<K, V>;

    /// This function determines how two [`DomainMap`] instances are widened as abstract domains.
    fn widen_map(
        map_left: &BTreeMap<K, V>,
        map_right: &BTreeMap<K, V>,
        num_iters: u64,
    ) -> BTreeMap<K, V>;
}

/// A [`MapLatticeStrategy`] where keys not present in the map have an implicit
/// bottom value of the value domain associated to them.
///
/// Consequently, key-value pairs whose key is only present in one input map
/// are added unchanged to the joined map, and a map is less or equal to
/// another map if each of its entries is less or equal to the corresponding
/// entry of the other map.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct UnionMergeStrategy {
    _private: (), // Marker to prevent instantiation
}

impl<K: Ord + Clone, V: AbstractDomain> MapLatticeStrategy<K, V> for UnionMergeStrategy {
    fn leq_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> bool {
        map_left
            .iter()
            .all(|(key, value)| map_right.get(key).is_some_and(|other| value.leq(other)))
    }

    fn join_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> BTreeMap<K, V> {
        let mut joined_map = map_left.clone();
        for (key, value_right) in map_right.iter() {
            joined_map
                .entry(key.clone())
                .and_modify(|value| {
                    *value = value.join(value_right);
                })
                .or_insert_with(|| value_right.clone());
        }
        joined_map
    }

    fn widen_map(
        map_left: &BTreeMap<K, V>,
        map_right: &BTreeMap<K, V>,
        num_iters: u64,
    ) -> BTreeMap<K, V> {
        let mut widened_map = map_left.clone();
        for (key, value_right) in map_right.iter() {
            widened_map
                .entry(key.clone())
                .and_modify(|value| {
                    *value = value.widen(value_right, num_iters);
                })
                .or_insert_with(|| value_right.clone());
        }
        widened_map
    }
}

/// A [`MapLatticeStrategy`] for inverted maps: keys not present in the map
/// have an implicit top value associated to them, so a map with more entries
/// carries more information and is smaller in the partial order.
///
/// The join function only keeps keys that are present in both input maps.
#[derive(Serialize, Deserialize, Debug, PartialEq, Eq, Clone)]
pub struct IntersectMergeStrategy {
    _private: (), // Marker to prevent instantiation
}

impl<K: Ord + Clone, V: AbstractDomain> MapLatticeStrategy<K, V> for IntersectMergeStrategy {
    fn leq_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> bool {
        map_right
            .iter()
            .all(|(key, other)| map_left.get(key).is_some_and(|value| value.leq(other)))
    }

    fn join_map(map_left: &BTreeMap<K, V>, map_right: &BTreeMap<K, V>) -> BTreeMap<K, V> {
        let mut joined_map = BTreeMap::new();
        for (key, value_left) in map_left.iter() {
            if let Some(value_right) = map_right.get(key) {
                joined_map.insert(key.clone(), value_left.join(value_right));
            }
        }
        joined_map
    }

    fn widen_map(
        map_left: &BTreeMap<K, V>,
        map_right: &BTreeMap<K, V>,
        num_iters: u64,
    ) -> BTreeMap<K, V> {
        let mut widened_map = BTreeMap::new();
        for (key, value_left) in map_left.iter() {
            if let Some(value_right) = map_right.get(key) {
                widened_map.insert(key.clone(), value_left.widen(value_right, num_iters));
            }
        }
        widened_map
    }
}

#[cfg(test)]
mod tests {
    use super::super::IntervalDomain;
    use super::*;

    #[test]
    fn union_merge_strategy() {
        let map_left: DomainMap<u64, IntervalDomain, UnionMergeStrategy> = [
            (0u64, IntervalDomain::of_i64(0)),
            (1u64, IntervalDomain::of_i64(0)),
        ]
        .into_iter()
        .collect();
        let map_right: DomainMap<u64, IntervalDomain, UnionMergeStrategy> = [
            (1u64, IntervalDomain::of_i64(1)),
            (2u64, IntervalDomain::of_i64(1)),
        ]
        .into_iter()
        .collect();

        let joined_map = map_left.join(&map_right);
        assert_eq!(joined_map.get(&0), Some(&IntervalDomain::of_i64(0)));
        assert_eq!(joined_map.get(&1), Some(&IntervalDomain::new_finite(0, 1)));
        assert_eq!(joined_map.get(&2), Some(&IntervalDomain::of_i64(1)));

        assert!(map_left.leq(&joined_map));
        assert!(map_right.leq(&joined_map));
        assert!(!joined_map.leq(&map_left));
        // The empty map is the bottom element of the union strategy.
        let empty: DomainMap<u64, IntervalDomain, UnionMergeStrategy> = DomainMap::default();
        assert!(empty.leq(&map_left));
    }

    #[test]
    fn intersect_merge_strategy() {
        let map_left: DomainMap<u64, IntervalDomain, IntersectMergeStrategy> = [
            (0u64, IntervalDomain::of_i64(0)),
            (1u64, IntervalDomain::of_i64(0)),
        ]
        .into_iter()
        .collect();
        let map_right: DomainMap<u64, IntervalDomain, IntersectMergeStrategy> = [
            (1u64, IntervalDomain::of_i64(1)),
            (2u64, IntervalDomain::of_i64(1)),
        ]
        .into_iter()
        .collect();

        let joined_map = map_left.join(&map_right);
        assert_eq!(joined_map.get(&0), None);
        assert_eq!(joined_map.get(&1), Some(&IntervalDomain::new_finite(0, 1)));
        assert_eq!(joined_map.get(&2), None);

        assert!(map_left.leq(&joined_map));
        assert!(map_right.leq(&joined_map));
        // The empty map is the top element of the intersect strategy.
        let empty: DomainMap<u64, IntervalDomain, IntersectMergeStrategy> = DomainMap::default();
        assert!(map_left.leq(&empty));
        assert!(!empty.leq(&map_left));
    }

    #[test]
    fn widening_stabilizes() {
        let mut map: DomainMap<u64, IntervalDomain, UnionMergeStrategy> =
            [(0u64, IntervalDomain::of_i64(0))].into_iter().collect();
        for round in 0..5i64 {
            let next: DomainMap<u64, IntervalDomain, UnionMergeStrategy> =
                [(0u64, IntervalDomain::new_finite(0, round + 1))]
                    .into_iter()
                    .collect();
            let widened = map.widen(&next, round as u64);
            assert!(map.leq(&widened));
            assert!(next.leq(&widened));
            map = widened;
        }
        // The upper bound must have been widened away after repeated growth.
        assert!(IntervalDomain::nat().leq(map.get(&0).unwrap()));
    }
}
