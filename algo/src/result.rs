use crate::error::EngineError;
use serde::ser::{Serialize, SerializeMap, Serializer};
use std::collections::BTreeMap;
use std::ops::Index;

/// Immutable mapping from node id to a per-node outcome.
///
/// Stored as two parallel arrays sorted by node id, so lookups are a binary search and
/// iteration order is ascending id.
#[derive(Debug, Clone, PartialEq)]
pub struct ResultMap<V> {
    ids: Vec<u64>,
    values: Vec<V>,
}

impl<V> ResultMap<V> {
    /// `ids` must be strictly ascending and as long as `values`.
    pub(crate) fn from_dense(ids: Vec<u64>, values: Vec<V>) -> Self {
        debug_assert_eq!(ids.len(), values.len());
        debug_assert!(ids.windows(2).all(|w| w[0] < w[1]));
        Self { ids, values }
    }

    pub fn empty() -> Self {
        Self {
            ids: Vec::new(),
            values: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    pub fn get(&self, id: u64) -> Option<&V> {
        self.ids
            .binary_search(&id)
            .ok()
            .map(|idx| &self.values[idx])
    }

    pub fn contains_key(&self, id: u64) -> bool {
        self.ids.binary_search(&id).is_ok()
    }

    pub fn keys(&self) -> impl Iterator<Item = u64> + '_ {
        self.ids.iter().copied()
    }

    pub fn values(&self) -> impl Iterator<Item = &V> + '_ {
        self.values.iter()
    }

    pub fn iter(&self) -> impl Iterator<Item = (u64, &V)> + '_ {
        self.ids.iter().copied().zip(self.values.iter())
    }

    pub fn map_values<W>(&self, f: impl FnMut(&V) -> W) -> ResultMap<W> {
        ResultMap {
            ids: self.ids.clone(),
            values: self.values.iter().map(f).collect(),
        }
    }
}

impl<V: Ord + Copy> ResultMap<V> {
    pub fn distinct_count(&self) -> usize {
        let mut values = self.values.clone();
        values.sort_unstable();
        values.dedup();
        values.len()
    }

    /// Node ids grouped by value; each group is ascending.
    pub fn groups(&self) -> BTreeMap<V, Vec<u64>> {
        let mut groups: BTreeMap<V, Vec<u64>> = BTreeMap::new();
        for (id, value) in self.iter() {
            groups.entry(*value).or_default().push(id);
        }
        groups
    }
}

impl ResultMap<u64> {
    pub fn total(&self) -> u64 {
        self.values.iter().sum()
    }
}

impl ResultMap<f64> {
    pub fn sum(&self) -> f64 {
        self.values.iter().sum()
    }
}

impl<V> Default for ResultMap<V> {
    fn default() -> Self {
        Self::empty()
    }
}

/// Later duplicates of an id replace earlier ones.
impl<V> FromIterator<(u64, V)> for ResultMap<V> {
    fn from_iter<I: IntoIterator<Item = (u64, V)>>(iter: I) -> Self {
        let sorted: BTreeMap<u64, V> = iter.into_iter().collect();
        let (ids, values) = sorted.into_iter().unzip();
        Self { ids, values }
    }
}

impl<V> Index<u64> for ResultMap<V> {
    type Output = V;

    fn index(&self, id: u64) -> &V {
        match self.get(id) {
            Some(value) => value,
            None => panic!("node {} not present in result", id),
        }
    }
}

impl<V: Serialize> Serialize for ResultMap<V> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.len()))?;
        for (id, value) in self.iter() {
            map.serialize_entry(&id, value)?;
        }
        map.end()
    }
}

/// Holds an algorithm's published output. Empty until a run succeeds.
#[derive(Debug)]
pub(crate) struct ResultSlot<T> {
    value: Option<T>,
}

impl<T> ResultSlot<T> {
    pub(crate) fn clear(&mut self) {
        self.value = None;
    }

    pub(crate) fn publish(&mut self, value: T) {
        self.value = Some(value);
    }

    pub(crate) fn get(&self, algorithm: &str) -> Result<&T, EngineError> {
        self.value.as_ref().ok_or_else(|| {
            EngineError::InvalidState(format!(
                "{} result requested before a successful execute",
                algorithm
            ))
        })
    }
}

impl<T> Default for ResultSlot<T> {
    fn default() -> Self {
        Self { value: None }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_iter_sorts_and_replaces_duplicates() {
        let map: ResultMap<u64> = vec![(5, 1), (2, 7), (5, 3)].into_iter().collect();

        assert_eq!(map.len(), 2);
        assert_eq!(map.keys().collect::<Vec<_>>(), vec![2, 5]);
        assert_eq!(map[5], 3);
        assert_eq!(map.get(9), None);
        assert_eq!(map.total(), 10);
    }

    #[test]
    fn test_groups_and_distinct_count() {
        let map: ResultMap<u64> = vec![(1, 1), (2, 1), (3, 3), (4, 3), (5, 5)]
            .into_iter()
            .collect();

        assert_eq!(map.distinct_count(), 3);
        let groups = map.groups();
        assert_eq!(groups[&1], vec![1, 2]);
        assert_eq!(groups[&3], vec![3, 4]);
        assert_eq!(groups[&5], vec![5]);
    }

    #[test]
    fn test_serializes_as_json_object() {
        let map: ResultMap<f64> = vec![(2, 0.25), (1, 0.75)].into_iter().collect();
        let json = serde_json::to_string(&map).unwrap();
        assert_eq!(json, r#"{"1":0.75,"2":0.25}"#);
        assert_eq!(map.sum(), 1.0);
    }

    #[test]
    fn test_empty_slot_reports_invalid_state() {
        let slot: ResultSlot<u64> = ResultSlot::default();
        assert!(matches!(slot.get("page_rank"), Err(EngineError::InvalidState(_))));
    }
}
