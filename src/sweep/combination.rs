//! Combination sweeps over numbered argument slots
//!
//! Slots are numbered from 1 and kept in a `BTreeMap`, so iteration order
//! is slot order regardless of insertion order. Only present slots take
//! part in the sweep.

use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use serde::Deserialize;

/// How per-slot value lists are combined into rows
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SweepMode {
    /// i-th row takes the i-th value of every slot, truncated to the shortest list
    #[default]
    Zip,
    /// Every combination, later slots varying fastest
    Product,
}

impl fmt::Display for SweepMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SweepMode::Zip => write!(f, "zip"),
            SweepMode::Product => write!(f, "product"),
        }
    }
}

impl FromStr for SweepMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "zip" => Ok(SweepMode::Zip),
            "product" => Ok(SweepMode::Product),
            other => Err(format!("unknown sweep mode '{}' (zip|product)", other)),
        }
    }
}

/// Ordered per-slot value lists plus the combination mode
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CombinationSet<T> {
    slots: BTreeMap<usize, Vec<T>>,
    mode: SweepMode,
}

impl<T: Clone> CombinationSet<T> {
    pub fn new(mode: SweepMode) -> Self {
        Self {
            slots: BTreeMap::new(),
            mode,
        }
    }

    pub fn from_slots(slots: BTreeMap<usize, Vec<T>>, mode: SweepMode) -> Self {
        Self { slots, mode }
    }

    /// Set the values of one slot, replacing any previous list
    pub fn slot(mut self, index: usize, values: impl IntoIterator<Item = T>) -> Self {
        self.slots.insert(index, values.into_iter().collect());
        self
    }

    pub fn mode(&self) -> SweepMode {
        self.mode
    }

    pub fn slots(&self) -> &BTreeMap<usize, Vec<T>> {
        &self.slots
    }

    /// Number of rows `build` will produce, without materializing them
    ///
    /// A product too large for `usize` saturates at `usize::MAX`.
    pub fn len(&self) -> usize {
        if self.slots.is_empty() {
            return 0;
        }
        let lens = self.slots.values().map(Vec::len);
        match self.mode {
            SweepMode::Zip => lens.min().unwrap_or(0),
            SweepMode::Product => product_len(lens).unwrap_or(usize::MAX),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Materialize every row, one value per participating slot
    pub fn build(&self) -> Vec<Vec<T>> {
        build(&self.slots, self.mode)
    }
}

/// Combine slot value lists into rows
///
/// Zero slots yield no rows in both modes.
pub fn build<T: Clone>(slots: &BTreeMap<usize, Vec<T>>, mode: SweepMode) -> Vec<Vec<T>> {
    if slots.is_empty() {
        return Vec::new();
    }
    let lists: Vec<&Vec<T>> = slots.values().collect();
    match mode {
        SweepMode::Zip => zip_rows(&lists),
        SweepMode::Product => product_rows(&lists),
    }
}

fn zip_rows<T: Clone>(lists: &[&Vec<T>]) -> Vec<Vec<T>> {
    let rows = lists.iter().map(|l| l.len()).min().unwrap_or(0);
    (0..rows)
        .map(|i| lists.iter().map(|l| l[i].clone()).collect())
        .collect()
}

/// Product of list lengths, `None` on overflow
fn product_len(lens: impl IntoIterator<Item = usize>) -> Option<usize> {
    lens.into_iter().try_fold(1usize, usize::checked_mul)
}

fn product_rows<T: Clone>(lists: &[&Vec<T>]) -> Vec<Vec<T>> {
    let total = product_len(lists.iter().map(|l| l.len()));
    if total == Some(0) {
        return Vec::new();
    }
    let mut rows = Vec::with_capacity(total.unwrap_or(0));

    // Odometer over list positions; the last slot turns fastest
    let mut cursor = vec![0usize; lists.len()];
    loop {
        rows.push(
            cursor
                .iter()
                .zip(lists)
                .map(|(&i, l)| l[i].clone())
                .collect(),
        );

        let mut pos = lists.len();
        loop {
            if pos == 0 {
                return rows;
            }
            pos -= 1;
            cursor[pos] += 1;
            if cursor[pos] < lists[pos].len() {
                break;
            }
            cursor[pos] = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn strs(v: &[&str]) -> Vec<String> {
        v.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn zip_pairs_positionally() {
        let set = CombinationSet::new(SweepMode::Zip)
            .slot(1, strs(&["a", "b", "c"]))
            .slot(2, strs(&["x", "y", "z"]));
        assert_eq!(
            set.build(),
            vec![strs(&["a", "x"]), strs(&["b", "y"]), strs(&["c", "z"])]
        );
    }

    #[test]
    fn zip_truncates_to_shortest() {
        let set = CombinationSet::new(SweepMode::Zip)
            .slot(1, strs(&["a", "b", "c"]))
            .slot(2, strs(&["x"]));
        assert_eq!(set.len(), 1);
        assert_eq!(set.build(), vec![strs(&["a", "x"])]);
    }

    #[test]
    fn product_later_slots_vary_fastest() {
        let set = CombinationSet::new(SweepMode::Product)
            .slot(1, strs(&["a", "b"]))
            .slot(2, strs(&["x", "y", "z"]));
        assert_eq!(
            set.build(),
            vec![
                strs(&["a", "x"]),
                strs(&["a", "y"]),
                strs(&["a", "z"]),
                strs(&["b", "x"]),
                strs(&["b", "y"]),
                strs(&["b", "z"]),
            ]
        );
    }

    #[test]
    fn slot_order_not_insertion_order() {
        let set = CombinationSet::new(SweepMode::Zip)
            .slot(2, strs(&["second"]))
            .slot(1, strs(&["first"]));
        assert_eq!(set.build(), vec![strs(&["first", "second"])]);
    }

    #[test]
    fn sparse_slots_participate_in_order() {
        let set = CombinationSet::new(SweepMode::Product)
            .slot(3, vec![30, 31])
            .slot(1, vec![10]);
        assert_eq!(set.build(), vec![vec![10, 30], vec![10, 31]]);
    }

    #[test]
    fn empty_slot_set_is_empty_in_both_modes() {
        let zip: CombinationSet<String> = CombinationSet::new(SweepMode::Zip);
        let product: CombinationSet<String> = CombinationSet::new(SweepMode::Product);
        assert!(zip.build().is_empty());
        assert!(product.build().is_empty());
        assert!(zip.is_empty());
        assert_eq!(product.len(), 0);
    }

    #[test]
    fn product_with_empty_list_is_empty() {
        let set = CombinationSet::new(SweepMode::Product)
            .slot(1, vec![1, 2])
            .slot(2, Vec::<i32>::new());
        assert!(set.build().is_empty());
    }

    #[test]
    fn single_slot_yields_one_value_rows() {
        let set = CombinationSet::new(SweepMode::Product).slot(1, vec!["a", "b"]);
        assert_eq!(set.build(), vec![vec!["a"], vec!["b"]]);
    }

    #[test]
    fn product_len_reports_overflow() {
        assert_eq!(product_len([2, 3, 4]), Some(24));
        assert_eq!(product_len([5, 0, usize::MAX]), Some(0));
        assert_eq!(product_len([usize::MAX, 2]), None);
        assert_eq!(product_len(std::iter::repeat(1 << 20).take(4)), None);
    }

    #[test]
    fn mode_parses_from_str() {
        assert_eq!("zip".parse::<SweepMode>().unwrap(), SweepMode::Zip);
        assert_eq!("product".parse::<SweepMode>().unwrap(), SweepMode::Product);
        assert!("cartesian".parse::<SweepMode>().is_err());
    }
}
