//! Contiguous value ranges of enumerants

use serde::Serialize;

/// A maximal run of consecutive values, named by its first and last enumerant
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ValueRange {
    pub first: String,
    pub last: String,
}

impl ValueRange {
    pub fn is_single(&self) -> bool {
        self.first == self.last
    }
}

/// Split (name, value) pairs into maximal runs of consecutive values.
///
/// Pairs are ordered by value first; equal values break a run.
pub fn find_contiguous_ranges(values: &[(String, i64)]) -> Vec<ValueRange> {
    let mut sorted: Vec<&(String, i64)> = values.iter().collect();
    sorted.sort_by_key(|(_, value)| *value);

    let mut ranges = Vec::new();
    let mut iter = sorted.into_iter();
    let Some((first_name, first_value)) = iter.next() else {
        return ranges;
    };

    let mut start = first_name;
    let (mut prev_name, mut prev_value) = (first_name, *first_value);
    for (name, value) in iter {
        if prev_value.checked_add(1) != Some(*value) {
            ranges.push(ValueRange {
                first: start.clone(),
                last: prev_name.clone(),
            });
            start = name;
        }
        prev_name = name;
        prev_value = *value;
    }
    ranges.push(ValueRange {
        first: start.clone(),
        last: prev_name.clone(),
    });
    ranges
}
