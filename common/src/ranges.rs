//! Диапазоны строк `[start, end]` (включительно, 1-based)

use serde::{Deserialize, Serialize};

/// Диапазон строк. В JSON: пара `[start, end]`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(from = "[u32; 2]", into = "[u32; 2]")]
pub struct RowRange {
    pub start: u32,
    pub end: u32,
}

impl RowRange {
    pub fn new(start: u32, end: u32) -> Self {
        Self { start, end }
    }

    pub fn contains(&self, row: u32) -> bool {
        self.start <= row && row <= self.end
    }

    /// Полностью ли этот диапазон лежит внутри `outer`
    pub fn within(&self, outer: &RowRange) -> bool {
        outer.start <= self.start && self.end <= outer.end
    }

    pub fn intersects(&self, other: &RowRange) -> bool {
        !(self.end < other.start || other.end < self.start)
    }

    pub fn is_valid(&self) -> bool {
        self.start > 0 && self.end >= self.start
    }

    pub fn len(&self) -> u32 {
        if self.end < self.start {
            0
        } else {
            self.end - self.start + 1
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl From<[u32; 2]> for RowRange {
    fn from([start, end]: [u32; 2]) -> Self {
        Self { start, end }
    }
}

impl From<RowRange> for [u32; 2] {
    fn from(range: RowRange) -> Self {
        [range.start, range.end]
    }
}

/// Попадает ли строка хотя бы в один диапазон
pub fn point_in_ranges(row: u32, ranges: &[RowRange]) -> bool {
    ranges.iter().any(|r| r.contains(row))
}

/// Покрывают ли родительские диапазоны каждый дочерний
pub fn ranges_cover(parent: &[RowRange], child: &[RowRange]) -> bool {
    child
        .iter()
        .all(|c| parent.iter().any(|p| c.within(p)))
}

/// Объединение пересекающихся и смежных диапазонов
pub fn merge_ranges(ranges: &[RowRange]) -> Vec<RowRange> {
    let mut sorted: Vec<RowRange> = ranges.to_vec();
    sorted.sort_by_key(|r| r.start);

    let mut merged: Vec<RowRange> = Vec::with_capacity(sorted.len());
    for current in sorted {
        match merged.last_mut() {
            Some(last) if current.start <= last.end.saturating_add(1) => {
                last.end = last.end.max(current.end);
            }
            _ => merged.push(current),
        }
    }
    merged
}
