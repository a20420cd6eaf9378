//! Python-style slices over query results.

use std::ops::{Range, RangeFrom, RangeFull, RangeTo};

use crate::error::{QueryError, Result};

/// A `start:stop:step` slice.
///
/// Negative bounds count from the end of the result and a negative step walks
/// it backwards, so such slices need the full result in memory.
///
/// # Example
///
/// ```
/// use itemstore_query_rs::queryset::Slice;
///
/// let items = ["a", "b", "c", "d", "e"];
/// assert_eq!(Slice::from(1..3).apply(&items), vec!["b", "c"]);
/// assert_eq!(Slice::new(None, None, -2).apply(&items), vec!["e", "c", "a"]);
/// assert_eq!(Slice::new(Some(-2), None, 1).apply(&items), vec!["d", "e"]);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Slice {
    pub start: Option<isize>,
    pub stop: Option<isize>,
    pub step: isize,
}

impl Slice {
    pub fn new(start: Option<isize>, stop: Option<isize>, step: isize) -> Self {
        Self { start, stop, step }
    }

    /// Builder-style setter for the step.
    pub fn step(mut self, step: isize) -> Self {
        self.step = step;
        self
    }

    pub(crate) fn validate(&self) -> Result<()> {
        if self.step == 0 {
            return Err(QueryError::invalid_arguments("slice step cannot be zero"));
        }
        Ok(())
    }

    /// True when the slice can be answered without knowing the result length:
    /// no negative bound and a forward step.
    pub fn is_forward(&self) -> bool {
        self.step > 0 && self.start.unwrap_or(0) >= 0 && self.stop.unwrap_or(0) >= 0
    }

    /// Positions selected from a sequence of `len` elements, in order.
    pub fn indices(&self, len: usize) -> Vec<usize> {
        let len = len as isize;
        let step = self.step;
        if step == 0 {
            return Vec::new();
        }
        let bound = |value: Option<isize>, default: isize, lower: isize, upper: isize| match value {
            None => default,
            Some(v) if v < 0 => (v + len).clamp(lower, upper),
            Some(v) => v.clamp(lower, upper),
        };
        let (start, stop) = if step > 0 {
            (bound(self.start, 0, 0, len), bound(self.stop, len, 0, len))
        } else {
            (
                bound(self.start, len - 1, -1, len - 1),
                bound(self.stop, -1, -1, len - 1),
            )
        };

        let mut indices = Vec::new();
        let mut i = start;
        while (step > 0 && i < stop) || (step < 0 && i > stop) {
            indices.push(i as usize);
            i += step;
        }
        indices
    }

    /// Selects the sliced elements of `items`.
    pub fn apply<T: Clone>(&self, items: &[T]) -> Vec<T> {
        self.indices(items.len())
            .into_iter()
            .map(|i| items[i].clone())
            .collect()
    }
}

impl From<Range<usize>> for Slice {
    fn from(range: Range<usize>) -> Self {
        Self::new(Some(range.start as isize), Some(range.end as isize), 1)
    }
}

impl From<RangeFrom<usize>> for Slice {
    fn from(range: RangeFrom<usize>) -> Self {
        Self::new(Some(range.start as isize), None, 1)
    }
}

impl From<RangeTo<usize>> for Slice {
    fn from(range: RangeTo<usize>) -> Self {
        Self::new(None, Some(range.end as isize), 1)
    }
}

impl From<RangeFull> for Slice {
    fn from(_: RangeFull) -> Self {
        Self::new(None, None, 1)
    }
}

/// Resolves a possibly negative index against a sequence of `len` elements.
pub(crate) fn resolve_index(index: isize, len: usize) -> Result<usize> {
    let resolved = if index < 0 {
        index + len as isize
    } else {
        index
    };
    if resolved < 0 || resolved >= len as isize {
        return Err(QueryError::IndexOutOfRange { index });
    }
    Ok(resolved as usize)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ITEMS: [i32; 6] = [0, 1, 2, 3, 4, 5];

    #[test]
    fn test_forward_slices() {
        assert_eq!(Slice::from(2..4).apply(&ITEMS), vec![2, 3]);
        assert_eq!(Slice::from(4..).apply(&ITEMS), vec![4, 5]);
        assert_eq!(Slice::from(..2).apply(&ITEMS), vec![0, 1]);
        assert_eq!(Slice::from(..).apply(&ITEMS), ITEMS.to_vec());
        assert_eq!(Slice::from(..).step(2).apply(&ITEMS), vec![0, 2, 4]);
    }

    #[test]
    fn test_out_of_range_bounds_clamp() {
        assert_eq!(Slice::from(4..100).apply(&ITEMS), vec![4, 5]);
        assert!(Slice::from(10..20).apply(&ITEMS).is_empty());
        assert!(Slice::from(3..1).apply(&ITEMS).is_empty());
    }

    #[test]
    fn test_negative_bounds() {
        assert_eq!(Slice::new(Some(-2), None, 1).apply(&ITEMS), vec![4, 5]);
        assert_eq!(Slice::new(None, Some(-4), 1).apply(&ITEMS), vec![0, 1]);
        assert_eq!(Slice::new(Some(-100), Some(1), 1).apply(&ITEMS), vec![0]);
    }

    #[test]
    fn test_negative_step() {
        assert_eq!(
            Slice::new(None, None, -1).apply(&ITEMS),
            vec![5, 4, 3, 2, 1, 0]
        );
        assert_eq!(Slice::new(Some(4), Some(1), -2).apply(&ITEMS), vec![4, 2]);
        assert_eq!(Slice::new(Some(-1), Some(-3), -1).apply(&ITEMS), vec![5, 4]);
        assert!(Slice::new(None, None, -1).apply::<i32>(&[]).is_empty());
    }

    #[test]
    fn test_is_forward() {
        assert!(Slice::from(10..20).is_forward());
        assert!(Slice::from(..).is_forward());
        assert!(!Slice::new(Some(-1), None, 1).is_forward());
        assert!(!Slice::new(None, Some(-1), 1).is_forward());
        assert!(!Slice::new(None, None, -1).is_forward());
    }

    #[test]
    fn test_zero_step_rejected() {
        let err = Slice::from(..).step(0).validate().unwrap_err();
        assert_eq!(err.to_string(), "slice step cannot be zero");
    }

    #[test]
    fn test_resolve_index() {
        assert_eq!(resolve_index(0, 3).unwrap(), 0);
        assert_eq!(resolve_index(-1, 3).unwrap(), 2);
        assert_eq!(
            resolve_index(3, 3).unwrap_err(),
            QueryError::IndexOutOfRange { index: 3 }
        );
        assert_eq!(
            resolve_index(-4, 3).unwrap_err(),
            QueryError::IndexOutOfRange { index: -4 }
        );
    }
}
