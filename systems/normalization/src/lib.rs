#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Pure grid statistics and linear rescaling of calculated height maps.

use dsmap_core::{EngineError, Grid};

/// Smallest and largest values observed across a grid.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct ValueRange {
    min: f64,
    max: f64,
}

impl ValueRange {
    /// Smallest observed value.
    #[must_use]
    pub const fn min(&self) -> f64 {
        self.min
    }

    /// Largest observed value.
    #[must_use]
    pub const fn max(&self) -> f64 {
        self.max
    }

    /// Distance between the extremes.
    #[must_use]
    pub fn span(&self) -> f64 {
        self.max - self.min
    }

    /// Reports whether every observed value is identical.
    #[must_use]
    pub fn is_flat(&self) -> bool {
        self.span() == 0.0
    }
}

/// Computes the extremes of every set cell, or `None` when no cell holds a value.
#[must_use]
pub fn value_range(grid: &Grid) -> Option<ValueRange> {
    grid.values()
        .iter()
        .copied()
        .filter(|value| !value.is_nan())
        .fold(None, |range, value| {
            Some(match range {
                None => ValueRange {
                    min: value,
                    max: value,
                },
                Some(ValueRange { min, max }) => ValueRange {
                    min: min.min(value),
                    max: max.max(value),
                },
            })
        })
}

/// Rescales every set cell to `(cell - min) / (max - min) * scale`.
///
/// The grid spans exactly `[0, scale]` afterwards. A flat grid is rejected
/// with [`EngineError::DegenerateRange`] and left untouched; unset cells stay
/// unset. Returns the range observed before rescaling.
pub fn normalize(grid: &mut Grid, scale: f64) -> Result<ValueRange, EngineError> {
    if !scale.is_finite() || scale < 0.0 {
        return Err(EngineError::InvalidParameter {
            parameter: "scale",
            reason: format!("must be finite and non-negative, got {scale}"),
        });
    }

    let range = value_range(grid).ok_or_else(|| EngineError::InvalidParameter {
        parameter: "grid",
        reason: "no cell holds a value; calculate the grid first".to_owned(),
    })?;
    if range.is_flat() {
        return Err(EngineError::DegenerateRange { value: range.min });
    }

    let span = range.span();
    for cell in grid.values_mut() {
        *cell = (*cell - range.min) / span * scale;
    }

    tracing::debug!(
        min = range.min,
        max = range.max,
        scale,
        "normalized grid"
    );
    Ok(range)
}

#[cfg(test)]
mod tests {
    use super::*;
    use dsmap_core::{CellCoord, Degree};

    fn filled(degree: u32, value: impl Fn(u32, u32) -> f64) -> Grid {
        let mut grid = Grid::new(Degree::new(degree).expect("degree"));
        let size = grid.size();
        for y in 0..=size {
            for x in 0..=size {
                let _ = grid.set(CellCoord::new(x, y), value(x, y));
            }
        }
        grid
    }

    #[test]
    fn range_ignores_unset_cells() {
        let mut grid = Grid::new(Degree::new(1).expect("degree"));
        assert_eq!(value_range(&grid), None);
        let _ = grid.set(CellCoord::new(0, 0), 3.0);
        let _ = grid.set(CellCoord::new(2, 2), -1.0);
        let range = value_range(&grid).expect("range");
        assert_eq!((range.min(), range.max()), (-1.0, 3.0));
    }

    #[test]
    fn normalize_spans_exact_scale() {
        let mut grid = filled(2, |x, y| f64::from(x * 3 + y) * 0.7 + 1.3);
        let before = normalize(&mut grid, 50.0).expect("normalize");
        assert!(before.span() > 0.0);

        let after = value_range(&grid).expect("range");
        assert_eq!(after.min(), 0.0);
        assert_eq!(after.max(), 50.0);
    }

    #[test]
    fn normalize_preserves_ordering() {
        let mut grid = filled(1, |x, y| f64::from(x + 3 * y));
        let _ = normalize(&mut grid, 1.0).expect("normalize");
        let values = grid.values();
        assert!(values.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn flat_grid_is_degenerate_and_untouched() {
        let mut grid = filled(2, |_, _| 0.25);
        let snapshot = grid.clone();
        assert_eq!(
            normalize(&mut grid, 1.0),
            Err(EngineError::DegenerateRange { value: 0.25 })
        );
        assert_eq!(grid, snapshot);
    }

    #[test]
    fn invalid_scale_is_rejected() {
        let mut grid = filled(1, |x, _| f64::from(x));
        assert!(matches!(
            normalize(&mut grid, f64::INFINITY),
            Err(EngineError::InvalidParameter {
                parameter: "scale",
                ..
            })
        ));
        assert!(normalize(&mut grid, -2.0).is_err());
    }

    #[test]
    fn empty_grid_cannot_be_normalized() {
        let mut grid = Grid::new(Degree::new(1).expect("degree"));
        assert!(matches!(
            normalize(&mut grid, 1.0),
            Err(EngineError::InvalidParameter {
                parameter: "grid",
                ..
            })
        ));
    }
}
