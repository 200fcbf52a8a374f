#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Core contracts shared across the Diamond-Square height-map engine.
//!
//! This crate defines the value types that connect the engine, its pure
//! systems and any adapter consuming it. Adapters either call the engine's
//! methods directly or submit [`Command`] values to its `apply` entry point,
//! which reports what happened through [`Event`] values. Every failure the
//! engine can surface is a variant of [`EngineError`].

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Largest accepted degree; a 4097 × 4097 grid of `f64` stays near 128 MiB.
pub const MAX_DEGREE: u32 = 12;

/// Maximum height of the corner seeds when no height is provided.
pub const DEFAULT_HEIGHT: f64 = 1.0;

/// Maximum roughness at the coarsest pass when no roughness is provided.
pub const DEFAULT_ROUGHNESS: f64 = 0.5;

/// Hard cap on refinement passes performed by a single calculation.
pub const MAX_REFINEMENT_PASSES: u32 = 1000;

/// Commands accepted by the engine's `apply` entry point.
#[derive(Clone, Debug, PartialEq)]
pub enum Command {
    /// Reseeds the engine's random source deterministically.
    Seed {
        /// Value the new random stream is derived from.
        value: SeedValue,
        /// Generator family that should produce the new stream.
        algorithm: PrngAlgorithm,
    },
    /// Fills every grid cell by running the Diamond-Square sweep.
    Calculate,
    /// Linearly rescales the grid into `[0, scale]`.
    Normalize {
        /// Upper bound of the rescaled range.
        scale: f64,
    },
}

/// Events reported by the engine after processing commands.
#[derive(Clone, Debug, PartialEq)]
pub enum Event {
    /// Confirms that the random source was replaced.
    Reseeded {
        /// Generator family now producing random draws.
        algorithm: PrngAlgorithm,
    },
    /// Confirms that the four corners received their initial heights.
    CornersInitialized,
    /// Reports that one square/diamond refinement pass finished.
    PassCompleted {
        /// Side length of the sub-squares processed by the pass.
        step_size: u32,
        /// Number of sub-squares processed by the pass.
        squares: u64,
    },
    /// Confirms that every grid cell holds a value.
    Calculated {
        /// Number of refinement passes the sweep performed.
        passes: u32,
    },
    /// Confirms that the grid was rescaled.
    Normalized {
        /// Smallest value observed before rescaling.
        min: f64,
        /// Largest value observed before rescaling.
        max: f64,
        /// Upper bound of the rescaled range.
        scale: f64,
    },
}

/// Failures surfaced by the height-map engine.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum EngineError {
    /// A construction or command argument was outside its accepted domain.
    #[error("invalid parameter `{parameter}`: {reason}")]
    InvalidParameter {
        /// Name of the offending parameter.
        parameter: &'static str,
        /// Human readable description of the accepted domain.
        reason: String,
    },
    /// Normalization was requested on a grid whose values are all equal.
    #[error("cannot normalize a flat grid: every cell equals {value}")]
    DegenerateRange {
        /// Value shared by every cell.
        value: f64,
    },
    /// The refinement order reached a cell whose inputs were not available.
    #[error("unreachable grid geometry at {cell}: {missing} input cell(s) unavailable")]
    UnreachableGeometry {
        /// Cell that was being computed.
        cell: CellCoord,
        /// Number of inputs that were out of bounds or unset.
        missing: usize,
    },
}

/// Exponent controlling the grid side length (`size = 2^degree`).
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Degree(u32);

impl Degree {
    /// Validates the provided exponent.
    pub fn new(value: u32) -> Result<Self, EngineError> {
        if value < 1 {
            return Err(EngineError::InvalidParameter {
                parameter: "degree",
                reason: format!("must be at least 1, got {value}"),
            });
        }
        if value > MAX_DEGREE {
            return Err(EngineError::InvalidParameter {
                parameter: "degree",
                reason: format!("must be at most {MAX_DEGREE}, got {value}"),
            });
        }
        Ok(Self(value))
    }

    /// Retrieves the underlying exponent.
    #[must_use]
    pub const fn get(&self) -> u32 {
        self.0
    }

    /// Grid size `2^degree`; the grid holds `size + 1` cells per side.
    #[must_use]
    pub const fn size(&self) -> u32 {
        1 << self.0
    }
}

/// Control parameters shaping the generated terrain.
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawHeightParams", into = "RawHeightParams")]
pub struct HeightParams {
    height: f64,
    roughness: f64,
}

impl HeightParams {
    /// Validates and creates a parameter set.
    pub fn new(height: f64, roughness: f64) -> Result<Self, EngineError> {
        Ok(Self {
            height: non_negative("height", height)?,
            roughness: non_negative("roughness", roughness)?,
        })
    }

    /// Replaces the corner height bound.
    pub fn with_height(self, height: f64) -> Result<Self, EngineError> {
        Self::new(height, self.roughness)
    }

    /// Replaces the coarsest-pass roughness.
    pub fn with_roughness(self, roughness: f64) -> Result<Self, EngineError> {
        Self::new(self.height, roughness)
    }

    /// Maximum magnitude of the random corner seeds.
    #[must_use]
    pub const fn height(&self) -> f64 {
        self.height
    }

    /// Maximum perturbation magnitude at the coarsest pass.
    #[must_use]
    pub const fn roughness(&self) -> f64 {
        self.roughness
    }
}

impl TryFrom<u32> for Degree {
    type Error = EngineError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Degree> for u32 {
    fn from(degree: Degree) -> Self {
        degree.0
    }
}

/// Unvalidated wire form of [`HeightParams`].
#[derive(Clone, Copy, Serialize, Deserialize)]
struct RawHeightParams {
    height: f64,
    roughness: f64,
}

impl TryFrom<RawHeightParams> for HeightParams {
    type Error = EngineError;

    fn try_from(raw: RawHeightParams) -> Result<Self, Self::Error> {
        Self::new(raw.height, raw.roughness)
    }
}

impl From<HeightParams> for RawHeightParams {
    fn from(params: HeightParams) -> Self {
        Self {
            height: params.height,
            roughness: params.roughness,
        }
    }
}

impl Default for HeightParams {
    fn default() -> Self {
        Self {
            height: DEFAULT_HEIGHT,
            roughness: DEFAULT_ROUGHNESS,
        }
    }
}

fn non_negative(parameter: &'static str, value: f64) -> Result<f64, EngineError> {
    if !value.is_finite() {
        return Err(EngineError::InvalidParameter {
            parameter,
            reason: format!("must be finite, got {value}"),
        });
    }
    if value < 0.0 {
        return Err(EngineError::InvalidParameter {
            parameter,
            reason: format!("must be non-negative, got {value}"),
        });
    }
    Ok(value)
}

/// Value a random stream is derived from.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SeedValue {
    /// Arbitrary text, such as a seed typed into a form.
    Text(String),
    /// Numeric seed.
    Number(u64),
}

impl From<&str> for SeedValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for SeedValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<u64> for SeedValue {
    fn from(value: u64) -> Self {
        Self::Number(value)
    }
}

impl fmt::Display for SeedValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => write!(f, "\"{text}\""),
            Self::Number(number) => write!(f, "{number}"),
        }
    }
}

/// Generator families the engine can draw random values from.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum PrngAlgorithm {
    /// Fast general purpose generator used unless requested otherwise.
    #[default]
    Standard,
    /// Higher-period generator.
    Alternate,
}

/// Integer cell location; `x` selects the column and `y` the row.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CellCoord {
    x: u32,
    y: u32,
}

impl CellCoord {
    /// Creates a new cell coordinate.
    #[must_use]
    pub const fn new(x: u32, y: u32) -> Self {
        Self { x, y }
    }

    /// Zero-based column index.
    #[must_use]
    pub const fn x(&self) -> u32 {
        self.x
    }

    /// Zero-based row index.
    #[must_use]
    pub const fn y(&self) -> u32 {
        self.y
    }

    /// Moves the cell by `distance` towards `direction`, staying inside `[0, size]`.
    ///
    /// Returns `None` when the destination falls outside the grid.
    #[must_use]
    pub fn step(self, direction: Compass, distance: u32, size: u32) -> Option<Self> {
        let (dx, dy) = direction.offset(distance);
        let x = i64::from(self.x) + dx;
        let y = i64::from(self.y) + dy;
        let bound = i64::from(size);
        if !(0..=bound).contains(&x) || !(0..=bound).contains(&y) {
            return None;
        }
        Some(Self::new(x as u32, y as u32))
    }
}

impl fmt::Display for CellCoord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Compass directions used by the diamond step, in processing order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Compass {
    /// Towards decreasing column indices.
    Left,
    /// Towards decreasing row indices.
    Top,
    /// Towards increasing column indices.
    Right,
    /// Towards increasing row indices.
    Bottom,
}

impl Compass {
    /// All directions in the order the diamond step visits them.
    pub const ALL: [Compass; 4] = [Compass::Left, Compass::Top, Compass::Right, Compass::Bottom];

    /// Coordinate delta of moving `distance` cells in this direction.
    #[must_use]
    pub const fn offset(self, distance: u32) -> (i64, i64) {
        let distance = distance as i64;
        match self {
            Self::Left => (-distance, 0),
            Self::Top => (0, -distance),
            Self::Right => (distance, 0),
            Self::Bottom => (0, distance),
        }
    }
}

/// Square height-map buffer of `(size + 1) × (size + 1)` cells.
///
/// Unset cells hold `NaN` until the engine writes them.
#[derive(Clone, Debug, PartialEq)]
pub struct Grid {
    size: u32,
    cells: Vec<f64>,
}

impl Grid {
    /// Allocates a grid for the provided degree with every cell unset.
    #[must_use]
    pub fn new(degree: Degree) -> Self {
        let size = degree.size();
        let side = size as usize + 1;
        Self {
            size,
            cells: vec![f64::NAN; side * side],
        }
    }

    /// Largest valid index along either axis.
    #[must_use]
    pub const fn size(&self) -> u32 {
        self.size
    }

    /// Number of cells along either axis.
    #[must_use]
    pub const fn side(&self) -> usize {
        self.size as usize + 1
    }

    /// Reports whether the coordinate lies inside `[0, size]` on both axes.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.x <= self.size && cell.y <= self.size
    }

    /// Reads a cell, returning `None` when it is out of bounds or unset.
    #[must_use]
    pub fn get(&self, cell: CellCoord) -> Option<f64> {
        if !self.contains(cell) {
            return None;
        }
        let value = self.cells[self.index(cell)];
        (!value.is_nan()).then_some(value)
    }

    /// Writes a cell. Coordinates outside the grid are ignored and reported as `false`.
    pub fn set(&mut self, cell: CellCoord, value: f64) -> bool {
        if !self.contains(cell) {
            return false;
        }
        let index = self.index(cell);
        self.cells[index] = value;
        true
    }

    /// Marks every cell as unset.
    pub fn clear(&mut self) {
        self.cells.fill(f64::NAN);
    }

    /// Reports whether every cell holds a value.
    #[must_use]
    pub fn is_complete(&self) -> bool {
        self.cells.iter().all(|value| !value.is_nan())
    }

    /// Row-major view of every cell, unset cells included as `NaN`.
    #[must_use]
    pub fn values(&self) -> &[f64] {
        &self.cells
    }

    /// Mutable row-major view of every cell.
    pub fn values_mut(&mut self) -> &mut [f64] {
        &mut self.cells
    }

    /// Iterates the grid row by row, starting at `y = 0`.
    pub fn rows(&self) -> impl Iterator<Item = &[f64]> + '_ {
        self.cells.chunks_exact(self.side())
    }

    fn index(&self, cell: CellCoord) -> usize {
        cell.y as usize * self.side() + cell.x as usize
    }
}

#[cfg(test)]
mod tests {
    use super::{CellCoord, Compass, Degree, EngineError, Grid, HeightParams, SeedValue};
    use serde::{de::DeserializeOwned, Serialize};

    fn assert_round_trip<T>(value: &T)
    where
        T: Serialize + DeserializeOwned + PartialEq + std::fmt::Debug,
    {
        let bytes = bincode::serialize(value).expect("serialize");
        let restored: T = bincode::deserialize(&bytes).expect("deserialize");
        assert_eq!(&restored, value);
    }

    #[test]
    fn degree_three_spans_eight_cells() {
        let degree = Degree::new(3).expect("valid degree");
        assert_eq!(degree.size(), 8);
        assert_eq!(Grid::new(degree).side(), 9);
    }

    #[test]
    fn degree_zero_is_rejected() {
        assert!(matches!(
            Degree::new(0),
            Err(EngineError::InvalidParameter {
                parameter: "degree",
                ..
            })
        ));
    }

    #[test]
    fn degree_above_cap_is_rejected() {
        assert!(Degree::new(super::MAX_DEGREE).is_ok());
        assert!(Degree::new(super::MAX_DEGREE + 1).is_err());
    }

    #[test]
    fn default_params_match_documented_defaults() {
        let params = HeightParams::default();
        assert!((params.height() - 1.0).abs() < f64::EPSILON);
        assert!((params.roughness() - 0.5).abs() < f64::EPSILON);
    }

    #[test]
    fn negative_params_are_rejected() {
        let error = HeightParams::new(-1.0, 0.5).expect_err("negative height");
        assert!(matches!(
            error,
            EngineError::InvalidParameter {
                parameter: "height",
                ..
            }
        ));
        let error = HeightParams::default()
            .with_roughness(-0.1)
            .expect_err("negative roughness");
        assert!(matches!(
            error,
            EngineError::InvalidParameter {
                parameter: "roughness",
                ..
            }
        ));
        assert!(HeightParams::new(f64::NAN, 0.0).is_err());
    }

    #[test]
    fn builders_replace_one_parameter() {
        let params = HeightParams::default()
            .with_height(4.0)
            .and_then(|params| params.with_roughness(2.0))
            .expect("valid params");
        assert_eq!(params, HeightParams::new(4.0, 2.0).expect("params"));
        assert!(params.with_height(-4.0).is_err());
    }

    #[test]
    fn deserialization_rejects_negative_params() {
        let bytes = bincode::serialize(&(-4.0_f64, -2.0_f64)).expect("serialize");
        assert!(bincode::deserialize::<HeightParams>(&bytes).is_err());

        let bytes = bincode::serialize(&(4.0_f64, -2.0_f64)).expect("serialize");
        assert!(bincode::deserialize::<HeightParams>(&bytes).is_err());
    }

    #[test]
    fn deserialization_rejects_out_of_range_degree() {
        for value in [0_u32, super::MAX_DEGREE + 1, 40] {
            let bytes = bincode::serialize(&value).expect("serialize");
            assert!(
                bincode::deserialize::<Degree>(&bytes).is_err(),
                "degree {value} should be rejected"
            );
        }
    }

    #[test]
    fn degree_round_trips_through_bincode() {
        assert_round_trip(&Degree::new(3).expect("degree"));
    }

    #[test]
    fn step_stays_inside_bounds() {
        let cell = CellCoord::new(4, 0);
        assert_eq!(cell.step(Compass::Top, 4, 8), None);
        assert_eq!(cell.step(Compass::Bottom, 4, 8), Some(CellCoord::new(4, 4)));
        assert_eq!(cell.step(Compass::Left, 4, 8), Some(CellCoord::new(0, 0)));
        assert_eq!(cell.step(Compass::Right, 5, 8), None);
    }

    #[test]
    fn fresh_grid_is_unset() {
        let mut grid = Grid::new(Degree::new(1).expect("degree"));
        assert!(!grid.is_complete());
        assert_eq!(grid.get(CellCoord::new(1, 1)), None);
        assert!(grid.set(CellCoord::new(1, 1), 0.25));
        assert_eq!(grid.get(CellCoord::new(1, 1)), Some(0.25));
        assert!(!grid.set(CellCoord::new(3, 0), 1.0));
        assert_eq!(grid.rows().count(), 3);
    }

    #[test]
    fn params_round_trip_through_bincode() {
        assert_round_trip(&HeightParams::new(4.0, 2.0).expect("params"));
    }

    #[test]
    fn seed_value_round_trips_through_bincode() {
        assert_round_trip(&SeedValue::from("17"));
        assert_round_trip(&SeedValue::from(17_u64));
    }
}
