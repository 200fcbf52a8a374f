#![deny(
    unsafe_code,
    missing_docs,
    dead_code,
    unused_results,
    non_snake_case,
    unreachable_pub
)]

//! Authoritative Diamond-Square height-map state.
//!
//! [`HeightMapEngine`] owns the grid buffer, the random source and the
//! control parameters. Calculation seeds the four corners, then sweeps the
//! grid with progressively smaller sub-squares: every sub-square's centre is
//! set by the square step and its four edge midpoints by the diamond step,
//! each perturbed by a roughness term that shrinks with the sub-square.
//! All randomness funnels through [`HeightMapEngine::rand`], so a fixed seed
//! reproduces the same grid bit for bit.

use dsmap_core::{
    CellCoord, Command, Compass, Degree, EngineError, Event, Grid, HeightParams, PrngAlgorithm,
    SeedValue, MAX_REFINEMENT_PASSES,
};
use dsmap_system_normalization::ValueRange;
use dsmap_system_random::{SeededRandom, UniformSource};

/// Diamond-Square generator owning its grid, random source and parameters.
#[derive(Debug)]
pub struct HeightMapEngine<R = SeededRandom> {
    degree: Degree,
    params: HeightParams,
    grid: Grid,
    random: R,
}

impl HeightMapEngine<SeededRandom> {
    /// Creates an engine seeded from operating system entropy.
    pub fn new(degree: u32, params: HeightParams) -> Result<Self, EngineError> {
        Self::with_source(degree, params, SeededRandom::from_entropy())
    }

    /// Creates an engine with the default height and roughness.
    pub fn with_defaults(degree: u32) -> Result<Self, EngineError> {
        Self::new(degree, HeightParams::default())
    }
}

impl<R: UniformSource> HeightMapEngine<R> {
    /// Creates an engine drawing its randomness from `random`.
    pub fn with_source(degree: u32, params: HeightParams, random: R) -> Result<Self, EngineError> {
        let degree = Degree::new(degree)?;
        let params = HeightParams::new(params.height(), params.roughness())?;
        Ok(Self {
            degree,
            params,
            grid: Grid::new(degree),
            random,
        })
    }

    /// Exponent the grid size was derived from.
    #[must_use]
    pub fn degree(&self) -> u32 {
        self.degree.get()
    }

    /// Grid size `2^degree`; valid indices run over `[0, size]`.
    #[must_use]
    pub fn size(&self) -> u32 {
        self.degree.size()
    }

    /// Maximum height of the corner seeds.
    #[must_use]
    pub fn height(&self) -> f64 {
        self.params.height()
    }

    /// Perturbation magnitude at the coarsest pass.
    #[must_use]
    pub fn roughness(&self) -> f64 {
        self.params.roughness()
    }

    /// Parameters the engine was constructed with.
    #[must_use]
    pub fn params(&self) -> HeightParams {
        self.params
    }

    /// Read-only view of the grid.
    #[must_use]
    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    /// Restarts the random stream deterministically. Only future draws are affected.
    pub fn seed(&mut self, value: impl Into<SeedValue>, algorithm: PrngAlgorithm) {
        self.random.reseed(&value.into(), algorithm);
    }

    /// Fills every cell of the grid and returns the number of refinement passes.
    pub fn calculate(&mut self) -> Result<u32, EngineError> {
        let mut events = Vec::new();
        self.run(&mut events)
    }

    /// Rescales the grid into `[0, scale]`, returning the range observed beforehand.
    pub fn normalize(&mut self, scale: f64) -> Result<ValueRange, EngineError> {
        let range = dsmap_system_normalization::normalize(&mut self.grid, scale)?;
        tracing::info!(min = range.min(), max = range.max(), scale, "grid normalized");
        Ok(range)
    }

    /// Single random draw scaled to `[0, max)`.
    pub fn rand(&mut self, max: f64) -> f64 {
        self.random.next_uniform() * max
    }

    /// Random perturbation for sub-squares whose half side is `half_size`.
    ///
    /// The magnitude is `roughness * half_size / size` and the draw is
    /// uniform in `[-magnitude / 2, magnitude / 2)`.
    pub fn roughness_offset(&mut self, half_size: u32) -> f64 {
        let magnitude = self.params.roughness() * (f64::from(half_size) / f64::from(self.size()));
        self.rand(magnitude) - magnitude / 2.0
    }

    /// Average of the four corners at `(x ∓ half_size, y ∓ half_size)` plus roughness,
    /// floored at zero.
    pub fn square_average(&mut self, cell: CellCoord, half_size: u32) -> Result<f64, EngineError> {
        let size = self.size();
        let mut sum = 0.0;
        let mut missing = 0;
        for (horizontal, vertical) in [
            (Compass::Left, Compass::Top),
            (Compass::Right, Compass::Top),
            (Compass::Left, Compass::Bottom),
            (Compass::Right, Compass::Bottom),
        ] {
            let corner = cell
                .step(horizontal, half_size, size)
                .and_then(|edge| edge.step(vertical, half_size, size))
                .and_then(|corner| self.grid.get(corner));
            match corner {
                Some(value) => sum += value,
                None => missing += 1,
            }
        }
        if missing > 0 {
            return Err(EngineError::UnreachableGeometry { cell, missing });
        }

        let average = sum / 4.0 + self.roughness_offset(half_size);
        Ok(average.max(0.0))
    }

    /// Average of the cardinal neighbours `half_size` away plus roughness, floored at zero.
    ///
    /// A neighbour outside the grid or not yet computed is left out of the
    /// average. At most one neighbour may be missing.
    pub fn diamond_average(&mut self, cell: CellCoord, half_size: u32) -> Result<f64, EngineError> {
        let size = self.size();
        let mut sum = 0.0;
        let mut available = 0_u32;
        for direction in Compass::ALL {
            if let Some(value) = cell
                .step(direction, half_size, size)
                .and_then(|neighbour| self.grid.get(neighbour))
            {
                sum += value;
                available += 1;
            }
        }
        let missing = Compass::ALL.len() - available as usize;
        if missing > 1 {
            return Err(EngineError::UnreachableGeometry { cell, missing });
        }

        let average = sum / f64::from(available) + self.roughness_offset(half_size);
        Ok(average.max(0.0))
    }

    fn run(&mut self, out_events: &mut Vec<Event>) -> Result<u32, EngineError> {
        self.grid.clear();
        self.initialize_corners()?;
        out_events.push(Event::CornersInitialized);

        let size = self.size();
        let mut step_size = size;
        let mut passes = 0;
        while step_size > 1 && passes < MAX_REFINEMENT_PASSES {
            let squares = self.refine(step_size)?;
            tracing::debug!(step_size, squares, "refinement pass completed");
            out_events.push(Event::PassCompleted { step_size, squares });
            step_size /= 2;
            passes += 1;
        }

        tracing::info!(size, passes, "height map calculated");
        out_events.push(Event::Calculated { passes });
        Ok(passes)
    }

    fn initialize_corners(&mut self) -> Result<(), EngineError> {
        let size = self.size();
        let height = self.params.height();
        for corner in [
            CellCoord::new(0, 0),
            CellCoord::new(size, 0),
            CellCoord::new(0, size),
            CellCoord::new(size, size),
        ] {
            let value = self.rand(height);
            self.write(corner, value)?;
        }
        Ok(())
    }

    fn write(&mut self, cell: CellCoord, value: f64) -> Result<(), EngineError> {
        if self.grid.set(cell, value) {
            Ok(())
        } else {
            Err(EngineError::UnreachableGeometry { cell, missing: 0 })
        }
    }

    /// Runs the square step and the four diamond steps for every sub-square of side `step_size`.
    fn refine(&mut self, step_size: u32) -> Result<u64, EngineError> {
        let size = self.size();
        let per_side = size / step_size;
        let half_size = step_size / 2;

        for row in 0..per_side {
            let y = row * step_size + half_size;
            for column in 0..per_side {
                let center = CellCoord::new(column * step_size + half_size, y);
                let value = self.square_average(center, half_size)?;
                self.write(center, value)?;

                for direction in Compass::ALL {
                    let midpoint = center.step(direction, half_size, size).ok_or(
                        EngineError::UnreachableGeometry {
                            cell: center,
                            missing: 1,
                        },
                    )?;
                    let value = self.diamond_average(midpoint, half_size)?;
                    self.write(midpoint, value)?;
                }
            }
        }

        Ok(u64::from(per_side) * u64::from(per_side))
    }
}

/// Applies a command to the engine, reporting what happened through `out_events`.
pub fn apply<R: UniformSource>(
    engine: &mut HeightMapEngine<R>,
    command: Command,
    out_events: &mut Vec<Event>,
) -> Result<(), EngineError> {
    match command {
        Command::Seed { value, algorithm } => {
            engine.seed(value, algorithm);
            out_events.push(Event::Reseeded { algorithm });
        }
        Command::Calculate => {
            let _ = engine.run(out_events)?;
        }
        Command::Normalize { scale } => {
            let range = engine.normalize(scale)?;
            out_events.push(Event::Normalized {
                min: range.min(),
                max: range.max(),
                scale,
            });
        }
    }
    Ok(())
}

/// Query functions that provide read-only access to the engine state.
pub mod query {
    use dsmap_core::{Grid, HeightParams};
    use dsmap_system_normalization::ValueRange;

    use super::HeightMapEngine;

    /// Provides read-only access to the engine's grid.
    #[must_use]
    pub fn grid<R>(engine: &HeightMapEngine<R>) -> &Grid {
        &engine.grid
    }

    /// Retrieves the parameters the engine was constructed with.
    #[must_use]
    pub fn params<R>(engine: &HeightMapEngine<R>) -> HeightParams {
        engine.params
    }

    /// Smallest and largest set values, or `None` before the first calculation.
    #[must_use]
    pub fn value_range<R>(engine: &HeightMapEngine<R>) -> Option<ValueRange> {
        dsmap_system_normalization::value_range(&engine.grid)
    }

    /// Copies the grid into nested rows, `y = 0` first.
    #[must_use]
    pub fn rows<R>(engine: &HeightMapEngine<R>) -> Vec<Vec<f64>> {
        engine.grid.rows().map(<[f64]>::to_vec).collect()
    }
}
