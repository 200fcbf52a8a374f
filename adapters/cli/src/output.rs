use std::io::{self, Write};

use clap::ValueEnum;
use dsmap_core::Grid;

/// Textual layouts the grid can be printed in.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub(crate) enum OutputFormat {
    /// Aligned table with row and column indices.
    Table,
    /// Comma separated values, one grid row per line.
    Csv,
}

/// Writes every grid row to `out`, `y = 0` first.
pub(crate) fn write_grid<W: Write>(
    grid: &Grid,
    format: OutputFormat,
    precision: usize,
    out: &mut W,
) -> io::Result<()> {
    match format {
        OutputFormat::Table => write_table(grid, precision, out),
        OutputFormat::Csv => write_csv(grid, precision, out),
    }
}

fn write_csv<W: Write>(grid: &Grid, precision: usize, out: &mut W) -> io::Result<()> {
    for row in grid.rows() {
        let line = row
            .iter()
            .map(|value| format!("{value:.precision$}"))
            .collect::<Vec<_>>()
            .join(",");
        writeln!(out, "{line}")?;
    }
    Ok(())
}

fn write_table<W: Write>(grid: &Grid, precision: usize, out: &mut W) -> io::Result<()> {
    let index_width = grid.size().to_string().len();
    let cell_width = grid
        .values()
        .iter()
        .map(|value| format!("{value:.precision$}").len())
        .max()
        .unwrap_or(0)
        .max(index_width);

    write!(out, "{:>index_width$}", "")?;
    for column in 0..grid.side() {
        write!(out, " {column:>cell_width$}")?;
    }
    writeln!(out)?;

    for (y, row) in grid.rows().enumerate() {
        write!(out, "{y:>index_width$}")?;
        for value in row {
            write!(out, " {value:>cell_width$.precision$}")?;
        }
        writeln!(out)?;
    }
    Ok(())
}
