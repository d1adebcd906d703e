//! Loading and preparing labeled sample matrices.
//!
//! Files are plain comma-separated values, one sample per line, with the label
//! in the first column. Shuffling is explicit and takes the caller's RNG so a
//! run can be reproduced from its seed.

use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use log::debug;
use ndarray::{s, Array2, ArrayView2, Axis};
use rand::seq::SliceRandom;
use rand::Rng;

use crate::error::{Error, Result};

/// Parses comma-separated rows into a matrix.
///
/// Lines are trimmed and blank lines skipped. Every row must have as many
/// cells as the first one.
///
/// # Errors
///
/// - [`Error::Parse`] if a cell is not a valid `T`.
/// - [`Error::RaggedRow`] if a row has a different number of cells.
/// - [`Error::EmptyInput`] if there are no rows at all.
pub fn parse_csv<T>(contents: &str) -> Result<Array2<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let mut width = None;
    let mut rows = 0;
    let mut cells = Vec::new();

    for (idx, line) in contents.lines().enumerate() {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }
        let line_no = idx + 1;

        let start = cells.len();
        for cell in line.split(',') {
            let cell = cell.trim();
            let value = cell
                .parse::<T>()
                .map_err(|e| Error::parse(line_no, format!("cannot parse `{cell}`: {e}")))?;
            cells.push(value);
        }
        let found = cells.len() - start;

        match width {
            None => width = Some(found),
            Some(expected) if expected != found => {
                return Err(Error::RaggedRow {
                    line: line_no,
                    expected,
                    found,
                })
            }
            Some(_) => {}
        }
        rows += 1;
    }

    let cols = width.ok_or(Error::EmptyInput)?;
    debug!("parsed {} rows with {} columns", rows, cols);
    Ok(Array2::from_shape_vec((rows, cols), cells)?)
}

/// Reads and parses a CSV file. See [`parse_csv`].
pub fn load_csv<T>(path: impl AsRef<Path>) -> Result<Array2<T>>
where
    T: FromStr,
    T::Err: Display,
{
    let path = path.as_ref();
    debug!("loading {}", path.display());
    let contents = fs::read_to_string(path)?;
    parse_csv(&contents)
}

/// Returns a copy of `samples` with its rows in random order.
pub fn shuffle_rows<T, R>(samples: ArrayView2<'_, T>, rng: &mut R) -> Array2<T>
where
    T: Clone,
    R: Rng + ?Sized,
{
    let mut order: Vec<usize> = (0..samples.nrows()).collect();
    order.shuffle(rng);
    debug!("shuffled {} rows", order.len());
    samples.select(Axis(0), &order)
}

/// The first `n` rows of `samples`, or all of them if there are fewer.
pub fn take_rows<T>(samples: ArrayView2<'_, T>, n: usize) -> ArrayView2<'_, T> {
    let n = n.min(samples.nrows());
    samples.slice_move(s![..n, ..])
}
