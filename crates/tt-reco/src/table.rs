//! Binned probability-density tables used by the likelihood ranking.
//!
//! A table is piecewise constant on its bins and is normalized at construction so that
//! `sum(content_i * area_i) = 1` over the bins. Anything outside the binned domain, on either
//! side and along any axis, is the overflow region: lookups there return `None`. The upper edge
//! of the last bin belongs to the overflow, as for ROOT histograms.
//!
//! Tables are stored as JSON resources holding a map from table name to table:
//!
//! ```json
//! {
//!   "nu_distance": { "edges": [0, 10, 20], "content": [3.0, 1.0] },
//!   "masses": {
//!     "x_edges": [60, 80, 100],
//!     "y_edges": [150, 175, 200],
//!     "content": [[1.0, 2.0], [2.0, 1.0]]
//!   }
//! }
//! ```
//!
//! In the 2-D form `content[ix][iy]` is the bin at `x_edges[ix]..x_edges[ix + 1]` and
//! `y_edges[iy]..y_edges[iy + 1]`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;
use tt_core::{Error, Result};

/// Raw 1-D table as stored in a resource file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table1DData {
    /// Bin edges (length = number of bins + 1).
    pub edges: Vec<f64>,
    /// Bin contents, not necessarily normalized.
    pub content: Vec<f64>,
}

/// Raw 2-D table as stored in a resource file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Table2DData {
    /// Bin edges along x.
    pub x_edges: Vec<f64>,
    /// Bin edges along y.
    pub y_edges: Vec<f64>,
    /// Bin contents, indexed `[ix][iy]`.
    pub content: Vec<Vec<f64>>,
}

/// Any table found in a resource file.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TableData {
    /// Two-dimensional table.
    TwoD(Table2DData),
    /// One-dimensional table.
    OneD(Table1DData),
}

fn validate_edges(what: &str, edges: &[f64]) -> Result<()> {
    if edges.len() < 2 {
        return Err(Error::Validation(format!(
            "{what} requires at least 2 bin edges, got {}",
            edges.len()
        )));
    }
    for (i, &e) in edges.iter().enumerate() {
        if !e.is_finite() {
            return Err(Error::Validation(format!("{what} edges[{i}] must be finite, got {e}")));
        }
        if i > 0 && edges[i - 1] >= e {
            return Err(Error::Validation(format!(
                "{what} edges must be strictly increasing, got edges[{}]={} and edges[{i}]={e}",
                i - 1,
                edges[i - 1],
            )));
        }
    }
    Ok(())
}

fn validate_content(what: &str, i: usize, w: f64) -> Result<()> {
    if !w.is_finite() || w < 0.0 {
        return Err(Error::Validation(format!(
            "{what} content[{i}] must be finite and >=0, got {w}"
        )));
    }
    Ok(())
}

fn normalization(what: &str, integral: f64) -> Result<f64> {
    if !(integral.is_finite() && integral > 0.0) {
        return Err(Error::Validation(format!(
            "{what} integral over bin widths must be finite and >0, got {integral}"
        )));
    }
    Ok(1.0 / integral)
}

/// Index of the bin containing `x`, or `None` in the overflow region.
fn find_bin(edges: &[f64], x: f64) -> Option<usize> {
    let (&lo, &hi) = (edges.first()?, edges.last()?);
    if !(x >= lo && x < hi) {
        return None;
    }
    // `k` is the number of edges <= x, so the bin index is k-1.
    let k = edges.partition_point(|e| *e <= x);
    k.checked_sub(1)
}

/// Normalized 1-D probability-density table.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTable1D {
    edges: Vec<f64>,
    density: Vec<f64>,
}

impl DensityTable1D {
    /// Build a table from edges and non-negative bin contents, normalizing the contents to a
    /// probability density.
    pub fn from_edges_and_contents(edges: Vec<f64>, content: Vec<f64>) -> Result<Self> {
        const WHAT: &str = "DensityTable1D";
        validate_edges(WHAT, &edges)?;
        if content.len() + 1 != edges.len() {
            return Err(Error::Validation(format!(
                "{WHAT} content length mismatch: expected {}, got {}",
                edges.len() - 1,
                content.len()
            )));
        }

        let mut integral = 0.0;
        for (i, &w) in content.iter().enumerate() {
            validate_content(WHAT, i, w)?;
            integral += w * (edges[i + 1] - edges[i]);
        }
        let scale = normalization(WHAT, integral)?;
        let density = content.into_iter().map(|w| w * scale).collect();

        Ok(Self { edges, density })
    }

    /// Bin edges.
    pub fn edges(&self) -> &[f64] {
        &self.edges
    }

    /// Normalized bin contents.
    pub fn densities(&self) -> &[f64] {
        &self.density
    }

    /// Number of bins.
    pub fn n_bins(&self) -> usize {
        self.density.len()
    }

    /// Bin containing `x`; `None` in the overflow region or for non-finite `x`.
    pub fn bin_index(&self, x: f64) -> Option<usize> {
        find_bin(&self.edges, x)
    }

    /// Density at `x`; `None` in the overflow region.
    pub fn density(&self, x: f64) -> Option<f64> {
        self.bin_index(x).map(|i| self.density[i])
    }

    /// Natural logarithm of the density at `x`; `-inf` for an empty bin, `None` in the overflow
    /// region.
    pub fn log_density(&self, x: f64) -> Option<f64> {
        self.density(x).map(f64::ln)
    }

    /// `sum(density * width)`; 1 up to rounding.
    pub fn integral(&self) -> f64 {
        self.density.iter().zip(self.edges.windows(2)).map(|(d, w)| d * (w[1] - w[0])).sum()
    }
}

impl TryFrom<Table1DData> for DensityTable1D {
    type Error = Error;

    fn try_from(data: Table1DData) -> Result<Self> {
        Self::from_edges_and_contents(data.edges, data.content)
    }
}

/// Normalized 2-D probability-density table.
#[derive(Debug, Clone, PartialEq)]
pub struct DensityTable2D {
    x_edges: Vec<f64>,
    y_edges: Vec<f64>,
    /// Row-major, `[ix * n_y + iy]`.
    density: Vec<f64>,
}

impl DensityTable2D {
    /// Build a table from edges along both axes and contents indexed `[ix][iy]`.
    pub fn from_edges_and_contents(
        x_edges: Vec<f64>,
        y_edges: Vec<f64>,
        content: Vec<Vec<f64>>,
    ) -> Result<Self> {
        const WHAT: &str = "DensityTable2D";
        validate_edges(&format!("{WHAT} x"), &x_edges)?;
        validate_edges(&format!("{WHAT} y"), &y_edges)?;

        let (nx, ny) = (x_edges.len() - 1, y_edges.len() - 1);
        if content.len() != nx {
            return Err(Error::Validation(format!(
                "{WHAT} content has {} rows, expected {nx}",
                content.len()
            )));
        }

        let mut flat = Vec::with_capacity(nx * ny);
        let mut integral = 0.0;
        for (ix, row) in content.into_iter().enumerate() {
            if row.len() != ny {
                return Err(Error::Validation(format!(
                    "{WHAT} content row {ix} has {} bins, expected {ny}",
                    row.len()
                )));
            }
            let wx = x_edges[ix + 1] - x_edges[ix];
            for (iy, w) in row.into_iter().enumerate() {
                validate_content(WHAT, ix * ny + iy, w)?;
                integral += w * wx * (y_edges[iy + 1] - y_edges[iy]);
                flat.push(w);
            }
        }
        let scale = normalization(WHAT, integral)?;
        flat.iter_mut().for_each(|w| *w *= scale);

        Ok(Self { x_edges, y_edges, density: flat })
    }

    /// Bin edges along x.
    pub fn x_edges(&self) -> &[f64] {
        &self.x_edges
    }

    /// Bin edges along y.
    pub fn y_edges(&self) -> &[f64] {
        &self.y_edges
    }

    /// Number of bins along `(x, y)`.
    pub fn shape(&self) -> (usize, usize) {
        (self.x_edges.len() - 1, self.y_edges.len() - 1)
    }

    /// Bin `(ix, iy)` containing the point; `None` if either coordinate is out of range.
    pub fn bin_index(&self, x: f64, y: f64) -> Option<(usize, usize)> {
        Some((find_bin(&self.x_edges, x)?, find_bin(&self.y_edges, y)?))
    }

    /// Density at `(x, y)`; `None` in the overflow region.
    pub fn density(&self, x: f64, y: f64) -> Option<f64> {
        let (ix, iy) = self.bin_index(x, y)?;
        Some(self.density[ix * (self.y_edges.len() - 1) + iy])
    }

    /// Natural logarithm of the density at `(x, y)`; `None` in the overflow region.
    pub fn log_density(&self, x: f64, y: f64) -> Option<f64> {
        self.density(x, y).map(f64::ln)
    }

    /// `sum(density * area)`; 1 up to rounding.
    pub fn integral(&self) -> f64 {
        let ny = self.y_edges.len() - 1;
        let mut total = 0.0;
        for (ix, wx) in self.x_edges.windows(2).enumerate() {
            for (iy, wy) in self.y_edges.windows(2).enumerate() {
                total += self.density[ix * ny + iy] * (wx[1] - wx[0]) * (wy[1] - wy[0]);
            }
        }
        total
    }
}

impl TryFrom<Table2DData> for DensityTable2D {
    type Error = Error;

    fn try_from(data: Table2DData) -> Result<Self> {
        Self::from_edges_and_contents(data.x_edges, data.y_edges, data.content)
    }
}

/// Named tables read from one resource file.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TableSet {
    tables: BTreeMap<String, TableData>,
}

impl TableSet {
    /// Parse a table set from JSON.
    pub fn from_reader<R: Read>(reader: R) -> Result<Self> {
        Ok(serde_json::from_reader(reader)?)
    }

    /// Parse a table set from a JSON string.
    pub fn from_json_str(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }

    /// Read a table set from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let file = File::open(path)?;
        let set = Self::from_reader(BufReader::new(file))?;
        log::info!("loaded {} density table(s) from {}", set.tables.len(), path.display());
        Ok(set)
    }

    /// Add or replace a table.
    pub fn insert(&mut self, name: impl Into<String>, table: TableData) {
        self.tables.insert(name.into(), table);
    }

    /// Table names, sorted.
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.tables.keys().map(String::as_str)
    }

    /// Build the named 1-D table.
    pub fn table_1d(&self, name: &str) -> Result<DensityTable1D> {
        match self.tables.get(name) {
            Some(TableData::OneD(data)) => data.clone().try_into(),
            Some(TableData::TwoD(_)) => {
                Err(Error::Validation(format!("table '{name}' is 2-D, expected 1-D")))
            }
            None => Err(Error::Validation(format!("no table named '{name}'"))),
        }
    }

    /// Build the named 2-D table.
    pub fn table_2d(&self, name: &str) -> Result<DensityTable2D> {
        match self.tables.get(name) {
            Some(TableData::TwoD(data)) => data.clone().try_into(),
            Some(TableData::OneD(_)) => {
                Err(Error::Validation(format!("table '{name}' is 1-D, expected 2-D")))
            }
            None => Err(Error::Validation(format!("no table named '{name}'"))),
        }
    }
}
