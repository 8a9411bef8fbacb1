//! BIBD incidence masks.
//!
//! For an order `r` the generator builds the affine plane of order `r` as a
//! `(r·(r+1)) × r²` incidence matrix: each row is a block (line) of `r`
//! points, each column a point lying on `r + 1` blocks, and every pair of
//! points shares exactly one block. The rows come in `r + 1` parallel
//! classes of `r` blocks each:
//!
//! 1. rows `0..r`: contiguous runs `[r·m, r·m + r)`;
//! 2. rows `r..2r`: strided columns `(m − r) + r·n`;
//! 3. rows `r(k+1)..r(k+2)` for each slope `k ∈ 1..r`: the lines of a
//!    Latin-square grid `(k·i + j) + r·i`, read column by column.
//!
//! The balance property only holds when `r` is a prime power. Other orders
//! still produce a correctly shaped matrix through [`generate_mask`] (with a
//! warning), while [`generate_mask_checked`] refuses them.

use std::fmt;

use burn::tensor::{Tensor, backend::Backend};
use log::{debug, warn};
use serde::{Deserialize, Serialize};

use crate::error::BibdError;
use crate::field::{GaloisField, prime_power};

/// Which side of the incidence matrix faces the layer input.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum MaskOrientation {
    /// Uses the transposed matrix: `r(r+1)` block inputs feed `r²` point
    /// outputs. Each output sees the `r + 1` blocks through its point.
    PointsFromBlocks,
    /// Uses the matrix as generated: `r²` point inputs feed `r(r+1)` block
    /// outputs. Each output sees the `r` points of its block.
    BlocksFromPoints,
}

impl MaskOrientation {
    /// `[d_output, d_input]` of a weight masked with this orientation.
    pub fn shape(self, order: usize) -> [usize; 2] {
        let points = order * order;
        let blocks = order * (order + 1);
        match self {
            Self::PointsFromBlocks => [points, blocks],
            Self::BlocksFromPoints => [blocks, points],
        }
    }
}

/// Arithmetic used to lay out the orthogonal grids.
enum GridArithmetic {
    Field(GaloisField),
    /// Integers mod `r`; only balanced when `r` is prime.
    Modular(usize),
}

impl GridArithmetic {
    /// `slope · row + offset`
    fn line_point(&self, slope: usize, row: usize, offset: usize) -> usize {
        match self {
            Self::Field(field) => field.add(field.mul(slope, row), offset),
            Self::Modular(order) => (slope * row + offset) % order,
        }
    }
}

/// Binary incidence matrix of a BIBD of order `r`, stored row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BibdMask {
    order: usize,
    rows: usize,
    cols: usize,
    cells: Vec<u8>,
}

/// Generate the incidence matrix for `order`.
///
/// Prime-power orders give a balanced design. Any other order `≥ 2` yields a
/// matrix of the right shape and row weight that does not cover every point
/// pair exactly once; a warning is logged in that case.
pub fn generate_mask(order: usize) -> Result<BibdMask, BibdError> {
    if order < 2 {
        return Err(BibdError::InvalidOrder { order });
    }
    let arithmetic = match GaloisField::new(order) {
        Ok(field) => GridArithmetic::Field(field),
        Err(_) => {
            warn!("BIBD order {order} is not a prime power, generated mask will be unbalanced");
            GridArithmetic::Modular(order)
        }
    };
    Ok(build(order, &arithmetic))
}

/// Like [`generate_mask`], but fails with [`BibdError::NotPrimePower`]
/// instead of returning an unbalanced matrix.
pub fn generate_mask_checked(order: usize) -> Result<BibdMask, BibdError> {
    let field = GaloisField::new(order)?;
    Ok(build(order, &GridArithmetic::Field(field)))
}

fn build(order: usize, arithmetic: &GridArithmetic) -> BibdMask {
    let r = order;
    let mut mask = BibdMask::zeros(r);

    for m in 0..r {
        for n in r * m..r * m + r {
            mask.set(m, n);
        }
    }

    for m in r..2 * r {
        for n in 0..r {
            mask.set(m, (m - r) + r * n);
        }
    }

    for slope in 1..r {
        for (n, line) in transposed_grid(r, slope, arithmetic).iter().enumerate() {
            for &point in line {
                mask.set(r * (slope + 1) + n, point);
            }
        }
    }

    debug!(
        "Generated BIBD mask of order {order}: {}x{}",
        mask.rows, mask.cols
    );
    mask
}

/// Row `j` of the result is column `j` of the grid `(slope·i + j) + r·i`.
fn transposed_grid(order: usize, slope: usize, arithmetic: &GridArithmetic) -> Vec<Vec<usize>> {
    (0..order)
        .map(|j| {
            (0..order)
                .map(|i| arithmetic.line_point(slope, i, j) + order * i)
                .collect()
        })
        .collect()
}

impl BibdMask {
    fn zeros(order: usize) -> Self {
        let rows = order * (order + 1);
        let cols = order * order;
        Self {
            order,
            rows,
            cols,
            cells: vec![0; rows * cols],
        }
    }

    fn set(&mut self, row: usize, col: usize) {
        self.cells[row * self.cols + col] = 1;
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Number of blocks, `r(r+1)`.
    pub fn rows(&self) -> usize {
        self.rows
    }

    /// Number of points, `r²`.
    pub fn cols(&self) -> usize {
        self.cols
    }

    pub fn shape(&self) -> [usize; 2] {
        [self.rows, self.cols]
    }

    pub fn get(&self, row: usize, col: usize) -> bool {
        self.cells[row * self.cols + col] == 1
    }

    pub fn row(&self, row: usize) -> &[u8] {
        &self.cells[row * self.cols..(row + 1) * self.cols]
    }

    /// Row-major cells, each `0` or `1`.
    pub fn cells(&self) -> &[u8] {
        &self.cells
    }

    pub fn to_rows(&self) -> Vec<Vec<u8>> {
        self.cells.chunks(self.cols).map(<[u8]>::to_vec).collect()
    }

    /// Block sizes; all equal to `r`.
    pub fn row_sums(&self) -> Vec<usize> {
        self.cells
            .chunks(self.cols)
            .map(|row| row.iter().map(|&c| c as usize).sum())
            .collect()
    }

    /// Point replication counts; all equal to `r + 1` for a prime-power order.
    pub fn column_sums(&self) -> Vec<usize> {
        let mut sums = vec![0; self.cols];
        for row in self.cells.chunks(self.cols) {
            for (sum, &c) in sums.iter_mut().zip(row) {
                *sum += c as usize;
            }
        }
        sums
    }

    /// Minimum and maximum number of blocks shared by two distinct points.
    pub fn pair_coverage(&self) -> (usize, usize) {
        let mut counts = vec![0usize; self.cols * self.cols];
        for row in self.cells.chunks(self.cols) {
            let points: Vec<usize> = row
                .iter()
                .enumerate()
                .filter(|&(_, &c)| c == 1)
                .map(|(col, _)| col)
                .collect();
            for (i, &a) in points.iter().enumerate() {
                for &b in &points[i + 1..] {
                    counts[a * self.cols + b] += 1;
                }
            }
        }
        let mut min = usize::MAX;
        let mut max = 0;
        for a in 0..self.cols {
            for b in a + 1..self.cols {
                let count = counts[a * self.cols + b];
                min = min.min(count);
                max = max.max(count);
            }
        }
        (min, max)
    }

    /// True when every block has `r` points and every point pair shares
    /// exactly one block.
    pub fn is_balanced(&self) -> bool {
        self.row_sums().iter().all(|&s| s == self.order) && self.pair_coverage() == (1, 1)
    }

    /// The mask as a float 0/1 tensor of shape `orientation.shape(r)`.
    pub fn to_tensor<B: Backend>(
        &self,
        orientation: MaskOrientation,
        device: &B::Device,
    ) -> Tensor<B, 2> {
        let values: Vec<f32> = self.cells.iter().map(|&c| c as f32).collect();
        let tensor = Tensor::<B, 1>::from_floats(values.as_slice(), device).reshape([self.rows, self.cols]);
        match orientation {
            MaskOrientation::BlocksFromPoints => tensor,
            MaskOrientation::PointsFromBlocks => tensor.transpose(),
        }
    }

    pub fn summary(&self) -> MaskSummary {
        let row_sums = self.row_sums();
        let column_sums = self.column_sums();
        let (pair_min, pair_max) = self.pair_coverage();
        let prime_power = prime_power(self.order);
        MaskSummary {
            order: self.order,
            rows: self.rows,
            cols: self.cols,
            characteristic: prime_power.map(|(p, _)| p),
            degree: prime_power.map(|(_, e)| e),
            block_size: min_max(&row_sums),
            replication: min_max(&column_sums),
            pair_coverage: [pair_min, pair_max],
            balanced: self.is_balanced(),
        }
    }
}

fn min_max(values: &[usize]) -> [usize; 2] {
    let min = values.iter().copied().min().unwrap_or(0);
    let max = values.iter().copied().max().unwrap_or(0);
    [min, max]
}

impl fmt::Display for BibdMask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.cells.chunks(self.cols) {
            let cells: Vec<String> = row.iter().map(u8::to_string).collect();
            writeln!(f, "[{}]", cells.join(" "))?;
        }
        Ok(())
    }
}

/// Design statistics of a generated mask; `[min, max]` pairs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MaskSummary {
    pub order: usize,
    pub rows: usize,
    pub cols: usize,
    pub characteristic: Option<usize>,
    pub degree: Option<u32>,
    pub block_size: [usize; 2],
    pub replication: [usize; 2],
    pub pair_coverage: [usize; 2],
    pub balanced: bool,
}
