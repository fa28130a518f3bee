//! Square matrix blocks and the numeric kernels that operate on them.
//!
//! A `Block` is a square sub-matrix stored row-major in a flat `Vec<f64>`.
//! Workers apply the product and sum kernels; the decomposition engine uses
//! the element-wise ops and quadrant split/join to assemble Strassen
//! operands and results.

use crate::error::{BlockError, BlockResult};

/// A square matrix block in row-major order.
///
/// The invariant `data.len() == dim * dim` holds for every constructed
/// block; all constructors validate it.
#[derive(Debug, Clone, PartialEq)]
pub struct Block {
    dim: usize,
    data: Vec<f64>,
}

impl Block {
    /// Create a zero-filled block of the given dimension.
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    /// Build a block from nested rows, validating squareness.
    pub fn from_rows(rows: Vec<Vec<f64>>) -> BlockResult<Self> {
        if rows.is_empty() {
            return Err(BlockError::Empty);
        }
        let dim = rows.len();
        let mut data = Vec::with_capacity(dim * dim);
        for (i, row) in rows.iter().enumerate() {
            if row.len() != dim {
                if row.len() == rows[0].len() {
                    // Rectangular but not square.
                    return Err(BlockError::NotSquare {
                        rows: dim,
                        cols: row.len(),
                    });
                }
                return Err(BlockError::RaggedRow {
                    row: i,
                    got: row.len(),
                    expected: dim,
                });
            }
            data.extend_from_slice(row);
        }
        Ok(Self { dim, data })
    }

    /// Build a block from a flat row-major payload, validating the length.
    pub fn from_flat(dim: usize, data: Vec<f64>) -> BlockResult<Self> {
        if dim == 0 {
            return Err(BlockError::Empty);
        }
        if data.len() != dim * dim {
            return Err(BlockError::LengthMismatch {
                len: data.len(),
                dim,
            });
        }
        Ok(Self { dim, data })
    }

    /// Side length of the block.
    pub fn dim(&self) -> usize {
        self.dim
    }

    /// Value at `(row, col)`.
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }

    /// Flat row-major view of the block.
    pub fn data(&self) -> &[f64] {
        &self.data
    }

    /// Consume the block into its flat payload.
    pub fn into_data(self) -> Vec<f64> {
        self.data
    }

    /// Copy out as nested rows (for JSON responses).
    pub fn rows(&self) -> Vec<Vec<f64>> {
        self.data.chunks(self.dim).map(<[f64]>::to_vec).collect()
    }

    /// Element-wise sum. Both blocks must share a dimension.
    pub fn add(&self, other: &Block) -> Block {
        debug_assert_eq!(self.dim, other.dim);
        Block {
            dim: self.dim,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a + b)
                .collect(),
        }
    }

    /// Element-wise difference. Both blocks must share a dimension.
    pub fn sub(&self, other: &Block) -> Block {
        debug_assert_eq!(self.dim, other.dim);
        Block {
            dim: self.dim,
            data: self
                .data
                .iter()
                .zip(&other.data)
                .map(|(a, b)| a - b)
                .collect(),
        }
    }

    /// Element-wise negation.
    pub fn negated(&self) -> Block {
        Block {
            dim: self.dim,
            data: self.data.iter().map(|v| -v).collect(),
        }
    }

    /// Full matrix product of two blocks.
    ///
    /// Row-major i-k-j loop order so the inner loop walks both operands
    /// sequentially.
    pub fn multiply(&self, other: &Block) -> Block {
        debug_assert_eq!(self.dim, other.dim);
        let n = self.dim;
        let mut out = Block::zeros(n);
        for i in 0..n {
            for k in 0..n {
                let lhs = self.data[i * n + k];
                for j in 0..n {
                    out.data[i * n + j] += lhs * other.data[k * n + j];
                }
            }
        }
        out
    }

    /// Split into four quadrants `[q11, q12, q21, q22]`.
    ///
    /// The dimension must be even and at least 2.
    pub fn split_quadrants(&self) -> BlockResult<[Block; 4]> {
        if self.dim < 2 || self.dim % 2 != 0 {
            return Err(BlockError::NotSplittable(self.dim));
        }
        let half = self.dim / 2;
        let mut quads = [
            Block::zeros(half),
            Block::zeros(half),
            Block::zeros(half),
            Block::zeros(half),
        ];
        for r in 0..self.dim {
            for c in 0..self.dim {
                let q = (r / half) * 2 + (c / half);
                quads[q].data[(r % half) * half + (c % half)] = self.data[r * self.dim + c];
            }
        }
        Ok(quads)
    }

    /// Reassemble a block from four equally sized quadrants.
    pub fn join_quadrants(q11: &Block, q12: &Block, q21: &Block, q22: &Block) -> BlockResult<Block> {
        let half = q11.dim;
        if q12.dim != half || q21.dim != half || q22.dim != half {
            return Err(BlockError::QuadrantMismatch);
        }
        let dim = half * 2;
        let mut out = Block::zeros(dim);
        for r in 0..half {
            for c in 0..half {
                out.data[r * dim + c] = q11.data[r * half + c];
                out.data[r * dim + half + c] = q12.data[r * half + c];
                out.data[(half + r) * dim + c] = q21.data[r * half + c];
                out.data[(half + r) * dim + half + c] = q22.data[r * half + c];
            }
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn block2(values: [f64; 4]) -> Block {
        Block::from_flat(2, values.to_vec()).unwrap()
    }

    #[test]
    fn from_rows_accepts_square() {
        let b = Block::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(b.dim(), 2);
        assert_eq!(b.get(1, 0), 3.0);
    }

    #[test]
    fn from_rows_rejects_empty() {
        assert_eq!(Block::from_rows(vec![]), Err(BlockError::Empty));
    }

    #[test]
    fn from_rows_rejects_rectangular() {
        let err = Block::from_rows(vec![vec![1.0, 2.0, 3.0], vec![4.0, 5.0, 6.0]]).unwrap_err();
        assert_eq!(err, BlockError::NotSquare { rows: 2, cols: 3 });
    }

    #[test]
    fn from_rows_rejects_ragged() {
        let err = Block::from_rows(vec![vec![1.0, 2.0], vec![3.0]]).unwrap_err();
        assert_eq!(
            err,
            BlockError::RaggedRow {
                row: 1,
                got: 1,
                expected: 2
            }
        );
    }

    #[test]
    fn from_flat_validates_length() {
        assert!(Block::from_flat(2, vec![1.0; 4]).is_ok());
        let err = Block::from_flat(2, vec![1.0; 3]).unwrap_err();
        assert_eq!(err, BlockError::LengthMismatch { len: 3, dim: 2 });
    }

    #[test]
    fn elementwise_ops() {
        let a = block2([1.0, 2.0, 3.0, 4.0]);
        let b = block2([5.0, 6.0, 7.0, 8.0]);

        assert_eq!(a.add(&b), block2([6.0, 8.0, 10.0, 12.0]));
        assert_eq!(b.sub(&a), block2([4.0, 4.0, 4.0, 4.0]));
        assert_eq!(a.negated(), block2([-1.0, -2.0, -3.0, -4.0]));
    }

    #[test]
    fn multiply_identity() {
        let a = block2([1.0, 2.0, 3.0, 4.0]);
        let id = block2([1.0, 0.0, 0.0, 1.0]);
        assert_eq!(a.multiply(&id), a);
        assert_eq!(id.multiply(&a), a);
    }

    #[test]
    fn multiply_known_product() {
        let a = block2([1.0, 2.0, 3.0, 4.0]);
        let b = block2([5.0, 6.0, 7.0, 8.0]);
        // [1 2; 3 4] * [5 6; 7 8] = [19 22; 43 50]
        assert_eq!(a.multiply(&b), block2([19.0, 22.0, 43.0, 50.0]));
    }

    #[test]
    fn split_join_roundtrip() {
        let b = Block::from_flat(4, (0..16).map(f64::from).collect()).unwrap();
        let [q11, q12, q21, q22] = b.split_quadrants().unwrap();

        assert_eq!(q11, block2([0.0, 1.0, 4.0, 5.0]));
        assert_eq!(q12, block2([2.0, 3.0, 6.0, 7.0]));
        assert_eq!(q21, block2([8.0, 9.0, 12.0, 13.0]));
        assert_eq!(q22, block2([10.0, 11.0, 14.0, 15.0]));

        let joined = Block::join_quadrants(&q11, &q12, &q21, &q22).unwrap();
        assert_eq!(joined, b);
    }

    #[test]
    fn split_rejects_odd_and_scalar() {
        let b = Block::from_flat(1, vec![7.0]).unwrap();
        assert_eq!(b.split_quadrants(), Err(BlockError::NotSplittable(1)));

        let b = Block::from_flat(3, vec![0.0; 9]).unwrap();
        assert_eq!(b.split_quadrants(), Err(BlockError::NotSplittable(3)));
    }

    #[test]
    fn join_rejects_mismatched_quadrants() {
        let small = Block::from_flat(1, vec![1.0]).unwrap();
        let big = block2([1.0, 2.0, 3.0, 4.0]);
        let err = Block::join_quadrants(&small, &big, &small, &small).unwrap_err();
        assert_eq!(err, BlockError::QuadrantMismatch);
    }

    #[test]
    fn rows_match_storage() {
        let b = Block::from_rows(vec![vec![1.0, 2.0], vec![3.0, 4.0]]).unwrap();
        assert_eq!(b.rows(), vec![vec![1.0, 2.0], vec![3.0, 4.0]]);
    }
}
