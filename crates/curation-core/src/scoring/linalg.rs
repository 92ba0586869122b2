//! Dense linear algebra for category models.
//!
//! Everything is computed in f64 regardless of the f32 storage format of
//! embeddings. Dimensions are small enough (hundreds) that a straightforward
//! Gauss-Jordan inverse is adequate.

/// Pivots smaller than this fraction of the largest matrix entry are treated as zero.
pub const SINGULAR_TOLERANCE: f64 = 1e-12;

/// Row-major square matrix.
#[derive(Debug, Clone, PartialEq)]
pub struct SquareMatrix {
    dim: usize,
    data: Vec<f64>,
}

impl SquareMatrix {
    pub fn zeros(dim: usize) -> Self {
        Self {
            dim,
            data: vec![0.0; dim * dim],
        }
    }

    pub fn identity(dim: usize) -> Self {
        let mut m = Self::zeros(dim);
        for i in 0..dim {
            m.set(i, i, 1.0);
        }
        m
    }

    /// Build from rows. Returns `None` if the rows do not form a square matrix.
    pub fn from_rows(rows: &[Vec<f64>]) -> Option<Self> {
        let dim = rows.len();
        if rows.iter().any(|r| r.len() != dim) {
            return None;
        }
        Some(Self {
            dim,
            data: rows.iter().flatten().copied().collect(),
        })
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    #[inline]
    pub fn get(&self, row: usize, col: usize) -> f64 {
        self.data[row * self.dim + col]
    }

    #[inline]
    pub fn set(&mut self, row: usize, col: usize, value: f64) {
        self.data[row * self.dim + col] = value;
    }

    /// `self @ v`
    pub fn mul_vec(&self, v: &[f64]) -> Vec<f64> {
        debug_assert_eq!(v.len(), self.dim);
        self.data
            .chunks_exact(self.dim.max(1))
            .take(self.dim)
            .map(|row| row.iter().zip(v).map(|(a, b)| a * b).sum())
            .collect()
    }

    fn max_abs(&self) -> f64 {
        self.data.iter().fold(0.0_f64, |acc, x| acc.max(x.abs()))
    }

    fn swap_rows(&mut self, a: usize, b: usize) {
        if a == b {
            return;
        }
        for col in 0..self.dim {
            self.data.swap(a * self.dim + col, b * self.dim + col);
        }
    }

    /// Gauss-Jordan inverse with partial pivoting.
    ///
    /// Returns `None` when the matrix is singular (or numerically so): an
    /// all-zero matrix, or any pivot below `SINGULAR_TOLERANCE` relative to
    /// the largest entry.
    pub fn inverse(&self) -> Option<SquareMatrix> {
        let n = self.dim;
        if n == 0 {
            return None;
        }
        let scale = self.max_abs();
        if scale == 0.0 || !scale.is_finite() {
            return None;
        }
        let tolerance = scale * SINGULAR_TOLERANCE;

        let mut a = self.clone();
        let mut inv = SquareMatrix::identity(n);

        for col in 0..n {
            let pivot_row = (col..n)
                .max_by(|&x, &y| {
                    a.get(x, col)
                        .abs()
                        .partial_cmp(&a.get(y, col).abs())
                        .unwrap_or(std::cmp::Ordering::Equal)
                })
                .unwrap_or(col);

            let pivot = a.get(pivot_row, col);
            if pivot.abs() <= tolerance || !pivot.is_finite() {
                return None;
            }

            a.swap_rows(col, pivot_row);
            inv.swap_rows(col, pivot_row);

            for j in 0..n {
                a.set(col, j, a.get(col, j) / pivot);
                inv.set(col, j, inv.get(col, j) / pivot);
            }

            for row in 0..n {
                if row == col {
                    continue;
                }
                let factor = a.get(row, col);
                if factor == 0.0 {
                    continue;
                }
                for j in 0..n {
                    a.set(row, j, a.get(row, j) - factor * a.get(col, j));
                    inv.set(row, j, inv.get(row, j) - factor * inv.get(col, j));
                }
            }
        }

        Some(inv)
    }
}

/// Column means of `rows`. All rows must share one length.
pub fn mean_vector(rows: &[&[f32]]) -> Vec<f64> {
    let Some(first) = rows.first() else {
        return Vec::new();
    };
    let mut mean = vec![0.0_f64; first.len()];
    for row in rows {
        for (m, x) in mean.iter_mut().zip(row.iter()) {
            *m += f64::from(*x);
        }
    }
    let n = rows.len() as f64;
    for m in &mut mean {
        *m /= n;
    }
    mean
}

/// Unbiased sample covariance (denominator n - 1) over the feature dimension.
///
/// Requires at least two rows.
pub fn sample_covariance(rows: &[&[f32]], mean: &[f64]) -> SquareMatrix {
    let d = mean.len();
    let mut cov = SquareMatrix::zeros(d);
    if rows.len() < 2 {
        return cov;
    }

    let mut centered = vec![0.0_f64; d];
    for row in rows {
        for (c, (x, m)) in centered.iter_mut().zip(row.iter().zip(mean)) {
            *c = f64::from(*x) - m;
        }
        for i in 0..d {
            let ci = centered[i];
            for j in i..d {
                let idx = i * d + j;
                cov.data[idx] += ci * centered[j];
            }
        }
    }

    let denom = (rows.len() - 1) as f64;
    for i in 0..d {
        for j in i..d {
            let v = cov.get(i, j) / denom;
            cov.set(i, j, v);
            cov.set(j, i, v);
        }
    }
    cov
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_inverse_of_known_2x2() {
        let m = SquareMatrix::from_rows(&[vec![4.0, 7.0], vec![2.0, 6.0]]).unwrap();
        let inv = m.inverse().unwrap();
        assert!(approx(inv.get(0, 0), 0.6));
        assert!(approx(inv.get(0, 1), -0.7));
        assert!(approx(inv.get(1, 0), -0.2));
        assert!(approx(inv.get(1, 1), 0.4));
    }

    #[test]
    fn test_inverse_needs_pivoting() {
        // Zero in the leading position forces a row swap.
        let m = SquareMatrix::from_rows(&[vec![0.0, 1.0], vec![1.0, 0.0]]).unwrap();
        let inv = m.inverse().unwrap();
        assert_eq!(inv, m);
    }

    #[test]
    fn test_inverse_times_matrix_is_identity() {
        let m = SquareMatrix::from_rows(&[
            vec![2.0, 0.5, 0.1],
            vec![0.5, 3.0, 0.2],
            vec![0.1, 0.2, 1.5],
        ])
        .unwrap();
        let inv = m.inverse().unwrap();
        for col in 0..3 {
            let e: Vec<f64> = (0..3).map(|i| inv.get(i, col)).collect();
            let back = m.mul_vec(&e);
            for (row, v) in back.iter().enumerate() {
                let expected = if row == col { 1.0 } else { 0.0 };
                assert!(approx(*v, expected), "({row},{col}) = {v}");
            }
        }
    }

    #[test]
    fn test_singular_matrices_have_no_inverse() {
        let rank_one = SquareMatrix::from_rows(&[vec![1.0, 1.0], vec![1.0, 1.0]]).unwrap();
        assert!(rank_one.inverse().is_none());
        assert!(SquareMatrix::zeros(3).inverse().is_none());
    }

    #[test]
    fn test_sample_covariance_matches_hand_computation() {
        let rows: Vec<&[f32]> = vec![&[0.0, 0.0], &[2.0, 0.0], &[0.0, 2.0], &[2.0, 2.0], &[1.0, 1.0]];
        let mean = mean_vector(&rows);
        assert_eq!(mean, vec![1.0, 1.0]);

        let cov = sample_covariance(&rows, &mean);
        assert!(approx(cov.get(0, 0), 1.0));
        assert!(approx(cov.get(1, 1), 1.0));
        assert!(approx(cov.get(0, 1), 0.0));
        assert!(approx(cov.get(1, 0), 0.0));
    }

    #[test]
    fn test_from_rows_rejects_ragged_input() {
        assert!(SquareMatrix::from_rows(&[vec![1.0, 2.0], vec![3.0]]).is_none());
    }
}
