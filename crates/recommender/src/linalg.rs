//! Truncated SVD and latent-space correlation
//!
//! The decomposition is a randomized range finder (Halko et al.) followed by
//! an exact eigen-decomposition of the small projected Gram matrix:
//!
//! 1. Y = A·Ω for a seeded random Ω, orthonormalized into Q
//! 2. power iterations Q <- orth(A·orth(Aᵀ·Q)) sharpen the spectrum
//! 3. B = Qᵀ·A, and the eigenpairs (λ, W) of B·Bᵀ give U = Q·W, σ = √λ
//!
//! Only the reduced representation U·Σ is kept.

use ndarray::{Array1, Array2, Axis};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

const ORTHO_EPS: f64 = 1e-10;
const JACOBI_MAX_SWEEPS: usize = 100;
const JACOBI_TOLERANCE: f64 = 1e-22;

/// Randomized truncated SVD parameters
#[derive(Debug, Clone)]
pub struct TruncatedSvd {
    pub n_components: usize,
    pub oversamples: usize,
    pub power_iterations: usize,
    pub seed: u64,
}

/// Output of [`TruncatedSvd::fit_transform`]
#[derive(Debug, Clone)]
pub struct SvdDecomposition {
    /// Rows of `U·Σ`, one per input row
    pub reduced: Array2<f64>,
    /// Singular values in descending order
    pub singular_values: Vec<f64>,
}

impl TruncatedSvd {
    pub fn new(n_components: usize) -> Self {
        Self {
            n_components,
            oversamples: 10,
            power_iterations: 5,
            seed: 42,
        }
    }

    /// Reduce `matrix` (rows × cols) to `n_components` columns
    pub fn fit_transform(&self, matrix: &Array2<f64>) -> SvdDecomposition {
        let (rows, cols) = matrix.dim();
        let rank_bound = rows.min(cols);
        let k = self.n_components.min(rank_bound);
        if k == 0 {
            return SvdDecomposition {
                reduced: Array2::zeros((rows, 0)),
                singular_values: Vec::new(),
            };
        }

        let sketch = (k + self.oversamples).min(rank_bound);
        let mut rng = StdRng::seed_from_u64(self.seed);
        let omega = Array2::from_shape_fn((cols, sketch), |_| rng.gen_range(-1.0..1.0));

        let mut q = orthonormalize(matrix.dot(&omega));
        for _ in 0..self.power_iterations {
            let z = orthonormalize(matrix.t().dot(&q));
            q = orthonormalize(matrix.dot(&z));
        }

        let b = q.t().dot(matrix);
        let gram = b.dot(&b.t());
        let (eigenvalues, eigenvectors) = symmetric_eigen(gram);

        let mut order: Vec<usize> = (0..eigenvalues.len()).collect();
        order.sort_by(|&a, &b| eigenvalues[b].total_cmp(&eigenvalues[a]));
        order.truncate(k);

        let mut reduced = Array2::<f64>::zeros((rows, k));
        let mut singular_values = Vec::with_capacity(k);
        for (target, &source) in order.iter().enumerate() {
            let sigma = eigenvalues[source].max(0.0).sqrt();
            let mut u = q.dot(&eigenvectors.column(source));
            flip_sign(&mut u);
            reduced.column_mut(target).assign(&(u * sigma));
            singular_values.push(sigma);
        }

        debug!(rows, cols, components = k, sketch, "Computed truncated SVD");
        SvdDecomposition {
            reduced,
            singular_values,
        }
    }
}

/// Make the largest-magnitude entry positive so the output sign is stable
fn flip_sign(vector: &mut Array1<f64>) {
    let pivot = vector
        .iter()
        .copied()
        .fold(0.0f64, |acc, v| if v.abs() > acc.abs() { v } else { acc });
    if pivot < 0.0 {
        vector.mapv_inplace(|v| -v);
    }
}

/// Modified Gram-Schmidt over columns; dependent columns become zero
fn orthonormalize(mut matrix: Array2<f64>) -> Array2<f64> {
    for j in 0..matrix.ncols() {
        for p in 0..j {
            let previous = matrix.column(p).to_owned();
            let projection = previous.dot(&matrix.column(j));
            matrix.column_mut(j).scaled_add(-projection, &previous);
        }

        let norm = matrix.column(j).dot(&matrix.column(j)).sqrt();
        if norm > ORTHO_EPS {
            matrix.column_mut(j).mapv_inplace(|v| v / norm);
        } else {
            matrix.column_mut(j).fill(0.0);
        }
    }
    matrix
}

/// Cyclic Jacobi eigen-decomposition of a symmetric matrix.
/// Returns eigenvalues and the matching eigenvectors as columns.
fn symmetric_eigen(mut a: Array2<f64>) -> (Vec<f64>, Array2<f64>) {
    let n = a.nrows();
    let mut v = Array2::<f64>::eye(n);

    for _ in 0..JACOBI_MAX_SWEEPS {
        let off_diagonal: f64 = (0..n)
            .flat_map(|p| (0..n).filter(move |&q| q != p).map(move |q| (p, q)))
            .map(|(p, q)| a[[p, q]] * a[[p, q]])
            .sum();
        if off_diagonal < JACOBI_TOLERANCE {
            break;
        }

        for p in 0..n {
            for q in (p + 1)..n {
                let apq = a[[p, q]];
                if apq == 0.0 {
                    continue;
                }

                let theta = (a[[q, q]] - a[[p, p]]) / (2.0 * apq);
                let t = theta.signum() / (theta.abs() + (theta * theta + 1.0).sqrt());
                let c = 1.0 / (t * t + 1.0).sqrt();
                let s = t * c;

                for k in 0..n {
                    let (akp, akq) = (a[[k, p]], a[[k, q]]);
                    a[[k, p]] = c * akp - s * akq;
                    a[[k, q]] = s * akp + c * akq;
                }
                for k in 0..n {
                    let (apk, aqk) = (a[[p, k]], a[[q, k]]);
                    a[[p, k]] = c * apk - s * aqk;
                    a[[q, k]] = s * apk + c * aqk;
                }
                for k in 0..n {
                    let (vkp, vkq) = (v[[k, p]], v[[k, q]]);
                    v[[k, p]] = c * vkp - s * vkq;
                    v[[k, q]] = s * vkp + c * vkq;
                }
            }
        }
    }

    (a.diag().to_vec(), v)
}

/// Pearson correlation between rows of a latent matrix.
///
/// Rows are stored mean-centred and scaled to unit length, so the
/// correlation of two rows is their dot product. Zero-variance rows
/// correlate 0 with everything.
#[derive(Debug, Clone)]
pub struct LatentCorrelation {
    standardized: Array2<f64>,
}

impl LatentCorrelation {
    pub fn from_latent(latent: &Array2<f64>) -> Self {
        let mut standardized = latent.to_owned();
        for mut row in standardized.axis_iter_mut(Axis(0)) {
            let len = row.len();
            if len == 0 {
                continue;
            }
            let mean = row.sum() / len as f64;
            row.mapv_inplace(|v| v - mean);
            let norm = row.dot(&row).sqrt();
            if norm > ORTHO_EPS {
                row.mapv_inplace(|v| v / norm);
            } else {
                row.fill(0.0);
            }
        }
        Self { standardized }
    }

    pub fn n_items(&self) -> usize {
        self.standardized.nrows()
    }

    pub fn correlation(&self, i: usize, j: usize) -> f64 {
        self.standardized.row(i).dot(&self.standardized.row(j))
    }

    /// Correlations of row `i` with every row
    pub fn correlation_row(&self, i: usize) -> Array1<f64> {
        self.standardized.dot(&self.standardized.row(i))
    }

    /// Full item × item correlation matrix
    pub fn correlation_matrix(&self) -> Array2<f64> {
        self.standardized.dot(&self.standardized.t())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ndarray::array;

    fn assert_close(a: f64, b: f64) {
        assert!((a - b).abs() < 1e-8, "{a} != {b}");
    }

    #[test]
    fn test_orthonormalize_drops_dependent_columns() {
        let m = array![[1.0, 2.0, 0.0], [0.0, 0.0, 1.0], [1.0, 2.0, 0.0]];
        let q = orthonormalize(m);

        assert_close(q.column(0).dot(&q.column(0)), 1.0);
        assert_close(q.column(1).dot(&q.column(1)), 0.0);
        assert_close(q.column(0).dot(&q.column(2)), 0.0);
    }

    #[test]
    fn test_symmetric_eigen() {
        let a = array![[2.0, 1.0], [1.0, 2.0]];
        let (mut values, vectors) = symmetric_eigen(a.clone());
        let reconstructed = a.dot(&vectors.column(0));
        for (x, y) in reconstructed.iter().zip(vectors.column(0).iter()) {
            assert_close(*x, values[0] * y);
        }
        values.sort_by(f64::total_cmp);
        assert_close(values[0], 1.0);
        assert_close(values[1], 3.0);
    }

    #[test]
    fn test_rank_one_singular_value() {
        // outer product of [1, 2, 2] and [3, 4]: sigma = 3 * 5
        let a = array![[3.0, 4.0], [6.0, 8.0], [6.0, 8.0]];
        let svd = TruncatedSvd::new(1).fit_transform(&a);

        assert_eq!(svd.reduced.dim(), (3, 1));
        assert_close(svd.singular_values[0], 15.0);
        assert_close(svd.reduced[[0, 0]], 5.0);
        assert_close(svd.reduced[[1, 0]], 10.0);
    }

    #[test]
    fn test_full_rank_preserves_gram_matrix() {
        let a = array![
            [5.0, 3.0, 0.0, 1.0],
            [4.0, 0.0, 0.0, 1.0],
            [1.0, 1.0, 0.0, 5.0],
            [0.0, 0.0, 5.0, 4.0],
            [0.0, 1.0, 5.0, 4.0]
        ];
        let svd = TruncatedSvd::new(4).fit_transform(&a);
        let expected = a.dot(&a.t());
        let actual = svd.reduced.dot(&svd.reduced.t());

        for (x, y) in expected.iter().zip(actual.iter()) {
            assert_close(*x, *y);
        }
        assert!(svd
            .singular_values
            .windows(2)
            .all(|w| w[0] >= w[1] - 1e-12));
    }

    #[test]
    fn test_deterministic_for_fixed_seed() {
        let a = array![[1.0, 0.0, 3.0], [2.0, 5.0, 0.0], [0.0, 4.0, 4.0], [1.0, 1.0, 1.0]];
        let first = TruncatedSvd::new(2).fit_transform(&a);
        let second = TruncatedSvd::new(2).fit_transform(&a);
        assert_eq!(first.reduced, second.reduced);
    }

    #[test]
    fn test_zero_components() {
        let a = array![[1.0, 2.0]];
        let svd = TruncatedSvd::new(0).fit_transform(&a);
        assert_eq!(svd.reduced.dim(), (1, 0));
        assert!(svd.singular_values.is_empty());
    }

    #[test]
    fn test_latent_correlation() {
        let latent = array![[1.0, 2.0, 3.0], [2.0, 4.0, 6.0], [3.0, 2.0, 1.0], [1.0, 1.0, 1.0]];
        let corr = LatentCorrelation::from_latent(&latent);

        assert_eq!(corr.n_items(), 4);
        assert_close(corr.correlation(0, 1), 1.0);
        assert_close(corr.correlation(0, 2), -1.0);
        assert_close(corr.correlation(0, 3), 0.0);
        assert_close(corr.correlation(3, 3), 0.0);

        let row = corr.correlation_row(0);
        let matrix = corr.correlation_matrix();
        assert_eq!(matrix.dim(), (4, 4));
        for j in 0..4 {
            assert_close(row[j], matrix[[0, j]]);
        }
    }
}
