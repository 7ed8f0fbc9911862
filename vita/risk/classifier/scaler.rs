use serde::{Deserialize, Serialize};

/// Per-column standardization statistics, fit on the training partition
/// only and reused verbatim for evaluation and inference rows.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardScaler {
    means: Vec<f64>,
    variances: Vec<f64>,
}

impl StandardScaler {
    /// Computes per-column mean and population variance.
    #[must_use]
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let Some(first) = rows.first() else {
            return Self {
                means: Vec::new(),
                variances: Vec::new(),
            };
        };
        let dim = first.len();
        let count = rows.len() as f64;

        let mut means = vec![0.0; dim];
        for row in rows {
            for (mean, value) in means.iter_mut().zip(row) {
                *mean += value;
            }
        }
        for mean in &mut means {
            *mean /= count;
        }

        let mut variances = vec![0.0; dim];
        for row in rows {
            for (idx, value) in row.iter().enumerate() {
                variances[idx] += (value - means[idx]).powi(2);
            }
        }
        for variance in &mut variances {
            *variance /= count;
        }

        Self { means, variances }
    }

    /// Standardizes one row to zero mean and unit variance.
    #[must_use]
    pub fn transform(&self, row: &[f64]) -> Vec<f64> {
        row.iter()
            .zip(self.means.iter().zip(&self.variances))
            .map(|(value, (mean, variance))| (value - mean) / variance.sqrt().max(1e-6))
            .collect()
    }

    /// Standardizes a batch of rows.
    #[must_use]
    pub fn transform_all(&self, rows: &[Vec<f64>]) -> Vec<Vec<f64>> {
        rows.iter().map(|row| self.transform(row)).collect()
    }

    /// Per-column means.
    #[must_use]
    pub fn means(&self) -> &[f64] {
        &self.means
    }

    /// Per-column variances.
    #[must_use]
    pub fn variances(&self) -> &[f64] {
        &self.variances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn standardizes_to_zero_mean_unit_variance() {
        let rows = vec![vec![1.0, 10.0], vec![2.0, 20.0], vec![3.0, 30.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform_all(&rows);
        for column in 0..2 {
            let mean: f64 = scaled.iter().map(|r| r[column]).sum::<f64>() / 3.0;
            let variance: f64 =
                scaled.iter().map(|r| (r[column] - mean).powi(2)).sum::<f64>() / 3.0;
            assert!(mean.abs() < 1e-9);
            assert!((variance - 1.0).abs() < 1e-9);
        }
    }

    #[test]
    fn constant_columns_do_not_divide_by_zero() {
        let rows = vec![vec![5.0], vec![5.0], vec![5.0]];
        let scaler = StandardScaler::fit(&rows);
        let scaled = scaler.transform(&[5.0]);
        assert!(scaled[0].is_finite());
        assert!(scaled[0].abs() < 1e-9);
    }

    #[test]
    fn training_statistics_apply_to_unseen_rows() {
        let rows = vec![vec![0.0], vec![2.0]];
        let scaler = StandardScaler::fit(&rows);
        // mean 1, variance 1; an unseen value of 3 lands two deviations out.
        let scaled = scaler.transform(&[3.0]);
        assert!((scaled[0] - 2.0).abs() < 1e-9);
    }
}
