//! Feature preprocessing: standard scaling for numeric columns, one-hot
//! encoding for categorical columns.
//!
//! Transformers are fit once on training data and then applied unchanged to
//! inference data, never refit on inference input, so the model sees the
//! same feature space it was trained in.

use sentiment_core::{PipelineError, PipelineResult};

/// Per-column standardization to zero mean and unit variance.
#[derive(Debug, Clone)]
pub struct StandardScaler {
    means: Vec<f64>,
    stds: Vec<f64>,
}

impl StandardScaler {
    /// Fit column means and standard deviations on training rows
    /// (row-major, all rows the same width).
    pub fn fit(rows: &[Vec<f64>]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let n = rows.len() as f64;

        let mut means = vec![0.0; width];
        for row in rows {
            for (i, value) in row.iter().enumerate() {
                means[i] += value;
            }
        }
        for mean in &mut means {
            *mean /= n.max(1.0);
        }

        let mut stds = vec![0.0; width];
        for row in rows {
            for (i, value) in row.iter().enumerate() {
                stds[i] += (value - means[i]).powi(2);
            }
        }
        for std in &mut stds {
            *std = (*std / n.max(1.0)).sqrt();
        }

        Self { means, stds }
    }

    /// Standardize rows with the fitted parameters. Zero-variance columns
    /// are centered only.
    pub fn transform(&self, rows: &[Vec<f64>]) -> PipelineResult<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.means.len() {
                    return Err(PipelineError::Validation(format!(
                        "numeric row width {} does not match fitted width {}",
                        row.len(),
                        self.means.len()
                    )));
                }
                Ok(row
                    .iter()
                    .enumerate()
                    .map(|(i, value)| {
                        let centered = value - self.means[i];
                        if self.stds[i] > 0.0 {
                            centered / self.stds[i]
                        } else {
                            centered
                        }
                    })
                    .collect())
            })
            .collect()
    }
}

/// One-hot encoding with categories collected from training data in
/// first-seen order. Categories unseen at fit time map to an all-zero
/// block at transform time, never an error.
#[derive(Debug, Clone)]
pub struct OneHotEncoder {
    categories: Vec<Vec<String>>,
}

impl OneHotEncoder {
    pub fn fit(rows: &[Vec<String>]) -> Self {
        let width = rows.first().map(|r| r.len()).unwrap_or(0);
        let mut categories: Vec<Vec<String>> = vec![Vec::new(); width];
        for row in rows {
            for (i, value) in row.iter().enumerate() {
                if !categories[i].contains(value) {
                    categories[i].push(value.clone());
                }
            }
        }
        Self { categories }
    }

    pub fn transform(&self, rows: &[Vec<String>]) -> PipelineResult<Vec<Vec<f64>>> {
        rows.iter()
            .map(|row| {
                if row.len() != self.categories.len() {
                    return Err(PipelineError::Validation(format!(
                        "categorical row width {} does not match fitted width {}",
                        row.len(),
                        self.categories.len()
                    )));
                }
                let mut encoded = Vec::new();
                for (i, value) in row.iter().enumerate() {
                    let position = self.categories[i].iter().position(|c| c == value);
                    for j in 0..self.categories[i].len() {
                        encoded.push(if position == Some(j) { 1.0 } else { 0.0 });
                    }
                }
                Ok(encoded)
            })
            .collect()
    }
}

/// Scaler + encoder pair fit together on one training set. Output rows are
/// the scaled numeric block followed by the one-hot block.
#[derive(Debug, Clone)]
pub struct Preprocessor {
    scaler: StandardScaler,
    encoder: OneHotEncoder,
}

impl Preprocessor {
    pub fn fit(numeric: &[Vec<f64>], categorical: &[Vec<String>]) -> Self {
        Self {
            scaler: StandardScaler::fit(numeric),
            encoder: OneHotEncoder::fit(categorical),
        }
    }

    pub fn transform(
        &self,
        numeric: &[Vec<f64>],
        categorical: &[Vec<String>],
    ) -> PipelineResult<Vec<Vec<f64>>> {
        if numeric.len() != categorical.len() {
            return Err(PipelineError::Validation(format!(
                "numeric and categorical row counts differ: {} vs {}",
                numeric.len(),
                categorical.len()
            )));
        }
        let scaled = self.scaler.transform(numeric)?;
        let encoded = self.encoder.transform(categorical)?;
        Ok(scaled
            .into_iter()
            .zip(encoded)
            .map(|(mut row, mut cat)| {
                row.append(&mut cat);
                row
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scaler_standardizes_to_zero_mean_unit_variance() {
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let scaler = StandardScaler::fit(&rows);
        let out = scaler.transform(&rows).unwrap();

        let mean: f64 = out.iter().map(|r| r[0]).sum::<f64>() / 3.0;
        assert!(mean.abs() < 1e-12);
        // Population std of [1,2,3] is sqrt(2/3); 3.0 maps to ~1.2247.
        assert!((out[2][0] - 1.224_744_871_391_589).abs() < 1e-9);
    }

    #[test]
    fn scaler_passes_zero_variance_columns_centered() {
        let rows = vec![vec![5.0, 1.0], vec![5.0, 3.0]];
        let scaler = StandardScaler::fit(&rows);
        let out = scaler.transform(&rows).unwrap();
        assert_eq!(out[0][0], 0.0);
        assert_eq!(out[1][0], 0.0);
    }

    #[test]
    fn encoder_uses_first_seen_order_and_ignores_unknowns() {
        let train = vec![
            vec!["positive".to_string()],
            vec!["negative".to_string()],
            vec!["positive".to_string()],
        ];
        let encoder = OneHotEncoder::fit(&train);

        let out = encoder
            .transform(&[vec!["negative".to_string()], vec!["neutral".to_string()]])
            .unwrap();
        // Known category: one-hot against [positive, negative].
        assert_eq!(out[0], vec![0.0, 1.0]);
        // Unknown category at inference time: all zeros, not an error.
        assert_eq!(out[1], vec![0.0, 0.0]);
    }

    #[test]
    fn preprocessor_is_fit_on_training_data_only() {
        let train_num = vec![vec![10.0], vec![20.0]];
        let train_cat = vec![vec!["hope".to_string()], vec!["fear".to_string()]];
        let p = Preprocessor::fit(&train_num, &train_cat);

        // Inference data with a wildly different scale and a fresh category
        // is transformed with the training-time parameters.
        let out = p
            .transform(&[vec![1000.0]], &[vec!["anger".to_string()]])
            .unwrap();
        assert_eq!(out.len(), 1);
        // (1000 - 15) / 5 = 197; encoder block is all zeros.
        assert!((out[0][0] - 197.0).abs() < 1e-9);
        assert_eq!(&out[0][1..], &[0.0, 0.0]);
    }

    #[test]
    fn preprocessor_rejects_mismatched_row_counts() {
        let p = Preprocessor::fit(&[vec![1.0]], &[vec!["a".to_string()]]);
        assert!(p.transform(&[vec![1.0]], &[]).is_err());
    }
}
