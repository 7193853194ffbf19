//! 1-D Gaussian Mixture Model fitted with Expectation-Maximization
//!
//! # Algorithm
//! 1. Initialize k component means evenly spaced over `[min, max]` of the
//!    samples, variance `(range / 2k)²`, weight `1/k`. No randomness: identical
//!    input always yields identical components.
//! 2. E-step: posterior responsibility of each component for each sample.
//! 3. M-step: re-estimate weight, mean, and variance from the responsibilities.
//! 4. Stop after `max_iterations` or once the log-likelihood moves by less
//!    than `tolerance`.
//!
//! `predict` hard-assigns samples and relabels components by ascending mean,
//! so label 0 always covers the best (lowest) ranks.

use std::f64::consts::PI;

use crate::error::{TierError, TierResult};

/// Variance floor; keeps the density finite for collapsed components
pub const MIN_VARIANCE: f64 = 0.1;
/// Probability floor inside `ln` so a sample never contributes `ln(0)`
pub const MIN_PROBABILITY: f64 = 1e-10;
pub const DEFAULT_MAX_ITERATIONS: usize = 100;
pub const DEFAULT_TOLERANCE: f64 = 1e-6;

/// One Gaussian component of the mixture
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GaussianComponent {
    pub weight: f64,
    pub mean: f64,
    pub variance: f64,
}

impl GaussianComponent {
    /// Gaussian probability density at `x`
    pub fn density(&self, x: f64) -> f64 {
        let variance = self.variance.max(MIN_VARIANCE);
        let coefficient = 1.0 / (2.0 * PI * variance).sqrt();
        coefficient * (-(x - self.mean).powi(2) / (2.0 * variance)).exp()
    }

    /// `ln(weight · density(x))` computed without underflow
    fn log_weighted_density(&self, x: f64) -> f64 {
        if self.weight <= 0.0 {
            return f64::NEG_INFINITY;
        }
        let variance = self.variance.max(MIN_VARIANCE);
        self.weight.ln()
            - 0.5 * (2.0 * PI * variance).ln()
            - (x - self.mean).powi(2) / (2.0 * variance)
    }
}

/// Gaussian mixture over 1-D samples
#[derive(Debug, Clone)]
pub struct GaussianMixtureModel {
    k: usize,
    max_iterations: usize,
    tolerance: f64,
    components: Vec<GaussianComponent>,
    iterations_run: usize,
    converged: bool,
    log_likelihood: f64,
}

impl GaussianMixtureModel {
    pub fn new(k: usize) -> Self {
        Self {
            k,
            max_iterations: DEFAULT_MAX_ITERATIONS,
            tolerance: DEFAULT_TOLERANCE,
            components: Vec::new(),
            iterations_run: 0,
            converged: false,
            log_likelihood: f64::NEG_INFINITY,
        }
    }

    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_tolerance(mut self, tolerance: f64) -> Self {
        self.tolerance = tolerance;
        self
    }

    /// Fitted components in fit order (empty before `fit`)
    pub fn components(&self) -> &[GaussianComponent] {
        &self.components
    }

    pub fn iterations_run(&self) -> usize {
        self.iterations_run
    }

    pub fn converged(&self) -> bool {
        self.converged
    }

    pub fn log_likelihood(&self) -> f64 {
        self.log_likelihood
    }

    /// Fit the mixture to `samples`
    ///
    /// # Errors
    /// - `InvalidTierCount` if k is zero
    /// - `InsufficientSamples` if there are fewer samples than components
    /// - `NonFiniteValue` for NaN/infinite samples or a diverged fit
    /// - `DegenerateInput` if all samples are equal and k > 1
    ///
    /// On error the model keeps whatever state it had before the call.
    pub fn fit(&mut self, samples: &[f64]) -> TierResult<()> {
        if self.k == 0 {
            return Err(TierError::InvalidTierCount(0));
        }
        if samples.len() < self.k {
            return Err(TierError::InsufficientSamples {
                samples: samples.len(),
                k: self.k,
            });
        }
        if let Some(bad) = samples.iter().find(|x| !x.is_finite()) {
            return Err(TierError::NonFiniteValue(format!("sample {}", bad)));
        }

        let min = samples.iter().copied().fold(f64::INFINITY, f64::min);
        let max = samples.iter().copied().fold(f64::NEG_INFINITY, f64::max);
        let range = max - min;
        if range <= 0.0 && self.k > 1 {
            return Err(TierError::DegenerateInput(format!(
                "all {} samples equal {}, cannot separate {} components",
                samples.len(),
                min,
                self.k
            )));
        }

        let mut components = initial_components(self.k, min, range);
        let mut previous = log_likelihood(&components, samples);
        let mut iterations_run = 0;
        let mut converged = false;

        for _ in 0..self.max_iterations {
            let responsibilities = expectation(&components, samples);
            components = maximization(&components, &responsibilities, samples);
            iterations_run += 1;

            let current = log_likelihood(&components, samples);
            if !current.is_finite() {
                return Err(TierError::NonFiniteValue(format!(
                    "log-likelihood diverged at iteration {}",
                    iterations_run
                )));
            }
            if (current - previous).abs() < self.tolerance {
                previous = current;
                converged = true;
                break;
            }
            previous = current;
        }

        if components
            .iter()
            .any(|c| !(c.weight.is_finite() && c.mean.is_finite() && c.variance.is_finite()))
        {
            return Err(TierError::NonFiniteValue("component parameters".to_string()));
        }

        tracing::debug!(
            k = self.k,
            samples = samples.len(),
            iterations = iterations_run,
            converged,
            log_likelihood = previous,
            "GMM fit complete"
        );

        self.components = components;
        self.iterations_run = iterations_run;
        self.converged = converged;
        self.log_likelihood = previous;
        Ok(())
    }

    /// Hard-assign each sample to a component label in `0..k`
    ///
    /// Labels are ordered by ascending component mean, so label 0 is the
    /// component covering the lowest ranks.
    pub fn predict(&self, samples: &[f64]) -> TierResult<Vec<usize>> {
        if self.components.is_empty() {
            return Err(TierError::NotFitted);
        }

        let mut by_mean: Vec<usize> = (0..self.components.len()).collect();
        by_mean.sort_by(|&a, &b| {
            self.components[a]
                .mean
                .total_cmp(&self.components[b].mean)
        });
        let mut relabel = vec![0; self.components.len()];
        for (label, &component) in by_mean.iter().enumerate() {
            relabel[component] = label;
        }

        Ok(samples
            .iter()
            .map(|&x| relabel[self.most_responsible(x)])
            .collect())
    }

    /// Index of the component with the highest responsibility for `x`
    ///
    /// Compared in log space so far-away samples do not underflow to a tie.
    fn most_responsible(&self, x: f64) -> usize {
        let mut best = 0;
        let mut best_score = f64::NEG_INFINITY;
        for (j, component) in self.components.iter().enumerate() {
            let score = component.log_weighted_density(x);
            if score > best_score {
                best = j;
                best_score = score;
            }
        }
        if best_score == f64::NEG_INFINITY {
            // Every weight collapsed to zero: nearest mean wins
            return self
                .components
                .iter()
                .enumerate()
                .min_by(|(_, a), (_, b)| (x - a.mean).abs().total_cmp(&(x - b.mean).abs()))
                .map(|(j, _)| j)
                .unwrap_or(0);
        }
        best
    }
}

fn initial_components(k: usize, min: f64, range: f64) -> Vec<GaussianComponent> {
    let variance = (range / (2.0 * k as f64)).powi(2).max(MIN_VARIANCE);
    let step = if k > 1 { range / (k - 1) as f64 } else { 0.0 };
    (0..k)
        .map(|j| GaussianComponent {
            weight: 1.0 / k as f64,
            mean: if k > 1 { min + step * j as f64 } else { min + range / 2.0 },
            variance,
        })
        .collect()
}

/// E-step: `responsibilities[i][j]` = P(component j | sample i)
fn expectation(components: &[GaussianComponent], samples: &[f64]) -> Vec<Vec<f64>> {
    let k = components.len();
    samples
        .iter()
        .map(|&x| {
            let mut row: Vec<f64> = components
                .iter()
                .map(|c| c.weight * c.density(x))
                .collect();
            let total: f64 = row.iter().sum();
            if total > 0.0 && total.is_finite() {
                for r in row.iter_mut() {
                    *r /= total;
                }
            } else {
                // All densities underflowed: no component is preferred
                row.iter_mut().for_each(|r| *r = 1.0 / k as f64);
            }
            row
        })
        .collect()
}

/// M-step: re-estimate every component from the responsibilities
fn maximization(
    previous: &[GaussianComponent],
    responsibilities: &[Vec<f64>],
    samples: &[f64],
) -> Vec<GaussianComponent> {
    let n = samples.len() as f64;
    previous
        .iter()
        .enumerate()
        .map(|(j, old)| {
            let resp_sum: f64 = responsibilities.iter().map(|row| row[j]).sum();
            if resp_sum <= MIN_PROBABILITY {
                // Component owns no samples; keep its position, drop its weight
                return GaussianComponent {
                    weight: 0.0,
                    ..*old
                };
            }

            let mean = responsibilities
                .iter()
                .zip(samples)
                .map(|(row, &x)| row[j] * x)
                .sum::<f64>()
                / resp_sum;
            let variance = responsibilities
                .iter()
                .zip(samples)
                .map(|(row, &x)| row[j] * (x - mean).powi(2))
                .sum::<f64>()
                / resp_sum;

            GaussianComponent {
                weight: resp_sum / n,
                mean,
                variance: variance.max(MIN_VARIANCE),
            }
        })
        .collect()
}

/// Log-likelihood of the samples under the mixture
fn log_likelihood(components: &[GaussianComponent], samples: &[f64]) -> f64 {
    samples
        .iter()
        .map(|&x| {
            let p: f64 = components.iter().map(|c| c.weight * c.density(x)).sum();
            p.max(MIN_PROBABILITY).ln()
        })
        .sum()
}
