//! Multi-template weight computation.
//!
//! When several templates supply a parameter for the same atom pair, their
//! values are blended with normalized weights. Flat weighting averages them;
//! reliability weighting trusts templates with small deviations more, so a
//! template whose distance closely matches the reference dominates one that
//! disagrees strongly.

use super::config::WeightingScheme;

/// Normalized weights for one atom pair, computed from the per-template
/// deviation magnitudes (`sigma` column values) of the tables that contain
/// the pair. The returned weights sum to 1.
pub fn pair_weights(scheme: WeightingScheme, deviations: &[f64]) -> Vec<f64> {
    if deviations.is_empty() {
        return Vec::new();
    }
    let raw: Vec<f64> = match scheme {
        WeightingScheme::Flat => vec![1.0; deviations.len()],
        WeightingScheme::Reliability { decay } => deviations
            .iter()
            .map(|d| (-d.abs() / decay).exp())
            .collect(),
    };
    let total: f64 = raw.iter().sum();
    raw.into_iter().map(|w| w / total).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_sums_to_one(weights: &[f64]) {
        let total: f64 = weights.iter().sum();
        assert!((total - 1.0).abs() < 1e-12, "weights sum to {total}");
    }

    #[test]
    fn flat_weights_are_uniform() {
        let w = pair_weights(WeightingScheme::Flat, &[0.1, 2.0, -0.4]);
        assert_sums_to_one(&w);
        for weight in &w {
            assert!((weight - 1.0 / 3.0).abs() < 1e-12);
        }
    }

    #[test]
    fn reliability_favors_small_deviations() {
        let w = pair_weights(WeightingScheme::Reliability { decay: 5.0 }, &[0.1, 2.0]);
        assert_sums_to_one(&w);
        assert!(w[0] > w[1]);
    }

    #[test]
    fn reliability_uses_deviation_magnitude() {
        let pos = pair_weights(WeightingScheme::Reliability { decay: 5.0 }, &[0.5, 1.5]);
        let neg = pair_weights(WeightingScheme::Reliability { decay: 5.0 }, &[-0.5, -1.5]);
        assert!((pos[0] - neg[0]).abs() < 1e-12);
        assert!((pos[1] - neg[1]).abs() < 1e-12);
    }

    #[test]
    fn single_template_gets_full_weight() {
        let w = pair_weights(WeightingScheme::Reliability { decay: 5.0 }, &[3.7]);
        assert_eq!(w.len(), 1);
        assert!((w[0] - 1.0).abs() < 1e-12);
    }

    #[test]
    fn empty_deviations_yield_no_weights() {
        assert!(pair_weights(WeightingScheme::Flat, &[]).is_empty());
    }
}
