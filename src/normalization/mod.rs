//! Vector normalization strategies applied to the numeric values of a row.
//!
//! A strategy reduces a value vector to a single scaling coefficient and
//! divides every component by it. Coefficients too close to zero are
//! substituted with `1` so degenerate rows pass through unchanged.

/// Coefficients below this magnitude are treated as zero.
const COEFFICIENT_EPSILON: f64 = 1e-7;

const ELASTIC_L1_WEIGHT: f64 = 0.15;
const ELASTIC_L2_WEIGHT: f64 = 0.85;

/// Results keep at most ten fractional digits.
const ROUNDING_SCALE: f64 = 1e10;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Normalization {
    /// Leave values untouched.
    None,
    /// Divide by the sum of absolute values.
    L1,
    /// Divide by the Euclidean norm.
    L2,
    /// Weighted blend of the L1 and L2 coefficients.
    Elastic,
}

impl Normalization {
    /// Scaling coefficient for the given value vector.
    pub fn coefficient(&self, values: &[f64]) -> f64 {
        match self {
            Normalization::None => 1.0,
            Normalization::L1 => l1_norm(values),
            Normalization::L2 => l2_norm(values),
            Normalization::Elastic => {
                ELASTIC_L1_WEIGHT * l1_norm(values) + ELASTIC_L2_WEIGHT * l2_norm(values)
            }
        }
    }

    /// Scale the vector by its coefficient, rounding each component to ten
    /// fractional digits.
    pub fn apply(&self, values: &[f64]) -> Vec<f64> {
        let mut coefficient = self.coefficient(values);
        if coefficient.abs() < COEFFICIENT_EPSILON {
            coefficient = 1.0;
        }
        values.iter().map(|v| round(v / coefficient)).collect()
    }
}

fn l1_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v.abs()).sum()
}

fn l2_norm(values: &[f64]) -> f64 {
    values.iter().map(|v| v * v).sum::<f64>().sqrt()
}

fn round(value: f64) -> f64 {
    (value * ROUNDING_SCALE).round() / ROUNDING_SCALE
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_none_passes_through() {
        assert_eq!(Normalization::None.apply(&[2.0, 4.0]), vec![2.0, 4.0]);
    }

    #[test]
    fn test_l1() {
        assert_eq!(
            Normalization::L1.apply(&[2.0, 4.0]),
            vec![0.3333333333, 0.6666666667]
        );
    }

    #[test]
    fn test_l2() {
        assert_eq!(
            Normalization::L2.apply(&[2.0, 4.0]),
            vec![0.4472135955, 0.894427191]
        );
    }

    #[test]
    fn test_elastic() {
        let coefficient = Normalization::Elastic.coefficient(&[2.0, 4.0]);
        let expected = 0.15 * 6.0 + 0.85 * 20.0f64.sqrt();
        assert!((coefficient - expected).abs() < 1e-12);
    }

    #[test]
    fn test_zero_vector_unchanged() {
        assert_eq!(Normalization::L2.apply(&[0.0, 0.0]), vec![0.0, 0.0]);
    }
}
