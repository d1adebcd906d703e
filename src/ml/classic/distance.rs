//! Distance functions used to rank training samples for k-NN classification.
//!
//! Every metric works row by row: given two equally shaped batches of feature
//! vectors it yields one scalar per row pair. The predictor only ever needs the
//! ordering of distances, so the Euclidean metric skips the square root.
//!
//! Distances are accumulated in the element type of the matrix. For integer
//! types the arithmetic is checked and a distance that does not fit yields
//! `None` instead of wrapping.

use std::fmt;
use std::fmt::Debug;
use std::str::FromStr;

use ndarray::{Array1, ArrayView1, ArrayView2};
use num_traits::{Num, ToPrimitive};

use crate::error::{Error, Result};

/// Numeric element type of a sample matrix.
///
/// Implemented for the primitive integer and floating-point types; the label
/// column is read back through [`ToPrimitive::to_i64`].
pub trait Scalar: Num + Copy + PartialOrd + ToPrimitive + Debug + Send + Sync {
    /// `self + rhs`, or `None` if the sum is not representable.
    fn checked_plus(self, rhs: Self) -> Option<Self>;

    /// `self - rhs`, or `None` if the difference is not representable.
    fn checked_minus(self, rhs: Self) -> Option<Self>;

    /// `self * rhs`, or `None` if the product is not representable.
    fn checked_times(self, rhs: Self) -> Option<Self>;
}

macro_rules! integer_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            fn checked_plus(self, rhs: Self) -> Option<Self> {
                self.checked_add(rhs)
            }

            fn checked_minus(self, rhs: Self) -> Option<Self> {
                self.checked_sub(rhs)
            }

            fn checked_times(self, rhs: Self) -> Option<Self> {
                self.checked_mul(rhs)
            }
        }
    )*};
}

// Floats saturate to infinity, which still ranks after every finite distance.
macro_rules! float_scalar {
    ($($t:ty),*) => {$(
        impl Scalar for $t {
            fn checked_plus(self, rhs: Self) -> Option<Self> {
                Some(self + rhs)
            }

            fn checked_minus(self, rhs: Self) -> Option<Self> {
                Some(self - rhs)
            }

            fn checked_times(self, rhs: Self) -> Option<Self> {
                Some(self * rhs)
            }
        }
    )*};
}

integer_scalar!(i8, i16, i32, i64, i128, isize, u8, u16, u32, u64, u128, usize);
float_scalar!(f32, f64);

/// A trait for distance functions between feature vectors.
pub trait Distance<T: Scalar> {
    /// Compute the distance between two feature vectors of equal length.
    ///
    /// Returns `None` if the distance is not representable in `T`.
    fn between(&self, left: ArrayView1<'_, T>, right: ArrayView1<'_, T>) -> Option<T>;

    /// Compute one distance per row pair of two equally shaped batches.
    ///
    /// # Errors
    ///
    /// - [`Error::BatchShapeMismatch`] if the batches differ in row or column count.
    /// - [`Error::DistanceOverflow`] for the first row pair whose distance does not fit in `T`.
    fn batch(&self, left: ArrayView2<'_, T>, right: ArrayView2<'_, T>) -> Result<Array1<T>> {
        if left.dim() != right.dim() {
            return Err(Error::BatchShapeMismatch {
                left: left.dim(),
                right: right.dim(),
            });
        }
        let distances = left
            .outer_iter()
            .zip(right.outer_iter())
            .enumerate()
            .map(|(row, (l, r))| self.between(l, r).ok_or(Error::DistanceOverflow { row }))
            .collect::<Result<Vec<T>>>()?;
        Ok(Array1::from_vec(distances))
    }
}

/// Squared Euclidean distance: sum over features of (left - right)^2.
#[derive(Debug, Clone, Copy, Default)]
pub struct SquaredEuclidean;

impl<T: Scalar> Distance<T> for SquaredEuclidean {
    fn between(&self, left: ArrayView1<'_, T>, right: ArrayView1<'_, T>) -> Option<T> {
        left.iter().zip(right.iter()).try_fold(T::zero(), |acc, (&x, &y)| {
            let d = abs_diff(x, y)?;
            acc.checked_plus(d.checked_times(d)?)
        })
    }
}

/// Manhattan distance: sum over features of |left - right|.
#[derive(Debug, Clone, Copy, Default)]
pub struct Manhattan;

impl<T: Scalar> Distance<T> for Manhattan {
    fn between(&self, left: ArrayView1<'_, T>, right: ArrayView1<'_, T>) -> Option<T> {
        left.iter()
            .zip(right.iter())
            .try_fold(T::zero(), |acc, (&x, &y)| acc.checked_plus(abs_diff(x, y)?))
    }
}

/// Any function of two feature vectors can serve as a metric.
impl<T, F> Distance<T> for F
where
    T: Scalar,
    F: Fn(ArrayView1<'_, T>, ArrayView1<'_, T>) -> T,
{
    fn between(&self, left: ArrayView1<'_, T>, right: ArrayView1<'_, T>) -> Option<T> {
        Some(self(left, right))
    }
}

/// Runtime selection between the built-in metrics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DistanceMetric {
    #[default]
    SquaredEuclidean,
    Manhattan,
}

impl<T: Scalar> Distance<T> for DistanceMetric {
    fn between(&self, left: ArrayView1<'_, T>, right: ArrayView1<'_, T>) -> Option<T> {
        match self {
            DistanceMetric::SquaredEuclidean => SquaredEuclidean.between(left, right),
            DistanceMetric::Manhattan => Manhattan.between(left, right),
        }
    }
}

impl fmt::Display for DistanceMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DistanceMetric::SquaredEuclidean => write!(f, "squared-euclidean"),
            DistanceMetric::Manhattan => write!(f, "manhattan"),
        }
    }
}

impl FromStr for DistanceMetric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "squared-euclidean" | "euclidean" | "l2" => Ok(DistanceMetric::SquaredEuclidean),
            "manhattan" | "l1" => Ok(DistanceMetric::Manhattan),
            other => Err(Error::UnknownMetric(other.to_string())),
        }
    }
}

/// |a - b|, taken as larger minus smaller so unsigned scalars never underflow.
fn abs_diff<T: Scalar>(a: T, b: T) -> Option<T> {
    if a >= b {
        a.checked_minus(b)
    } else {
        b.checked_minus(a)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{array, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    fn random_rows(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
        Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-50.0..50.0))
    }

    fn chebyshev(left: ArrayView1<'_, f64>, right: ArrayView1<'_, f64>) -> f64 {
        left.iter()
            .zip(right.iter())
            .map(|(a, b)| (a - b).abs())
            .fold(0.0, f64::max)
    }

    #[test]
    fn test_squared_euclidean_values() {
        let left = array![[0.0, 0.0], [1.0, 2.0]];
        let right = array![[3.0, 4.0], [1.0, 2.0]];
        let d = SquaredEuclidean.batch(left.view(), right.view()).unwrap();
        assert_relative_eq!(d[0], 25.0);
        assert_relative_eq!(d[1], 0.0);
    }

    #[test]
    fn test_manhattan_values() {
        let left = array![[0.0, 0.0], [1.0, 2.0]];
        let right = array![[3.0, -4.0], [1.0, 2.0]];
        let d = Manhattan.batch(left.view(), right.view()).unwrap();
        assert_relative_eq!(d[0], 7.0);
        assert_relative_eq!(d[1], 0.0);
    }

    #[test]
    fn test_unsigned_scalars_do_not_underflow() {
        let left = array![[1_u32, 10]];
        let right = array![[4_u32, 2]];
        assert_eq!(SquaredEuclidean.batch(left.view(), right.view()).unwrap()[0], 73);
        assert_eq!(Manhattan.batch(left.view(), right.view()).unwrap()[0], 11);
    }

    #[test]
    fn test_integer_overflow_is_reported() {
        let left = array![[0_i32, 0], [0, 0]];
        let right = array![[1_i32, 2], [100_000, 0]];
        let err = SquaredEuclidean.batch(left.view(), right.view()).unwrap_err();
        assert!(matches!(err, Error::DistanceOverflow { row: 1 }));

        // The difference itself does not fit in an i32.
        let left = array![[i32::MAX]];
        let right = array![[-1_i32]];
        assert!(matches!(
            Manhattan.batch(left.view(), right.view()),
            Err(Error::DistanceOverflow { row: 0 })
        ));

        let left = array![[u8::MAX, u8::MAX]];
        let right = array![[0_u8, 1]];
        assert_eq!(Manhattan.between(left.row(0), right.row(0)), None);
        assert_eq!(Manhattan.between(left.row(0), left.row(0)), Some(0));
    }

    #[test]
    fn test_large_integers_within_range() {
        let left = array![[0_i64, 0]];
        let right = array![[100_000_i64, -100_000]];
        assert_eq!(
            SquaredEuclidean.batch(left.view(), right.view()).unwrap()[0],
            20_000_000_000
        );
    }

    #[test]
    fn test_non_negative_and_zero_only_for_identical_rows() {
        let mut rng = StdRng::seed_from_u64(7);
        let left = random_rows(&mut rng, 64, 5);
        let right = random_rows(&mut rng, 64, 5);

        for metric in [DistanceMetric::SquaredEuclidean, DistanceMetric::Manhattan] {
            let d = metric.batch(left.view(), right.view()).unwrap();
            assert!(d.iter().all(|&v| v > 0.0), "{metric}: distinct rows must be > 0");

            let same = metric.batch(left.view(), left.view()).unwrap();
            assert!(same.iter().all(|&v| v == 0.0), "{metric}: identical rows must be 0");
        }
    }

    #[test]
    fn test_symmetric() {
        let mut rng = StdRng::seed_from_u64(11);
        let left = random_rows(&mut rng, 16, 3);
        let right = random_rows(&mut rng, 16, 3);
        for metric in [DistanceMetric::SquaredEuclidean, DistanceMetric::Manhattan] {
            let lr = metric.batch(left.view(), right.view()).unwrap();
            let rl = metric.batch(right.view(), left.view()).unwrap();
            for (a, b) in lr.iter().zip(rl.iter()) {
                assert_relative_eq!(*a, *b);
            }
        }
    }

    #[test]
    fn test_batch_shape_mismatch() {
        let left = Array2::<f64>::zeros((3, 2));
        let right = Array2::<f64>::zeros((2, 2));
        let err = Manhattan.batch(left.view(), right.view()).unwrap_err();
        assert!(matches!(
            err,
            Error::BatchShapeMismatch {
                left: (3, 2),
                right: (2, 2)
            }
        ));
    }

    #[test]
    fn test_function_as_metric() {
        let left = array![[0.0, 0.0]];
        let right = array![[3.0, -4.0]];
        let d = chebyshev.batch(left.view(), right.view()).unwrap();
        assert_relative_eq!(d[0], 4.0);
    }

    #[test]
    fn test_metric_names() {
        assert_eq!(
            "squared-euclidean".parse::<DistanceMetric>().unwrap(),
            DistanceMetric::SquaredEuclidean
        );
        assert_eq!("Manhattan".parse::<DistanceMetric>().unwrap(), DistanceMetric::Manhattan);
        assert!(matches!(
            "cosine".parse::<DistanceMetric>(),
            Err(Error::UnknownMetric(name)) if name == "cosine"
        ));
        assert_eq!(DistanceMetric::default().to_string(), "squared-euclidean");
    }
}
