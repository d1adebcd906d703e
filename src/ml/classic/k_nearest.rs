//! Brute-force k-nearest-neighbors classification for several `k` in one pass.
//!
//! Sample matrices keep the label in column 0 and the features in the remaining
//! columns. For every test row the distances to all training rows are computed
//! once, ranked once, and then reused for every requested `k`: the neighbor set
//! for a smaller `k` is always a prefix of the one for a larger `k`.

use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};

use ndarray::{s, ArrayView1, ArrayView2};
#[cfg(feature = "parallel")]
use rayon::prelude::*;

use super::distance::{Distance, DistanceMetric, Scalar};
use crate::error::{Error, Result};

/// The `k` values evaluated when none are configured.
pub const DEFAULT_K_VALUES: [usize; 5] = [1, 3, 5, 10, 15];

/// Predicted labels keyed by `k`, one label per test row in test-row order.
pub type Predictions = BTreeMap<usize, Vec<i64>>;

/// Configuration options for a batch k-NN run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KnnConfig {
    /// Neighbor counts to evaluate. Duplicates collapse.
    pub k_values: BTreeSet<usize>,
    /// Metric used to rank training samples.
    pub metric: DistanceMetric,
}

impl KnnConfig {
    /// Create a config with `k` in {1, 3, 5, 10, 15} and squared Euclidean distance.
    pub fn new() -> Self {
        Self {
            k_values: DEFAULT_K_VALUES.into_iter().collect(),
            metric: DistanceMetric::default(),
        }
    }

    /// Replace the set of `k` values.
    pub fn with_k_values(mut self, k_values: impl IntoIterator<Item = usize>) -> Self {
        self.k_values = k_values.into_iter().collect();
        self
    }

    /// Customize the distance metric.
    pub fn with_metric(mut self, metric: DistanceMetric) -> Self {
        self.metric = metric;
        self
    }
}

impl Default for KnnConfig {
    fn default() -> Self {
        Self::new()
    }
}

/// A k-NN classifier over a borrowed training matrix.
///
/// # Type Parameters
/// - `T`: element type of the sample matrices.
/// - `D`: distance function used to rank training samples.
///
/// The training matrix is validated once on construction; labels are extracted
/// from column 0 and the remaining columns are kept as a view.
#[derive(Debug, Clone)]
pub struct KNNClassifier<'a, T: Scalar, D> {
    features: ArrayView2<'a, T>,
    labels: Vec<i64>,
    metric: D,
}

impl<'a, T: Scalar, D: Distance<T>> KNNClassifier<'a, T, D> {
    /// Constructs a classifier from a training matrix whose column 0 holds labels.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingLabelColumn`] if the matrix has no columns.
    /// - [`Error::EmptyTrainingSet`] if the matrix has no rows.
    /// - [`Error::InvalidLabel`] if a label is not representable as `i64`.
    pub fn new(model: ArrayView2<'a, T>, metric: D) -> Result<Self> {
        if model.ncols() == 0 {
            return Err(Error::MissingLabelColumn);
        }
        if model.nrows() == 0 {
            return Err(Error::EmptyTrainingSet);
        }
        let labels = labels(model.view())?;
        Ok(Self {
            features: model.slice_move(s![.., 1..]),
            labels,
            metric,
        })
    }

    /// Number of training samples.
    pub fn len(&self) -> usize {
        self.labels.len()
    }

    /// Always false: construction rejects empty training sets.
    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Number of feature columns, excluding the label.
    pub fn n_features(&self) -> usize {
        self.features.ncols()
    }

    /// Training labels in training-row order.
    pub fn labels(&self) -> &[i64] {
        &self.labels
    }

    /// Predict labels for every row of `test` and every `k` in `k_values`.
    ///
    /// Column 0 of `test` is ignored; it usually holds the ground truth.
    ///
    /// # Errors
    ///
    /// - [`Error::MissingLabelColumn`] if `test` has no columns.
    /// - [`Error::ShapeMismatch`] if the feature counts differ.
    /// - [`Error::InvalidK`] for the first `k` that is 0 or exceeds the training size.
    /// - [`Error::DistanceOverflow`] if an integer distance does not fit in `T`.
    ///
    /// # Example
    ///
    /// ```
    /// use knn_batch::ml::classic::{KNNClassifier, SquaredEuclidean};
    /// use ndarray::array;
    ///
    /// let model = array![[0.0, 0.0], [0.0, 1.0], [1.0, 10.0]];
    /// let test = array![[0.0, 0.5], [1.0, 9.0]];
    ///
    /// let knn = KNNClassifier::new(model.view(), SquaredEuclidean).unwrap();
    /// let predictions = knn.predict(test.view(), &[1, 3].into()).unwrap();
    ///
    /// assert_eq!(predictions[&1], vec![0, 1]);
    /// assert_eq!(predictions[&3], vec![0, 0]);
    /// ```
    pub fn predict(&self, test: ArrayView2<'_, T>, k_values: &BTreeSet<usize>) -> Result<Predictions>
    where
        D: Sync,
    {
        if test.ncols() == 0 {
            return Err(Error::MissingLabelColumn);
        }
        self.check_features(test.ncols() - 1)?;
        for &k in k_values {
            self.check_k(k)?;
        }

        let ks: Vec<usize> = k_values.iter().copied().collect();
        let queries = test.slice(s![.., 1..]);
        let max_k = ks.last().copied().unwrap_or(0);

        #[cfg(feature = "parallel")]
        let rows: Vec<Vec<i64>> = (0..queries.nrows())
            .into_par_iter()
            .map(|i| self.votes(&self.rank(queries.row(i), max_k)?, &ks))
            .collect::<Result<_>>()?;
        #[cfg(not(feature = "parallel"))]
        let rows: Vec<Vec<i64>> = queries
            .outer_iter()
            .map(|query| self.votes(&self.rank(query, max_k)?, &ks))
            .collect::<Result<_>>()?;

        let mut columns = vec![Vec::with_capacity(rows.len()); ks.len()];
        for row in rows {
            for (column, label) in columns.iter_mut().zip(row) {
                column.push(label);
            }
        }
        Ok(ks.into_iter().zip(columns).collect())
    }

    /// Predict the label of a single feature vector (no label column) with `k` neighbors.
    pub fn predict_one(&self, features: ArrayView1<'_, T>, k: usize) -> Result<i64> {
        let neighbors = self.nearest(features, k)?;
        majority_vote(neighbors.iter().map(|&i| self.labels[i])).ok_or(Error::EmptyTrainingSet)
    }

    /// Indices of the `k` training rows closest to `features`, nearest first.
    ///
    /// Equal distances keep training-row order.
    pub fn nearest(&self, features: ArrayView1<'_, T>, k: usize) -> Result<Vec<usize>> {
        self.check_features(features.len())?;
        self.check_k(k)?;
        self.rank(features, k)
    }

    fn check_features(&self, n: usize) -> Result<()> {
        if n != self.n_features() {
            return Err(Error::ShapeMismatch {
                train: self.n_features(),
                test: n,
            });
        }
        Ok(())
    }

    fn check_k(&self, k: usize) -> Result<()> {
        if k == 0 || k > self.len() {
            return Err(Error::InvalidK {
                k,
                n_train: self.len(),
            });
        }
        Ok(())
    }

    /// The `keep` nearest training indices for `query`, sorted by (distance, index).
    fn rank(&self, query: ArrayView1<'_, T>, keep: usize) -> Result<Vec<usize>> {
        let distances = self
            .features
            .outer_iter()
            .enumerate()
            .map(|(row, features)| {
                self.metric
                    .between(features, query)
                    .ok_or(Error::DistanceOverflow { row })
            })
            .collect::<Result<Vec<T>>>()?;

        // Ordering by index on equal distance makes the unstable select agree
        // with a stable sort of the full ranking.
        let by_distance =
            |a: &usize, b: &usize| ascending(&distances[*a], &distances[*b]).then(a.cmp(b));

        let mut order: Vec<usize> = (0..distances.len()).collect();
        if keep < order.len() {
            if keep > 0 {
                order.select_nth_unstable_by(keep - 1, by_distance);
            }
            order.truncate(keep);
        }
        order.sort_unstable_by(by_distance);
        Ok(order)
    }

    /// Majority label for each `k` in ascending `ks`, counting labels incrementally.
    fn votes(&self, ranking: &[usize], ks: &[usize]) -> Result<Vec<i64>> {
        let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
        let mut taken = 0;
        ks.iter()
            .map(|&k| {
                for &idx in &ranking[taken..k] {
                    *counts.entry(self.labels[idx]).or_insert(0) += 1;
                }
                taken = k;
                most_frequent(&counts).ok_or(Error::EmptyTrainingSet)
            })
            .collect()
    }
}

/// Runs batch k-NN with the metric and `k` values from `config`.
///
/// Both matrices carry the label in column 0. See [`KNNClassifier::predict`].
pub fn knn<T: Scalar>(
    model: ArrayView2<'_, T>,
    test: ArrayView2<'_, T>,
    config: &KnnConfig,
) -> Result<Predictions> {
    knn_with(model, test, config.metric, &config.k_values)
}

/// Runs batch k-NN with an arbitrary distance function.
pub fn knn_with<T, D>(
    model: ArrayView2<'_, T>,
    test: ArrayView2<'_, T>,
    metric: D,
    k_values: &BTreeSet<usize>,
) -> Result<Predictions>
where
    T: Scalar,
    D: Distance<T> + Sync,
{
    KNNClassifier::new(model, metric)?.predict(test, k_values)
}

/// The label occurring most often; the smallest label wins ties.
///
/// Returns `None` for an empty input.
pub fn majority_vote(labels: impl IntoIterator<Item = i64>) -> Option<i64> {
    let mut counts: BTreeMap<i64, usize> = BTreeMap::new();
    for label in labels {
        *counts.entry(label).or_insert(0) += 1;
    }
    most_frequent(&counts)
}

fn most_frequent(counts: &BTreeMap<i64, usize>) -> Option<i64> {
    counts
        .iter()
        .fold(None, |best: Option<(i64, usize)>, (&label, &count)| match best {
            Some((_, top)) if top >= count => best,
            _ => Some((label, count)),
        })
        .map(|(label, _)| label)
}

/// Reads column 0 of a sample matrix as integer labels.
///
/// # Errors
///
/// - [`Error::MissingLabelColumn`] if the matrix has no columns.
/// - [`Error::InvalidLabel`] if a value has no `i64` representation (NaN, out of range).
pub fn labels<T: Scalar>(samples: ArrayView2<'_, T>) -> Result<Vec<i64>> {
    if samples.ncols() == 0 {
        return Err(Error::MissingLabelColumn);
    }
    samples
        .column(0)
        .iter()
        .enumerate()
        .map(|(row, value)| value.to_i64().ok_or(Error::InvalidLabel { row }))
        .collect()
}

/// Number of positions at which `predicted` and `truth` differ.
///
/// # Errors
///
/// Returns [`Error::LengthMismatch`] if the sequences have different lengths.
pub fn evaluate(predicted: &[i64], truth: &[i64]) -> Result<usize> {
    if predicted.len() != truth.len() {
        return Err(Error::LengthMismatch {
            predicted: predicted.len(),
            truth: truth.len(),
        });
    }
    Ok(predicted
        .iter()
        .zip(truth.iter())
        .filter(|(p, t)| p != t)
        .count())
}

/// Misclassification count for every `k` in `predictions`.
pub fn evaluate_all(predictions: &Predictions, truth: &[i64]) -> Result<BTreeMap<usize, usize>> {
    predictions
        .iter()
        .map(|(&k, predicted)| evaluate(predicted, truth).map(|errors| (k, errors)))
        .collect()
}

/// Total order over partially ordered distances; incomparable values (NaN) sort last.
fn ascending<T: PartialOrd>(a: &T, b: &T) -> Ordering {
    match a.partial_cmp(b) {
        Some(order) => order,
        None => {
            let a_nan = a.partial_cmp(a).is_none();
            let b_nan = b.partial_cmp(b).is_none();
            a_nan.cmp(&b_nan)
        }
    }
}
