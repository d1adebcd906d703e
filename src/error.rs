use thiserror::Error;

/// Result type used throughout the crate.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by the classifier, the evaluator and the dataset loader.
#[derive(Debug, Error)]
pub enum Error {
    /// Training and test matrices disagree on the number of feature columns.
    #[error("feature dimension mismatch: training rows have {train} features, test rows have {test}")]
    ShapeMismatch { train: usize, test: usize },

    /// Two batches handed to a distance function do not have the same shape.
    #[error("batch shape mismatch: {left:?} vs {right:?}")]
    BatchShapeMismatch {
        left: (usize, usize),
        right: (usize, usize),
    },

    /// A matrix has no columns at all, so there is no label to read.
    #[error("matrix has no label column")]
    MissingLabelColumn,

    /// A distance metric name that is not recognized.
    #[error("unknown distance metric `{0}`, expected `squared-euclidean` or `manhattan`")]
    UnknownMetric(String),

    /// A requested `k` is zero or larger than the training set.
    #[error("k = {k} is out of range for a training set of {n_train} samples")]
    InvalidK { k: usize, n_train: usize },

    /// The training set has no rows.
    #[error("training set is empty")]
    EmptyTrainingSet,

    /// A distance does not fit in the element type of the matrices.
    ///
    /// `row` is the training row for a prediction, or the row pair for a batch.
    #[error("distance to row {row} overflows the element type")]
    DistanceOverflow { row: usize },

    /// The label column holds a value that is not representable as an integer.
    #[error("label in row {row} is not an integer")]
    InvalidLabel { row: usize },

    /// Predicted and ground-truth label sequences differ in length.
    #[error("cannot compare {predicted} predictions against {truth} labels")]
    LengthMismatch { predicted: usize, truth: usize },

    /// A sample file could not be read.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A cell could not be parsed as a number.
    #[error("line {line}: {message}")]
    Parse { line: usize, message: String },

    /// A CSV line has a different number of cells than the first line.
    #[error("line {line} has {found} columns, expected {expected}")]
    RaggedRow {
        line: usize,
        expected: usize,
        found: usize,
    },

    /// The input has no non-blank lines.
    #[error("input contains no rows")]
    EmptyInput,

    /// Parsed cells could not be arranged into a matrix.
    #[error("matrix shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),
}

impl Error {
    /// Creates a parse error for the given 1-based line number.
    pub fn parse(line: usize, message: impl Into<String>) -> Self {
        Error::Parse {
            line,
            message: message.into(),
        }
    }
}
