//! The training-set data model (§3).

/// One labeled training example.
///
/// The label is canonical `+1`/`-1`; `class` stores the sign as a `bool`
/// (`true` => `+1`) to avoid float comparisons on the label itself, with
/// [`TrainingPair::y`] converting to the `±1.0` used in arithmetic.
#[derive(Debug, Clone)]
pub struct TrainingPair<T> {
    item: T,
    positive: bool,
}

impl<T> TrainingPair<T> {
    /// Build a training pair from an item and a `±1` label.
    ///
    /// Any non-negative label is treated as the positive class; this
    /// mirrors how the rest of the pack accepts `f64` labels (e.g.
    /// `smartcore::svm::svc::SVC::fit`'s `y: &[f64]`) while keeping the
    /// internal representation exact.
    pub fn new(item: T, label: f64) -> TrainingPair<T> {
        TrainingPair {
            item,
            positive: label > 0.0,
        }
    }

    /// The training item itself.
    pub fn item(&self) -> &T {
        &self.item
    }

    /// The canonical `±1.0` label.
    pub fn y(&self) -> f64 {
        if self.positive {
            1.0
        } else {
            -1.0
        }
    }

    /// `true` when this pair belongs to the positive class.
    pub fn is_positive(&self) -> bool {
        self.positive
    }
}
