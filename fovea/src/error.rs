use thiserror::Error;

/// Errors produced by the adaptive CSF engine and its stimulus modes.
#[derive(Error, Debug)]
pub enum QcsfError {
    /// A grid axis was empty at construction.
    #[error("empty grid: {0}")]
    EmptyGrid(&'static str),

    /// Parameter grid exceeds the supported size.
    #[error("parameter grid has {got} points, limit is {limit}")]
    GridTooLarge {
        /// Requested parameter point count.
        got: usize,
        /// Supported maximum.
        limit: usize,
    },

    /// Alternative count outside the supported AFC designs.
    #[error("unsupported alternative count {0} (expected 1, 4 or 10)")]
    UnsupportedNumAfc(u32),

    /// A probability-valued setting was outside its range.
    #[error("{name} = {value} outside [0, 1)")]
    InvalidProbability {
        /// Which setting.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// Robust likelihood mixing weight outside its supported range.
    #[error("robust likelihood mix {0} outside [0, 0.1]")]
    InvalidRobustMix(f64),

    /// Psychometric slope must be positive.
    #[error("psychometric slope must be positive, got {0}")]
    NonPositiveSlope(f64),

    /// A grid value that must be positive was not.
    #[error("{name} grid contains non-positive value {value}")]
    NonPositiveGridValue {
        /// Which grid axis.
        name: &'static str,
        /// Offending value.
        value: f64,
    },

    /// `update` called with a stimulus index outside the grid.
    #[error("stimulus index {index} out of range ({len} stimuli)")]
    StimulusIndex {
        /// Offending index.
        index: usize,
        /// Stimulus grid size.
        len: usize,
    },

    /// High-cutoff pruning removed every parameter point.
    #[error("parameter grid empty after high-cutoff prune")]
    PrunedToEmpty,

    /// `render` called on a template mode before `prepare`.
    #[error("stimulus mode used before prepare()")]
    ModeNotPrepared,

    /// Template synthesis failed inside a mode's `prepare`.
    #[error(transparent)]
    Filter(#[from] stimulus::bandpass::FilterError),
}
