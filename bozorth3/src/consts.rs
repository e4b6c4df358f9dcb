//! Fixed algorithm constants.
//!
//! These values are part of the scoring contract: changing any of them
//! changes scores for otherwise identical inputs.

/// Longest edge (in pixels) the edge builder will emit.
pub const MAX_MINUTIA_DISTANCE: i32 = 125;

/// Length cutoff applied when truncating the sorted edge list. Note that
/// this is 75^2, not `MAX_MINUTIA_DISTANCE` squared; the builder and the
/// truncation pass deliberately use different cutoffs.
pub const MAX_MINUTIA_DISTANCE_SQUARED: i32 = 5625;

/// Truncation keeps at least this many edges even when they exceed
/// `MAX_MINUTIA_DISTANCE_SQUARED`.
pub const MIN_NUMBER_OF_EDGES: usize = 500;

/// Relative tolerance used when comparing squared lengths.
pub const FACTOR: f32 = 0.05;

pub const ANGLE_LOWER_BOUND: i32 = 11;
pub const ANGLE_UPPER_BOUND: i32 = 349;

/// A cluster with fewer pairs than this is discarded.
pub const MIN_NUMBER_OF_PAIRS_TO_CLUSTER: usize = 3;

/// Scores below this skip the clique search and are returned directly.
pub const SCORE_THRESHOLD: u32 = 8;

pub const MAX_NUMBER_OF_GROUPS: usize = 10;

/// Upper bound on minutiae that take part in matching.
pub const MAX_BOZORTH_MINUTIAE: usize = 200;

/// Upper bound on minutiae read from a single template file.
pub const MAX_FILE_MINUTIAE: usize = 1000;

pub const MAX_NUMBER_OF_PAIRS: usize = 20000;
pub const MAX_NUMBER_OF_EDGES: usize = 20000;
pub const MAX_NUMBER_OF_CLUSTERS: usize = 2000;
pub const MAX_NUMBER_OF_ENDPOINTS: usize = 20000;

/// Templates with fewer retained minutiae than this score 0 outright.
pub const MIN_COMPUTABLE_MINUTIAE: usize = 10;
