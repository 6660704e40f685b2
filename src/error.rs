//! The two error channels the specification distinguishes (§7, SPEC_FULL §9A):
//! a value taxonomy for query outcomes, and a conventional `Result`-based
//! channel for configuration/setup failures.

/// Why `find_shortest_path` found no path, reported as a plain value rather
/// than a `Result::Err` — a failed query is an ordinary outcome, not an
/// exceptional one.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum TraceError {
    #[error("none: a path was found")]
    None,
    #[error("the first point could not be located in the graph")]
    PointOne,
    #[error("the second point could not be located in the graph")]
    PointTwo,
    #[error("both points were located but no route connects them")]
    NoPath,
    #[error("graph construction aborted: too many features")]
    TooManyFeatures,
}

/// Configuration/setup failures: these are genuinely exceptional and use
/// the conventional `Result<T, TracerError>` idiom.
#[derive(Debug, thiserror::Error)]
pub enum TracerError {
    #[error("feature source failed to iterate: {0}")]
    FeatureSource(String),
    #[error("geometry engine rejected input: {0}")]
    Geometry(#[from] anyhow::Error),
}
