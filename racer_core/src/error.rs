// racer_core/src/error.rs

use thiserror::Error;

use crate::vehicle::parts::SourceTitle;

/// Why a car's part list could not be turned into a vehicle.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ClassifyError {
    #[error("no part naming convention is known for {0}")]
    UnsupportedTitle(SourceTitle),

    #[error("no rule set of {title} admits {part_count} parts")]
    NoRuleSet { title: SourceTitle, part_count: usize },

    #[error("{title} rules expect part #{index}, but only {part_count} parts were loaded")]
    PartIndexOutOfRange {
        title: SourceTitle,
        index: usize,
        part_count: usize,
    },

    #[error("{title} car is missing: {missing}")]
    IncompleteSkeleton { title: SourceTitle, missing: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TrackError {
    #[error("track has no blocks")]
    NoBlocks,

    #[error("track has no virtual road segments")]
    NoVroad,

    #[error("block {block} references vroad {first}..{end}, but the track has {count} segments")]
    BlockVroadOutOfRange {
        block: usize,
        first: usize,
        end: usize,
        count: usize,
    },

    #[error("vroad index {index} out of range ({count} segments)")]
    VroadIndexOutOfRange { index: usize, count: usize },

    #[error("block index {index} out of range ({count} blocks)")]
    BlockIndexOutOfRange { index: usize, count: usize },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ControllerError {
    #[error("network expects {expected} inputs, got {actual}")]
    InputSize { expected: usize, actual: usize },

    #[error("network weight matrix is {rows}x{cols}, expected {expected_rows}x{expected_cols}")]
    WeightShape {
        rows: usize,
        cols: usize,
        expected_rows: usize,
        expected_cols: usize,
    },

    #[error("invalid weight initialization: {0}")]
    Initialization(String),
}
