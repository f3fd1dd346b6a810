//! Value gap decomposition and task-value renormalization.

pub mod decomposer;

pub use decomposer::{
    attribute_gap, decompose_gap, raw_category_gaps, renormalize_task_values, CategoryGap,
    GapDecomposition, TaskValue,
};
