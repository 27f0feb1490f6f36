//! CLI command implementations

pub(crate) mod check;
pub(crate) mod predict;
pub(crate) mod serve;
