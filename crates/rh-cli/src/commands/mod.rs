//! CLI command implementations

pub(crate) mod common;
pub(crate) mod load;
pub(crate) mod plan;
pub(crate) mod progress;
pub(crate) mod status;
pub(crate) mod truncate;
