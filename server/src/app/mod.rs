//! Application assembly and lifecycle

pub mod options;
pub mod run;
