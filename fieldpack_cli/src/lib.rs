//! Helpers shared by the `fieldpack` and `fieldpack-demo` binaries.

pub mod report;
pub mod streams;
