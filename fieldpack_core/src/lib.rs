//! Field-oriented compression of fixed-layout binary records.
//!
//! A record is a run of fixed-width fields. Each field predicts its next
//! value from the ones it has seen and codes only the difference through a
//! shared entropy coder. Schemas are built either at compile time
//! ([`record`]) or at run time ([`dynamic`]); both produce the same stream.

pub mod diff;
pub mod dynamic;
pub mod entropy;
pub mod field;
pub mod packers;
pub mod record;

pub use diff::{DiffMethod, LinearDiff, StandardDiff};
pub use dynamic::{DecodeState, DynamicCompressor, DynamicDecompressor, FieldAdapter};
pub use entropy::{ArithmeticDecoder, ArithmeticEncoder, EntropyDecoder, EntropyEncoder};
pub use field::{Field, FieldCompressor, FieldDecompressor, FieldValue};
pub use packers::Packable;
pub use record::{End, StaticCompressor, StaticDecompressor};
