pub mod point;
pub mod schema;

pub use point::Point3;
pub use schema::{compressor_for, decompressor_for, parse_schema, record_size, FieldKind};
