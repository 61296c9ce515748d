//! Runtime schemas: a record layout described as a list of [`FieldKind`]s,
//! parsed from text and turned into dynamic pipelines.

use std::fmt;
use std::io::{Read, Write};
use std::str::FromStr;

use fieldpack_core::{
    ArithmeticDecoder, ArithmeticEncoder, DynamicCompressor, DynamicDecompressor,
    EntropyDecoder, EntropyEncoder, Packable,
};

use crate::point::Point3;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldKind {
    U8,
    I8,
    U16,
    I16,
    U32,
    I32,
    F64,
    Point3,
}

impl FieldKind {
    pub const ALL: [FieldKind; 8] = [
        FieldKind::U8,
        FieldKind::I8,
        FieldKind::U16,
        FieldKind::I16,
        FieldKind::U32,
        FieldKind::I32,
        FieldKind::F64,
        FieldKind::Point3,
    ];

    /// Packed width in bytes.
    pub fn size(self) -> usize {
        match self {
            FieldKind::U8 => u8::SIZE,
            FieldKind::I8 => i8::SIZE,
            FieldKind::U16 => u16::SIZE,
            FieldKind::I16 => i16::SIZE,
            FieldKind::U32 => u32::SIZE,
            FieldKind::I32 => i32::SIZE,
            FieldKind::F64 => f64::SIZE,
            FieldKind::Point3 => Point3::SIZE,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            FieldKind::U8 => "u8",
            FieldKind::I8 => "i8",
            FieldKind::U16 => "u16",
            FieldKind::I16 => "i16",
            FieldKind::U32 => "u32",
            FieldKind::I32 => "i32",
            FieldKind::F64 => "f64",
            FieldKind::Point3 => "point3",
        }
    }

    /// Appends a default field of this kind to a dynamic compressor.
    pub fn add_to_compressor<E: EntropyEncoder>(self, compressor: &mut DynamicCompressor<E>) {
        match self {
            FieldKind::U8 => compressor.add_field::<u8>(),
            FieldKind::I8 => compressor.add_field::<i8>(),
            FieldKind::U16 => compressor.add_field::<u16>(),
            FieldKind::I16 => compressor.add_field::<i16>(),
            FieldKind::U32 => compressor.add_field::<u32>(),
            FieldKind::I32 => compressor.add_field::<i32>(),
            FieldKind::F64 => compressor.add_field::<f64>(),
            FieldKind::Point3 => compressor.add_field::<Point3>(),
        }
    }

    /// Appends a default field of this kind to a dynamic decompressor.
    pub fn add_to_decompressor<D: EntropyDecoder>(
        self,
        decompressor: &mut DynamicDecompressor<D>,
    ) {
        match self {
            FieldKind::U8 => decompressor.add_field::<u8>(),
            FieldKind::I8 => decompressor.add_field::<i8>(),
            FieldKind::U16 => decompressor.add_field::<u16>(),
            FieldKind::I16 => decompressor.add_field::<i16>(),
            FieldKind::U32 => decompressor.add_field::<u32>(),
            FieldKind::I32 => decompressor.add_field::<i32>(),
            FieldKind::F64 => decompressor.add_field::<f64>(),
            FieldKind::Point3 => decompressor.add_field::<Point3>(),
        }
    }
}

impl fmt::Display for FieldKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for FieldKind {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        let lower = s.trim().to_ascii_lowercase();
        FieldKind::ALL
            .iter()
            .copied()
            .find(|kind| kind.name() == lower)
            .ok_or_else(|| {
                anyhow::anyhow!(
                    "unknown field type '{}'. Valid options: u8, i8, u16, i16, u32, i32, f64, point3",
                    s.trim()
                )
            })
    }
}

/// Parses a comma-separated schema such as `"point3,i32,i32,i16"`.
pub fn parse_schema(text: &str) -> anyhow::Result<Vec<FieldKind>> {
    if text.trim().is_empty() {
        anyhow::bail!("schema is empty");
    }
    text.split(',')
        .enumerate()
        .map(|(i, part)| {
            part.parse()
                .map_err(|e: anyhow::Error| e.context(format!("schema field #{}", i + 1)))
        })
        .collect()
}

pub fn record_size(schema: &[FieldKind]) -> usize {
    schema.iter().map(|kind| kind.size()).sum()
}

/// Builds a dynamic compressor for `schema` writing to `stream`.
pub fn compressor_for<W: Write>(
    stream: W,
    schema: &[FieldKind],
) -> DynamicCompressor<ArithmeticEncoder<W>> {
    let mut compressor = DynamicCompressor::new(stream);
    for kind in schema {
        kind.add_to_compressor(&mut compressor);
    }
    compressor
}

/// Builds a dynamic decompressor for `schema` reading from `stream`.
pub fn decompressor_for<R: Read>(
    stream: R,
    schema: &[FieldKind],
) -> DynamicDecompressor<ArithmeticDecoder<R>> {
    let mut decompressor = DynamicDecompressor::new(stream);
    for kind in schema {
        kind.add_to_decompressor(&mut decompressor);
    }
    decompressor
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_schema() {
        let schema = parse_schema("point3, i32,I32 ,i16").unwrap();
        assert_eq!(
            schema,
            vec![FieldKind::Point3, FieldKind::I32, FieldKind::I32, FieldKind::I16]
        );
        assert_eq!(record_size(&schema), 34);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_schema("").is_err());
        assert!(parse_schema("i32,,u8").is_err());

        let err = parse_schema("u8,float").unwrap_err();
        let msg = format!("{err:#}");
        assert!(msg.contains("schema field #2"), "{msg}");
        assert!(msg.contains("float"), "{msg}");
    }

    #[test]
    fn test_names_roundtrip_through_from_str() {
        for kind in FieldKind::ALL {
            assert_eq!(kind.name().parse::<FieldKind>().unwrap(), kind);
            assert_eq!(kind.to_string(), kind.name());
        }
    }

    #[test]
    fn test_built_pipelines_match_schema() {
        let schema = parse_schema("u8,f64,point3").unwrap();
        let compressor = compressor_for(Vec::new(), &schema);
        assert_eq!(compressor.field_count(), 3);
        assert_eq!(compressor.record_size(), 33);

        let decompressor = decompressor_for(&[0u8; 0][..], &schema);
        assert_eq!(decompressor.record_size(), record_size(&schema));
    }
}
