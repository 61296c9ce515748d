//! Records whose schema is fixed at compile time.
//!
//! A schema is a nested [`Chain`] of fields ending in [`End`], usually
//! written with [`field_chain!`](crate::field_chain). Every call is resolved
//! statically, so a record costs no dynamic dispatch.
//!
//! ```
//! use fieldpack_core::field::Field;
//! use fieldpack_core::field_chain;
//! use fieldpack_core::record::{StaticCompressor, StaticDecompressor};
//!
//! type Schema = field_chain![Field<i32>, Field<i16>];
//!
//! let mut compressor = StaticCompressor::<_, Schema>::new(Vec::new());
//! for i in 0..10i32 {
//!     let mut record = [0u8; 6];
//!     record[..4].copy_from_slice(&(i * 100).to_le_bytes());
//!     record[4..].copy_from_slice(&(-(i as i16)).to_le_bytes());
//!     compressor.compress(&record).unwrap();
//! }
//! compressor.done().unwrap();
//! let data = compressor.into_stream();
//!
//! let mut decompressor = StaticDecompressor::<_, Schema>::new(data.as_slice());
//! let mut record = [0u8; 6];
//! for i in 0..10i32 {
//!     decompressor.decompress(&mut record).unwrap();
//!     assert_eq!(&record[..4], &(i * 100).to_le_bytes());
//! }
//! ```

use std::io::{self, Read, Write};

use log::debug;

use crate::entropy::{ArithmeticDecoder, ArithmeticEncoder, EntropyDecoder, EntropyEncoder};
use crate::field::{FieldCompressor, FieldDecompressor};

/// Compresses a whole record, field by field, in schema order.
pub trait RecordCompressor {
    fn record_size(&self) -> usize;

    fn compress_with<'a, E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        buf: &'a [u8],
    ) -> io::Result<&'a [u8]>;
}

/// Decompresses a whole record, field by field, in schema order.
pub trait RecordDecompressor {
    fn record_size(&self) -> usize;

    fn decompress_with<'a, D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]>;
}

/// Terminator of a field chain.
///
/// On the decompressing side it also loads the decoder's init bytes, once,
/// right after every field of the first record has read its raw value.
#[derive(Debug)]
pub struct End {
    first_decompress: bool,
}

impl Default for End {
    fn default() -> Self {
        Self {
            first_decompress: true,
        }
    }
}

impl RecordCompressor for End {
    fn record_size(&self) -> usize {
        0
    }

    fn compress_with<'a, E: EntropyEncoder>(
        &mut self,
        _encoder: &mut E,
        buf: &'a [u8],
    ) -> io::Result<&'a [u8]> {
        Ok(buf)
    }
}

impl RecordDecompressor for End {
    fn record_size(&self) -> usize {
        0
    }

    fn decompress_with<'a, D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]> {
        if self.first_decompress {
            decoder.read_init_bytes()?;
            self.first_decompress = false;
            debug!("static record decompressor consumed init bytes");
        }
        Ok(buf)
    }
}

/// One field followed by the rest of the chain.
#[derive(Debug, Default)]
pub struct Chain<F, N = End> {
    field: F,
    next: N,
}

impl<F, N> Chain<F, N> {
    pub fn new(field: F, next: N) -> Self {
        Self { field, next }
    }

    pub fn field(&self) -> &F {
        &self.field
    }

    pub fn next(&self) -> &N {
        &self.next
    }
}

impl<F: FieldCompressor, N: RecordCompressor> RecordCompressor for Chain<F, N> {
    fn record_size(&self) -> usize {
        self.field.size_of_field() + self.next.record_size()
    }

    #[inline]
    fn compress_with<'a, E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        buf: &'a [u8],
    ) -> io::Result<&'a [u8]> {
        let buf = self.field.compress_with(encoder, buf)?;
        self.next.compress_with(encoder, buf)
    }
}

impl<F: FieldDecompressor, N: RecordDecompressor> RecordDecompressor for Chain<F, N> {
    fn record_size(&self) -> usize {
        self.field.size_of_field() + self.next.record_size()
    }

    #[inline]
    fn decompress_with<'a, D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]> {
        let buf = self.field.decompress_with(decoder, buf)?;
        self.next.decompress_with(decoder, buf)
    }
}

/// Expands a list of field types into the matching [`Chain`] type.
///
/// `field_chain![A, B, C]` is `Chain<A, Chain<B, Chain<C, End>>>`.
#[macro_export]
macro_rules! field_chain {
    () => { $crate::record::End };
    ($head:ty $(,)?) => {
        $crate::record::Chain<$head, $crate::record::End>
    };
    ($head:ty, $($tail:ty),+ $(,)?) => {
        $crate::record::Chain<$head, $crate::field_chain!($($tail),+)>
    };
}

pub(crate) fn ensure_record_len(len: usize, record_size: usize) -> io::Result<()> {
    if len < record_size {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("record buffer holds {len} bytes but the schema needs {record_size}"),
        ));
    }
    Ok(())
}

/// A static schema bound to its own encoder.
pub struct StaticCompressor<E: EntropyEncoder, L: RecordCompressor> {
    encoder: E,
    fields: L,
}

impl<W: Write, L: RecordCompressor + Default> StaticCompressor<ArithmeticEncoder<W>, L> {
    pub fn new(stream: W) -> Self {
        Self::with_fields(ArithmeticEncoder::new(stream), L::default())
    }
}

impl<W: Write, L: RecordCompressor> StaticCompressor<ArithmeticEncoder<W>, L> {
    pub fn into_stream(self) -> W {
        self.encoder.into_stream()
    }
}

impl<E: EntropyEncoder, L: RecordCompressor> StaticCompressor<E, L> {
    pub fn with_fields(encoder: E, fields: L) -> Self {
        debug!(
            "static record compressor ready ({} bytes per record)",
            fields.record_size()
        );
        Self { encoder, fields }
    }

    pub fn record_size(&self) -> usize {
        self.fields.record_size()
    }

    /// Compresses one record from the front of `buf` and returns what is
    /// left of it.
    ///
    /// A buffer shorter than [`record_size`](Self::record_size) is rejected
    /// with [`io::ErrorKind::InvalidInput`] before any field runs.
    pub fn compress<'a>(&mut self, buf: &'a [u8]) -> io::Result<&'a [u8]> {
        ensure_record_len(buf.len(), self.fields.record_size())?;
        self.fields.compress_with(&mut self.encoder, buf)
    }

    /// Flushes the encoder. Call once, after the last record.
    pub fn done(&mut self) -> io::Result<()> {
        self.encoder.done()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn into_encoder(self) -> E {
        self.encoder
    }
}

/// A static schema bound to its own decoder.
pub struct StaticDecompressor<D: EntropyDecoder, L: RecordDecompressor> {
    decoder: D,
    fields: L,
}

impl<R: Read, L: RecordDecompressor + Default> StaticDecompressor<ArithmeticDecoder<R>, L> {
    pub fn new(stream: R) -> Self {
        Self::with_fields(ArithmeticDecoder::new(stream), L::default())
    }
}

impl<R: Read, L: RecordDecompressor> StaticDecompressor<ArithmeticDecoder<R>, L> {
    pub fn into_stream(self) -> R {
        self.decoder.into_stream()
    }
}

impl<D: EntropyDecoder, L: RecordDecompressor> StaticDecompressor<D, L> {
    pub fn with_fields(decoder: D, fields: L) -> Self {
        debug!(
            "static record decompressor ready ({} bytes per record)",
            fields.record_size()
        );
        Self { decoder, fields }
    }

    pub fn record_size(&self) -> usize {
        self.fields.record_size()
    }

    /// Decodes one record into the front of `buf` and returns what is left
    /// of it.
    pub fn decompress<'a>(&mut self, buf: &'a mut [u8]) -> io::Result<&'a mut [u8]> {
        ensure_record_len(buf.len(), self.fields.record_size())?;
        self.fields.decompress_with(&mut self.decoder, buf)
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn into_decoder(self) -> D {
        self.decoder
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diff::{DiffMethod, LinearDiff};
    use crate::field::Field;
    use crate::packers::Packable;

    type Schema = field_chain![Field<i32>, Field<u8>, Field<f64>, Field<i16>];

    fn record(i: i32) -> Vec<u8> {
        let mut buf = vec![0u8; 15];
        (i * 7 - 300).pack_into(&mut buf[0..4]);
        ((i % 256) as u8).pack_into(&mut buf[4..5]);
        (i as f64 * 0.25).pack_into(&mut buf[5..13]);
        ((i * 3) as i16).pack_into(&mut buf[13..15]);
        buf
    }

    #[test]
    fn test_empty_chain_returns_buffer() {
        let mut end = End::default();
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        let buf = [1u8, 2, 3];
        assert_eq!(end.compress_with(&mut encoder, &buf).unwrap(), &buf);
        assert_eq!(RecordCompressor::record_size(&end), 0);
    }

    #[test]
    fn test_record_size_sums_fields() {
        let schema = Schema::default();
        assert_eq!(RecordCompressor::record_size(&schema), 15);
        assert_eq!(RecordDecompressor::record_size(&schema), 15);
    }

    #[test]
    fn test_field_chain_accepts_trailing_comma() {
        type One = field_chain![Field<i32>,];
        type Four = field_chain![Field<i32>, Field<u8>, Field<f64>, Field<i16>,];

        assert_eq!(RecordCompressor::record_size(&One::default()), 4);
        assert_eq!(RecordCompressor::record_size(&Four::default()), 15);
    }

    #[test]
    fn test_hand_built_chain() {
        let chain = Chain::new(
            Field::<i32, LinearDiff<i32>>::default(),
            Chain::new(Field::<u8>::new(), End::default()),
        );
        let mut compressor =
            StaticCompressor::with_fields(ArithmeticEncoder::new(Vec::new()), chain);
        assert_eq!(compressor.record_size(), 5);

        let mut buf = [0u8; 5];
        for i in 0..20i32 {
            (i * 10).pack_into(&mut buf[..4]);
            (i as u8).pack_into(&mut buf[4..]);
            compressor.compress(&buf).unwrap();
        }
        compressor.done().unwrap();
        let data = compressor.into_stream();

        let chain = Chain::new(
            Field::<i32, LinearDiff<i32>>::default(),
            Chain::new(Field::<u8>::new(), End::default()),
        );
        let mut decompressor =
            StaticDecompressor::with_fields(ArithmeticDecoder::new(data.as_slice()), chain);
        for i in 0..20i32 {
            decompressor.decompress(&mut buf).unwrap();
            assert_eq!(i32::unpack_from(&buf[..4]), i * 10);
            assert_eq!(buf[4], i as u8);
        }
    }

    #[test]
    fn test_chain_accessors() {
        let mut compressor = StaticCompressor::<_, Schema>::new(Vec::new());
        compressor.compress(&record(3)).unwrap();
        let fields = &compressor.fields;
        assert!(fields.field().diff().have_value());
        assert!(fields.next().field().is_initialized());
        assert!(!Schema::default().field().is_initialized());
    }

    #[test]
    fn test_static_roundtrip() {
        let mut compressor = StaticCompressor::<_, Schema>::new(Vec::new());
        for i in 0..500 {
            let rec = record(i);
            let rest = compressor.compress(&rec).unwrap();
            assert!(rest.is_empty());
        }
        compressor.done().unwrap();
        let data = compressor.into_stream();
        assert!(data.len() < 500 * 15);

        let mut decompressor = StaticDecompressor::<_, Schema>::new(data.as_slice());
        let mut out = vec![0u8; 15];
        for i in 0..500 {
            decompressor.decompress(&mut out).unwrap();
            assert_eq!(out, record(i), "record {i}");
        }
    }

    #[test]
    fn test_custom_field_in_chain() {
        type Linear = field_chain![Field<i32, LinearDiff<i32>>, Field<u16>];

        let mut compressor = StaticCompressor::<_, Linear>::new(Vec::new());
        let mut buf = [0u8; 6];
        for i in 0..100i32 {
            (i * i).pack_into(&mut buf[..4]);
            (i as u16).pack_into(&mut buf[4..]);
            compressor.compress(&buf).unwrap();
        }
        compressor.done().unwrap();
        let data = compressor.into_stream();

        let mut decompressor = StaticDecompressor::<_, Linear>::new(data.as_slice());
        for i in 0..100i32 {
            decompressor.decompress(&mut buf).unwrap();
            assert_eq!(i32::unpack_from(&buf[..4]), i * i);
            assert_eq!(u16::unpack_from(&buf[4..]), i as u16);
        }
    }

    #[test]
    fn test_short_record_is_rejected() {
        let mut compressor = StaticCompressor::<_, Schema>::new(Vec::new());
        let err = compressor.compress(&[0u8; 14]).unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::InvalidInput);
        // nothing reached the stream
        assert!(compressor.into_stream().is_empty());
    }
}
