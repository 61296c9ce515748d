//! Records whose schema is assembled at run time.
//!
//! Fields are registered one by one and stored behind the object-safe
//! [`RawFieldCompressor`] / [`RawFieldDecompressor`] traits, so any mix of
//! value types can share one pipeline. Each field costs one virtual call per
//! record; the field logic itself is the same [`Field`] the static pipeline
//! uses.

use std::io::{self, Read, Write};

use log::{debug, trace};

use crate::entropy::{ArithmeticDecoder, ArithmeticEncoder, EntropyDecoder, EntropyEncoder};
use crate::field::{Field, FieldCompressor, FieldDecompressor, FieldValue};
use crate::record::ensure_record_len;

/// Object-safe compressing interface of a field bound to encoder type `E`.
pub trait RawFieldCompressor<E: EntropyEncoder> {
    fn size_of_field(&self) -> usize;

    fn compress_raw<'a>(&mut self, encoder: &mut E, buf: &'a [u8]) -> io::Result<&'a [u8]>;
}

/// Object-safe decompressing interface of a field bound to decoder type `D`.
pub trait RawFieldDecompressor<D: EntropyDecoder> {
    fn size_of_field(&self) -> usize;

    fn decompress_raw<'a>(&mut self, decoder: &mut D, buf: &'a mut [u8])
        -> io::Result<&'a mut [u8]>;
}

/// Erases the type of a concrete field.
///
/// The shared coder is not stored here; the owning pipeline lends it on
/// every call.
pub struct FieldAdapter<F> {
    field: F,
}

impl<F> FieldAdapter<F> {
    pub fn new(field: F) -> Self {
        Self { field }
    }

    pub fn into_inner(self) -> F {
        self.field
    }
}

impl<E: EntropyEncoder, F: FieldCompressor> RawFieldCompressor<E> for FieldAdapter<F> {
    fn size_of_field(&self) -> usize {
        self.field.size_of_field()
    }

    fn compress_raw<'a>(&mut self, encoder: &mut E, buf: &'a [u8]) -> io::Result<&'a [u8]> {
        self.field.compress_with(encoder, buf)
    }
}

impl<D: EntropyDecoder, F: FieldDecompressor> RawFieldDecompressor<D> for FieldAdapter<F> {
    fn size_of_field(&self) -> usize {
        self.field.size_of_field()
    }

    fn decompress_raw<'a>(
        &mut self,
        decoder: &mut D,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]> {
        self.field.decompress_with(decoder, buf)
    }
}

/// Compresses records through a runtime-built list of fields sharing one
/// encoder.
///
/// Register every field before the first record, in the order the fields
/// appear in the record buffer; the decompressor must register the same
/// list in the same order. Call [`done`](Self::done) after the last record.
pub struct DynamicCompressor<E: EntropyEncoder> {
    encoder: E,
    fields: Vec<Box<dyn RawFieldCompressor<E>>>,
    record_size: usize,
    records: u64,
}

impl<W: Write> DynamicCompressor<ArithmeticEncoder<W>> {
    pub fn new(stream: W) -> Self {
        Self::with_encoder(ArithmeticEncoder::new(stream))
    }

    pub fn into_stream(self) -> W {
        self.encoder.into_stream()
    }
}

impl<E: EntropyEncoder> DynamicCompressor<E> {
    pub fn with_encoder(encoder: E) -> Self {
        debug!("dynamic compressor created");
        Self {
            encoder,
            fields: Vec::new(),
            record_size: 0,
            records: 0,
        }
    }

    /// Appends a field of value type `T` with the default predictor.
    ///
    /// # Panics
    /// If a record has already been compressed.
    pub fn add_field<T: FieldValue + 'static>(&mut self) {
        self.add_field_instance(Field::<T>::new());
    }

    /// Appends a preconstructed field, e.g. one with a custom predictor.
    ///
    /// # Panics
    /// If a record has already been compressed.
    pub fn add_field_instance<F: FieldCompressor + 'static>(&mut self, field: F) {
        assert!(
            self.records == 0,
            "fields must be registered before the first record"
        );
        let size = field.size_of_field();
        self.record_size += size;
        self.fields.push(Box::new(FieldAdapter::new(field)));
        trace!(
            "registered compressor field #{} ({size} bytes)",
            self.fields.len()
        );
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    /// Number of records compressed so far.
    pub fn records(&self) -> u64 {
        self.records
    }

    /// Compresses one record from the front of `buf` and returns what is
    /// left of it.
    ///
    /// A buffer shorter than [`record_size`](Self::record_size) is rejected
    /// with [`io::ErrorKind::InvalidInput`] before any field runs.
    pub fn compress<'a>(&mut self, buf: &'a [u8]) -> io::Result<&'a [u8]> {
        ensure_record_len(buf.len(), self.record_size)?;
        let mut rest = buf;
        for field in &mut self.fields {
            rest = field.compress_raw(&mut self.encoder, rest)?;
        }
        self.records += 1;
        Ok(rest)
    }

    /// Flushes the shared encoder. Call once, after the last record.
    pub fn done(&mut self) -> io::Result<()> {
        debug!(
            "dynamic compressor done after {} records of {} bytes",
            self.records, self.record_size
        );
        self.encoder.done()
    }

    pub fn encoder(&self) -> &E {
        &self.encoder
    }

    pub fn into_encoder(self) -> E {
        self.encoder
    }
}

/// Progress of a decode session with respect to the decoder's init bytes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DecodeState {
    /// No record has been fully decoded yet.
    Fresh,
    /// The first record was decoded and the init bytes were consumed.
    InitConsumed,
}

/// Decompresses records through a runtime-built list of fields sharing one
/// decoder.
pub struct DynamicDecompressor<D: EntropyDecoder> {
    decoder: D,
    fields: Vec<Box<dyn RawFieldDecompressor<D>>>,
    record_size: usize,
    records: u64,
    state: DecodeState,
}

impl<R: Read> DynamicDecompressor<ArithmeticDecoder<R>> {
    pub fn new(stream: R) -> Self {
        Self::with_decoder(ArithmeticDecoder::new(stream))
    }

    pub fn into_stream(self) -> R {
        self.decoder.into_stream()
    }
}

impl<D: EntropyDecoder> DynamicDecompressor<D> {
    pub fn with_decoder(decoder: D) -> Self {
        debug!("dynamic decompressor created");
        Self {
            decoder,
            fields: Vec::new(),
            record_size: 0,
            records: 0,
            state: DecodeState::Fresh,
        }
    }

    /// Appends a field of value type `T` with the default predictor.
    ///
    /// # Panics
    /// If a record has already been decompressed.
    pub fn add_field<T: FieldValue + 'static>(&mut self) {
        self.add_field_instance(Field::<T>::new());
    }

    /// Appends a preconstructed field, e.g. one with a custom predictor.
    ///
    /// # Panics
    /// If a record has already been decompressed.
    pub fn add_field_instance<F: FieldDecompressor + 'static>(&mut self, field: F) {
        assert!(
            self.records == 0,
            "fields must be registered before the first record"
        );
        let size = field.size_of_field();
        self.record_size += size;
        self.fields.push(Box::new(FieldAdapter::new(field)));
        trace!(
            "registered decompressor field #{} ({size} bytes)",
            self.fields.len()
        );
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    pub fn record_size(&self) -> usize {
        self.record_size
    }

    pub fn records(&self) -> u64 {
        self.records
    }

    pub fn state(&self) -> DecodeState {
        self.state
    }

    /// Decodes one record into the front of `buf` and returns what is left
    /// of it.
    ///
    /// After the first record has been decoded completely the decoder's init
    /// bytes are read, exactly once per stream.
    pub fn decompress<'a>(&mut self, buf: &'a mut [u8]) -> io::Result<&'a mut [u8]> {
        ensure_record_len(buf.len(), self.record_size)?;
        let mut rest = buf;
        for field in &mut self.fields {
            rest = field.decompress_raw(&mut self.decoder, rest)?;
        }

        if self.state == DecodeState::Fresh {
            self.decoder.read_init_bytes()?;
            self.state = DecodeState::InitConsumed;
            debug!("dynamic decompressor consumed init bytes after the first record");
        }

        self.records += 1;
        Ok(rest)
    }

    pub fn decoder(&self) -> &D {
        &self.decoder
    }

    pub fn into_decoder(self) -> D {
        self.decoder
    }
}
