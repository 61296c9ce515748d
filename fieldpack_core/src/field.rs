use std::io;

use crate::diff::{DiffMethod, StandardDiff};
use crate::entropy::{
    EntropyDecoder, EntropyEncoder, IntegerCompressor, IntegerCompressorBuilder,
    IntegerDecompressor,
};
use crate::packers::Packable;

/// A value type that can be carried by a [`Field`].
///
/// The integer model codes at most 32 bits at a time, so every value is
/// viewed as `LANES` integer lanes of `LANE_BITS` bits each. Each lane gets
/// its own model and is predicted independently. Lanes narrower than 32
/// bits are compared modulo `2^LANE_BITS`, so `set_lane` must truncate.
pub trait FieldValue: Packable + Copy + Default {
    const LANES: usize;
    const LANE_BITS: u32;

    fn lane(&self, index: usize) -> i32;

    fn set_lane(&mut self, index: usize, value: i32);
}

macro_rules! integer_field_value {
    ($($t:ty),*) => {
        $(
            impl FieldValue for $t {
                const LANES: usize = 1;
                const LANE_BITS: u32 = (std::mem::size_of::<$t>() * 8) as u32;

                #[inline]
                fn lane(&self, _index: usize) -> i32 {
                    *self as i32
                }

                #[inline]
                fn set_lane(&mut self, _index: usize, value: i32) {
                    *self = value as $t;
                }
            }
        )*
    };
}

integer_field_value!(u8, i8, u16, i16, u32, i32);

/// Lane 0 is the low half of the bit pattern, lane 1 the high half.
impl FieldValue for f64 {
    const LANES: usize = 2;
    const LANE_BITS: u32 = 32;

    #[inline]
    fn lane(&self, index: usize) -> i32 {
        (self.to_bits() >> (32 * index)) as u32 as i32
    }

    #[inline]
    fn set_lane(&mut self, index: usize, value: i32) {
        let shift = 32 * index;
        let bits = self.to_bits() & !(0xFFFF_FFFFu64 << shift);
        *self = f64::from_bits(bits | ((value as u32 as u64) << shift));
    }
}

/// Compressing half of a field: consumes one value from the front of a
/// record buffer.
pub trait FieldCompressor {
    fn size_of_field(&self) -> usize;

    /// Compresses the value at the start of `buf` and returns the rest of
    /// the buffer.
    ///
    /// # Panics
    /// If `buf` is shorter than [`size_of_field`](Self::size_of_field).
    fn compress_with<'a, E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        buf: &'a [u8],
    ) -> io::Result<&'a [u8]>;
}

/// Decompressing half of a field: fills one value at the front of a record
/// buffer.
pub trait FieldDecompressor {
    fn size_of_field(&self) -> usize;

    /// Decodes one value into the start of `buf` and returns the rest of
    /// the buffer.
    ///
    /// # Panics
    /// If `buf` is shorter than [`size_of_field`](Self::size_of_field).
    fn decompress_with<'a, D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]>;
}

/// One fixed-width slot of a record, predicted from its previous values.
///
/// The very first value is copied raw to the stream since there is nothing
/// to predict it from; every later value is coded against the prediction of
/// `D`. The lane models are only built when the field is first used.
///
/// A field instance keeps the state of a single direction. Use separate
/// instances for compressing and decompressing.
pub struct Field<T: FieldValue, D: DiffMethod<T> = StandardDiff<T>> {
    diff: D,
    compressors: Option<Vec<IntegerCompressor>>,
    decompressors: Option<Vec<IntegerDecompressor>>,
    _value: std::marker::PhantomData<T>,
}

impl<T: FieldValue> Field<T> {
    pub fn new() -> Self {
        Self::with_diff(StandardDiff::default())
    }
}

impl<T: FieldValue, D: DiffMethod<T>> Field<T, D> {
    pub fn with_diff(diff: D) -> Self {
        Self {
            diff,
            compressors: None,
            decompressors: None,
            _value: std::marker::PhantomData,
        }
    }

    pub fn diff(&self) -> &D {
        &self.diff
    }

    /// Whether the lane models have been built by a first compress or
    /// decompress call.
    pub fn is_initialized(&self) -> bool {
        self.compressors.is_some() || self.decompressors.is_some()
    }

    fn model_builder() -> IntegerCompressorBuilder {
        IntegerCompressorBuilder::new().bits(T::LANE_BITS)
    }
}

impl<T: FieldValue, D: DiffMethod<T>> Default for Field<T, D> {
    fn default() -> Self {
        Self::with_diff(D::default())
    }
}

impl<T: FieldValue, D: DiffMethod<T>> Clone for Field<T, D> {
    /// Returns a fresh field of the same type. Neither the predictor history
    /// nor the lane models are copied, so the clone starts a new stream with
    /// a raw first value.
    fn clone(&self) -> Self {
        Self::default()
    }
}

impl<T: FieldValue, D: DiffMethod<T>> FieldCompressor for Field<T, D> {
    fn size_of_field(&self) -> usize {
        T::SIZE
    }

    fn compress_with<'a, E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        buf: &'a [u8],
    ) -> io::Result<&'a [u8]> {
        let (raw, rest) = buf.split_at(T::SIZE);
        let this_val = T::unpack_from(raw);

        let models = self.compressors.get_or_insert_with(|| {
            let builder = Self::model_builder();
            (0..T::LANES).map(|_| builder.build_compressor()).collect()
        });

        if self.diff.have_value() {
            let predicted = self.diff.value();
            for (lane, model) in models.iter_mut().enumerate() {
                model.compress(encoder, predicted.lane(lane), this_val.lane(lane), 0)?;
            }
        } else {
            // nothing to predict from yet, the decoder reads these bytes as is
            encoder.write_raw(raw)?;
        }

        self.diff.push(this_val);
        Ok(rest)
    }
}

impl<T: FieldValue, D: DiffMethod<T>> FieldDecompressor for Field<T, D> {
    fn size_of_field(&self) -> usize {
        T::SIZE
    }

    fn decompress_with<'a, Dec: EntropyDecoder>(
        &mut self,
        decoder: &mut Dec,
        buf: &'a mut [u8],
    ) -> io::Result<&'a mut [u8]> {
        let (out, rest) = buf.split_at_mut(T::SIZE);

        let models = self.decompressors.get_or_insert_with(|| {
            let builder = Self::model_builder();
            (0..T::LANES).map(|_| builder.build_decompressor()).collect()
        });

        let value = if self.diff.have_value() {
            let predicted = self.diff.value();
            let mut value = predicted;
            for (lane, model) in models.iter_mut().enumerate() {
                let real = model.decompress(decoder, predicted.lane(lane), 0)?;
                value.set_lane(lane, real);
            }
            value.pack_into(out);
            value
        } else {
            decoder.read_raw(out)?;
            T::unpack_from(out)
        };

        self.diff.push(value);
        Ok(rest)
    }
}
