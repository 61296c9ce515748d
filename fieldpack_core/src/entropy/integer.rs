//! Predictive integer coding on top of the adaptive models.
//!
//! A value is coded as the corrector `real - predicted`. The corrector's
//! magnitude class `k` (its bit length) goes through a per-context symbol
//! model, then the corrector itself through a per-`k` model. Correctors
//! wider than `bits_high` bits only send their top `bits_high` bits through
//! the model; the rest is written raw.

use std::io;

use super::models::{ArithmeticBitModel, ArithmeticModel};
use super::{EntropyDecoder, EntropyEncoder};

/// Bits of a corrector that go through an adaptive model before the rest is
/// written raw.
pub const DEFAULT_BITS_HIGH: u32 = 8;
pub const DEFAULT_CONTEXTS: u32 = 1;

/// Shared parameters of a matching compressor/decompressor pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct CorrectorRange {
    bits: u32,
    contexts: u32,
    bits_high: u32,
    corr_bits: u32,
    corr_range: u32,
    corr_min: i32,
    corr_max: i32,
}

impl CorrectorRange {
    fn new(bits: u32, contexts: u32, bits_high: u32, mut range: u32) -> Self {
        let (corr_bits, corr_range, corr_min, corr_max) = if range != 0 {
            let corr_range = range;
            let mut corr_bits = 0u32;
            while range != 0 {
                range >>= 1;
                corr_bits += 1;
            }
            if corr_range == 1u32 << (corr_bits - 1) {
                corr_bits -= 1;
            }
            let corr_min = -((corr_range / 2) as i32);
            let corr_max = corr_min.wrapping_add(corr_range as i32).wrapping_sub(1);
            (corr_bits, corr_range, corr_min, corr_max)
        } else if bits != 0 && bits < 32 {
            let corr_range = 1u32 << bits;
            let corr_min = -((corr_range / 2) as i32);
            let corr_max = corr_min + (corr_range - 1) as i32;
            (bits, corr_range, corr_min, corr_max)
        } else {
            (32, 0, i32::MIN, i32::MAX)
        };

        Self {
            bits,
            contexts,
            bits_high,
            corr_bits,
            corr_range,
            corr_min,
            corr_max,
        }
    }

    fn bits_models(&self, compress: bool) -> Vec<ArithmeticModel> {
        (0..self.contexts)
            .map(|_| ArithmeticModel::new(self.corr_bits + 1, compress))
            .collect()
    }

    /// Index 0 is unused; `corrector[k]` codes correctors of bit length `k`.
    fn corrector_models(&self, compress: bool) -> Vec<ArithmeticModel> {
        let mut models = Vec::with_capacity(self.corr_bits as usize + 1);
        models.push(ArithmeticModel::new(2, compress));
        for i in 1..=self.corr_bits {
            let symbols = if i <= self.bits_high {
                1u32 << i
            } else {
                1u32 << self.bits_high
            };
            models.push(ArithmeticModel::new(symbols, compress));
        }
        models
    }
}

/// Configures an [`IntegerCompressor`] or [`IntegerDecompressor`].
///
/// Both sides of a stream must be built with identical settings.
#[derive(Debug, Clone, Copy)]
pub struct IntegerCompressorBuilder {
    bits: u32,
    contexts: u32,
    bits_high: u32,
    range: u32,
}

impl IntegerCompressorBuilder {
    pub fn new() -> Self {
        Self {
            bits: 16,
            contexts: DEFAULT_CONTEXTS,
            bits_high: DEFAULT_BITS_HIGH,
            range: 0,
        }
    }

    /// Width of the coded values; `32` (or `0`) codes the full `i32` range.
    pub fn bits(mut self, bits: u32) -> Self {
        self.bits = bits;
        self
    }

    pub fn contexts(mut self, contexts: u32) -> Self {
        self.contexts = contexts;
        self
    }

    pub fn bits_high(mut self, bits_high: u32) -> Self {
        self.bits_high = bits_high;
        self
    }

    /// Restricts values to `0..range` instead of a power-of-two width.
    pub fn range(mut self, range: u32) -> Self {
        self.range = range;
        self
    }

    fn corrector_range(&self) -> CorrectorRange {
        assert!(self.contexts > 0, "an integer model needs at least one context");
        assert!(
            (1..=20).contains(&self.bits_high),
            "bits_high must be in 1..=20, got {}",
            self.bits_high
        );
        CorrectorRange::new(self.bits, self.contexts, self.bits_high, self.range)
    }

    pub fn build_compressor(&self) -> IntegerCompressor {
        let range = self.corrector_range();
        IntegerCompressor {
            bits_models: range.bits_models(true),
            corrector: range.corrector_models(true),
            corrector_0: ArithmeticBitModel::new(),
            range,
            k: 0,
        }
    }

    pub fn build_decompressor(&self) -> IntegerDecompressor {
        let range = self.corrector_range();
        IntegerDecompressor {
            bits_models: range.bits_models(false),
            corrector: range.corrector_models(false),
            corrector_0: ArithmeticBitModel::new(),
            range,
            k: 0,
        }
    }
}

impl Default for IntegerCompressorBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Codes `i32` values against a prediction.
pub struct IntegerCompressor {
    range: CorrectorRange,
    bits_models: Vec<ArithmeticModel>,
    corrector_0: ArithmeticBitModel,
    corrector: Vec<ArithmeticModel>,
    k: u32,
}

impl IntegerCompressor {
    pub fn bits(&self) -> u32 {
        self.range.bits
    }

    /// Magnitude class of the last coded corrector.
    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn compress<E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        predicted: i32,
        real: i32,
        context: u32,
    ) -> io::Result<()> {
        let mut corr = real.wrapping_sub(predicted);
        if corr < self.range.corr_min {
            corr = corr.wrapping_add(self.range.corr_range as i32);
        } else if corr > self.range.corr_max {
            corr = corr.wrapping_sub(self.range.corr_range as i32);
        }
        self.write_corrector(encoder, corr, context as usize)
    }

    fn write_corrector<E: EntropyEncoder>(
        &mut self,
        encoder: &mut E,
        mut c: i32,
        context: usize,
    ) -> io::Result<()> {
        // bit length of |c| for c <= 0, of c - 1 for c > 0
        let mut c1 = if c <= 0 {
            c.unsigned_abs()
        } else {
            (c - 1) as u32
        };
        self.k = 0;
        while c1 != 0 {
            c1 >>= 1;
            self.k += 1;
        }

        encoder.encode_symbol(&mut self.bits_models[context], self.k)?;

        if self.k == 0 {
            // c is 0 or 1
            return encoder.encode_bit(&mut self.corrector_0, c as u32);
        }
        if self.k == 32 {
            // only i32::MIN lands here, the decoder maps k == 32 back to it
            return Ok(());
        }

        if c < 0 {
            c = c.wrapping_add(((1u32 << self.k) - 1) as i32);
        } else {
            c -= 1;
        }
        let c = c as u32;

        let k = self.k as usize;
        if self.k <= self.range.bits_high {
            encoder.encode_symbol(&mut self.corrector[k], c)
        } else {
            let k1 = self.k - self.range.bits_high;
            let low = c & ((1u32 << k1) - 1);
            encoder.encode_symbol(&mut self.corrector[k], c >> k1)?;
            encoder.write_bits(k1, low)
        }
    }
}

/// Decodes values produced by an [`IntegerCompressor`] with the same settings.
pub struct IntegerDecompressor {
    range: CorrectorRange,
    bits_models: Vec<ArithmeticModel>,
    corrector_0: ArithmeticBitModel,
    corrector: Vec<ArithmeticModel>,
    k: u32,
}

impl IntegerDecompressor {
    pub fn bits(&self) -> u32 {
        self.range.bits
    }

    pub fn k(&self) -> u32 {
        self.k
    }

    pub fn decompress<D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        predicted: i32,
        context: u32,
    ) -> io::Result<i32> {
        let corr = self.read_corrector(decoder, context as usize)?;
        let mut real = predicted.wrapping_add(corr);
        if real < 0 {
            real = real.wrapping_add(self.range.corr_range as i32);
        } else if real as u32 >= self.range.corr_range {
            real = real.wrapping_sub(self.range.corr_range as i32);
        }
        Ok(real)
    }

    fn read_corrector<D: EntropyDecoder>(
        &mut self,
        decoder: &mut D,
        context: usize,
    ) -> io::Result<i32> {
        self.k = decoder.decode_symbol(&mut self.bits_models[context])?;

        if self.k == 0 {
            return Ok(decoder.decode_bit(&mut self.corrector_0)? as i32);
        }
        if self.k >= 32 {
            return Ok(self.range.corr_min);
        }

        let k = self.k as usize;
        let c = if self.k <= self.range.bits_high {
            decoder.decode_symbol(&mut self.corrector[k])?
        } else {
            let k1 = self.k - self.range.bits_high;
            let high = decoder.decode_symbol(&mut self.corrector[k])?;
            let low = decoder.read_bits(k1)?;
            (high << k1) | low
        };

        let c = c as i32;
        if c as u32 >= 1u32 << (self.k - 1) {
            Ok(c.wrapping_add(1))
        } else {
            Ok(c.wrapping_sub(((1u32 << self.k) - 1) as i32))
        }
    }
}
