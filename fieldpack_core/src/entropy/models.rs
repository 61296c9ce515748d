//! Adaptive probability models shared by the arithmetic encoder and decoder.

/// Length bits discarded before multiplying by a bit-model probability.
pub const BM_LENGTH_SHIFT: u32 = 13;
/// Bit counts are halved once they pass this total.
pub const BM_MAX_COUNT: u32 = 1 << BM_LENGTH_SHIFT;

/// Length bits discarded before multiplying by a symbol-model frequency.
pub const DM_LENGTH_SHIFT: u32 = 15;
/// Symbol counts are halved once their total passes this value.
pub const DM_MAX_COUNT: u32 = 1 << DM_LENGTH_SHIFT;

/// Largest alphabet an [`ArithmeticModel`] accepts.
pub const DM_MAX_SYMBOLS: u32 = 1 << 11;

/// Adaptive model for a binary alphabet.
#[derive(Debug, Clone)]
pub struct ArithmeticBitModel {
    pub(crate) update_cycle: u32,
    pub(crate) bits_until_update: u32,
    pub(crate) bit_0_prob: u32,
    pub(crate) bit_0_count: u32,
    pub(crate) bit_count: u32,
}

impl ArithmeticBitModel {
    pub fn new() -> Self {
        Self {
            update_cycle: 4,
            bits_until_update: 4,
            bit_0_prob: 1 << (BM_LENGTH_SHIFT - 1),
            bit_0_count: 1,
            bit_count: 2,
        }
    }

    pub(crate) fn update(&mut self) {
        self.bit_count += self.update_cycle;
        if self.bit_count > BM_MAX_COUNT {
            self.bit_count = (self.bit_count + 1) >> 1;
            self.bit_0_count = (self.bit_0_count + 1) >> 1;
            if self.bit_0_count == self.bit_count {
                self.bit_count += 1;
            }
        }

        let scale = 0x8000_0000u32 / self.bit_count;
        self.bit_0_prob = (self.bit_0_count * scale) >> (31 - BM_LENGTH_SHIFT);

        self.update_cycle = (5 * self.update_cycle) >> 2;
        if self.update_cycle > 64 {
            self.update_cycle = 64;
        }
        self.bits_until_update = self.update_cycle;
    }
}

impl Default for ArithmeticBitModel {
    fn default() -> Self {
        Self::new()
    }
}

/// Adaptive model for an alphabet of `2..=DM_MAX_SYMBOLS` symbols.
///
/// Decoder-side models with more than 16 symbols keep a lookup table that
/// narrows the symbol search; the distribution itself is computed the same
/// way on both sides.
#[derive(Debug, Clone)]
pub struct ArithmeticModel {
    pub(crate) symbols: u32,
    compress: bool,
    pub(crate) distribution: Vec<u32>,
    pub(crate) symbol_count: Vec<u32>,
    pub(crate) decoder_table: Vec<u32>,
    total_count: u32,
    update_cycle: u32,
    pub(crate) symbols_until_update: u32,
    pub(crate) last_symbol: u32,
    table_size: u32,
    pub(crate) table_shift: u32,
}

impl ArithmeticModel {
    /// Creates a model for `symbols` symbols, all equally likely.
    ///
    /// # Panics
    /// If `symbols` is outside `2..=DM_MAX_SYMBOLS`.
    pub fn new(symbols: u32, compress: bool) -> Self {
        assert!(
            (2..=DM_MAX_SYMBOLS).contains(&symbols),
            "invalid number of symbols: {symbols}"
        );

        let (table_size, table_shift) = if !compress && symbols > 16 {
            let mut table_bits = 3u32;
            while symbols > (1 << (table_bits + 2)) {
                table_bits += 1;
            }
            (1u32 << table_bits, DM_LENGTH_SHIFT - table_bits)
        } else {
            (0, 0)
        };

        let decoder_table = if table_size > 0 {
            vec![0u32; table_size as usize + 2]
        } else {
            Vec::new()
        };

        let mut model = Self {
            symbols,
            compress,
            distribution: vec![0u32; symbols as usize],
            symbol_count: vec![1u32; symbols as usize],
            decoder_table,
            total_count: 0,
            update_cycle: symbols,
            symbols_until_update: 0,
            last_symbol: symbols - 1,
            table_size,
            table_shift,
        };
        model.update();
        model.update_cycle = (symbols + 6) >> 1;
        model.symbols_until_update = model.update_cycle;
        model
    }

    pub(crate) fn update(&mut self) {
        self.total_count += self.update_cycle;
        if self.total_count > DM_MAX_COUNT {
            self.total_count = 0;
            for count in self.symbol_count.iter_mut() {
                *count = (*count + 1) >> 1;
                self.total_count += *count;
            }
        }

        let scale = 0x8000_0000u32 / self.total_count;
        let mut sum = 0u32;

        if self.compress || self.table_size == 0 {
            for k in 0..self.symbols as usize {
                self.distribution[k] = (scale * sum) >> (31 - DM_LENGTH_SHIFT);
                sum += self.symbol_count[k];
            }
        } else {
            let mut s = 0u32;
            for k in 0..self.symbols as usize {
                self.distribution[k] = (scale * sum) >> (31 - DM_LENGTH_SHIFT);
                sum += self.symbol_count[k];
                let w = self.distribution[k] >> self.table_shift;
                while s < w {
                    s += 1;
                    self.decoder_table[s as usize] = k as u32 - 1;
                }
            }
            self.decoder_table[0] = 0;
            while s <= self.table_size {
                s += 1;
                self.decoder_table[s as usize] = self.symbols - 1;
            }
        }

        self.update_cycle = (5 * self.update_cycle) >> 2;
        let max_cycle = (self.symbols + 6) << 3;
        if self.update_cycle > max_cycle {
            self.update_cycle = max_cycle;
        }
        self.symbols_until_update = self.update_cycle;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bit_model_starts_even() {
        let model = ArithmeticBitModel::new();
        assert_eq!(model.bit_0_prob, 1 << 12);
    }

    #[test]
    fn test_bit_model_adapts_towards_zero() {
        let mut model = ArithmeticBitModel::new();
        for _ in 0..100 {
            model.bit_0_count += 1;
            model.bits_until_update -= 1;
            if model.bits_until_update == 0 {
                model.update();
            }
        }
        assert!(model.bit_0_prob > 1 << 12);
        assert!(model.bit_0_prob < BM_MAX_COUNT);
    }

    #[test]
    fn test_uniform_distribution() {
        let model = ArithmeticModel::new(4, true);
        assert_eq!(model.distribution, vec![0, 8192, 16384, 24576]);
        assert_eq!(model.last_symbol, 3);
    }

    #[test]
    fn test_decoder_table_only_on_large_decoder_models() {
        assert!(ArithmeticModel::new(33, true).decoder_table.is_empty());
        assert!(ArithmeticModel::new(16, false).decoder_table.is_empty());

        let model = ArithmeticModel::new(33, false);
        // 33 symbols -> 16 table entries plus two sentinels
        assert_eq!(model.decoder_table.len(), 18);
        assert_eq!(model.table_shift, 11);
        assert_eq!(model.decoder_table[17], 32);
    }

    #[test]
    fn test_encoder_and_decoder_distributions_match() {
        let mut enc = ArithmeticModel::new(256, true);
        let mut dec = ArithmeticModel::new(256, false);
        for round in 0..5000u32 {
            let sym = (round * 7 % 13) as usize;
            for model in [&mut enc, &mut dec] {
                model.symbol_count[sym] += 1;
                model.symbols_until_update -= 1;
                if model.symbols_until_update == 0 {
                    model.update();
                }
            }
        }
        assert_eq!(enc.distribution, dec.distribution);
    }

    #[test]
    #[should_panic]
    fn test_rejects_single_symbol() {
        let _ = ArithmeticModel::new(1, true);
    }
}
