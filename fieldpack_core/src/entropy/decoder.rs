use std::io::{self, Read};

use log::debug;

use super::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};
use super::{EntropyDecoder, AC_MAX_LENGTH, AC_MIN_LENGTH};

/// Adaptive arithmetic decoder reading from a byte source.
///
/// The decoder starts out without any code bytes loaded. Raw bytes can be
/// pulled with [`EntropyDecoder::read_raw`] until
/// [`read_init_bytes`](EntropyDecoder::read_init_bytes) loads the first four
/// bytes of the code; symbols can only be decoded after that.
pub struct ArithmeticDecoder<R: Read> {
    value: u32,
    length: u32,
    stream: R,
}

impl<R: Read> ArithmeticDecoder<R> {
    pub fn new(stream: R) -> Self {
        Self {
            value: 0,
            length: AC_MAX_LENGTH,
            stream,
        }
    }

    pub fn in_stream(&mut self) -> &mut R {
        &mut self.stream
    }

    pub fn into_stream(self) -> R {
        self.stream
    }

    fn read_byte(&mut self) -> io::Result<u8> {
        let mut byte = [0u8; 1];
        self.stream.read_exact(&mut byte)?;
        Ok(byte[0])
    }

    fn read_short(&mut self) -> io::Result<u32> {
        self.length >>= 16;
        let sym = self.value / self.length;
        self.value = self.value.wrapping_sub(self.length.wrapping_mul(sym));
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        Ok(sym)
    }

    /// A successful operation always leaves the interval renormalized, so a
    /// short one means an earlier call failed halfway through.
    fn ensure_interval(&self) -> io::Result<()> {
        if self.length < AC_MIN_LENGTH {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "arithmetic decoder is out of sync after an earlier error",
            ));
        }
        Ok(())
    }

    fn renorm_dec_interval(&mut self) -> io::Result<()> {
        loop {
            self.value = (self.value << 8) | self.read_byte()? as u32;
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }
}

impl<R: Read> EntropyDecoder for ArithmeticDecoder<R> {
    fn read_raw(&mut self, buf: &mut [u8]) -> io::Result<()> {
        self.stream.read_exact(buf)
    }

    fn read_init_bytes(&mut self) -> io::Result<()> {
        let mut bytes = [0u8; 4];
        self.stream.read_exact(&mut bytes)?;
        self.value = u32::from_be_bytes(bytes);
        debug!("arithmetic decoder loaded init bytes");
        Ok(())
    }

    fn decode_bit(&mut self, model: &mut ArithmeticBitModel) -> io::Result<u32> {
        self.ensure_interval()?;
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);
        let sym = if self.value < x {
            self.length = x;
            model.bit_0_count += 1;
            0
        } else {
            self.value -= x;
            self.length -= x;
            1
        };

        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }

        model.bits_until_update -= 1;
        if model.bits_until_update == 0 {
            model.update();
        }
        Ok(sym)
    }

    fn decode_symbol(&mut self, model: &mut ArithmeticModel) -> io::Result<u32> {
        self.ensure_interval()?;
        let mut y = self.length;
        let x;
        let mut sym;

        if !model.decoder_table.is_empty() {
            self.length >>= DM_LENGTH_SHIFT;
            let dv = self.value / self.length;
            // only a corrupt stream can push the index past the table
            let t = ((dv >> model.table_shift) as usize).min(model.decoder_table.len() - 2);

            sym = model.decoder_table[t];
            let mut n = model.decoder_table[t + 1] + 1;
            while n > sym + 1 {
                let k = (sym + n) >> 1;
                if model.distribution[k as usize] > dv {
                    n = k;
                } else {
                    sym = k;
                }
            }

            x = model.distribution[sym as usize] * self.length;
            if sym != model.last_symbol {
                y = model.distribution[sym as usize + 1] * self.length;
            }
        } else {
            let mut lo = 0u32;
            sym = 0;
            self.length >>= DM_LENGTH_SHIFT;
            let mut n = model.symbols;
            let mut k = n >> 1;
            loop {
                let z = self.length * model.distribution[k as usize];
                if z > self.value {
                    n = k;
                    y = z;
                } else {
                    sym = k;
                    lo = z;
                }
                k = (sym + n) >> 1;
                if k == sym {
                    break;
                }
            }
            x = lo;
        }

        self.value = self.value.wrapping_sub(x);
        self.length = y.wrapping_sub(x);

        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }

        model.symbol_count[sym as usize] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update();
        }
        Ok(sym)
    }

    fn read_bits(&mut self, mut bits: u32) -> io::Result<u32> {
        debug_assert!(bits > 0 && bits <= 32);
        self.ensure_interval()?;
        if bits > 19 {
            let low = self.read_short()?;
            bits -= 16;
            let high = self.read_bits(bits)? << 16;
            return Ok(high | low);
        }

        self.length >>= bits;
        let sym = self.value / self.length;
        self.value = self.value.wrapping_sub(self.length.wrapping_mul(sym));
        if self.length < AC_MIN_LENGTH {
            self.renorm_dec_interval()?;
        }
        Ok(sym)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::entropy::{ArithmeticEncoder, EntropyEncoder};

    #[test]
    fn test_symbols_bits_and_raw_roundtrip() {
        let symbols: Vec<u32> = (0..3000u32).map(|i| (i * i + 3 * i) % 29).collect();
        let bits: Vec<u32> = (0..3000u32).map(|i| i % 7).map(|i| (i * 3) & 1).collect();
        let wide: Vec<u32> = (0..500u32).map(|i| i.wrapping_mul(2_654_435_761)).collect();

        let mut encoder = ArithmeticEncoder::new(Vec::new());
        encoder.write_raw(b"RAW!").unwrap();
        let mut sym_model = ArithmeticModel::new(29, true);
        let mut bit_model = ArithmeticBitModel::new();
        for (s, b) in symbols.iter().zip(&bits) {
            encoder.encode_symbol(&mut sym_model, *s).unwrap();
            encoder.encode_bit(&mut bit_model, *b).unwrap();
        }
        for w in &wide {
            encoder.write_bits(32, *w).unwrap();
            encoder.write_bits(5, *w & 0x1F).unwrap();
        }
        encoder.done().unwrap();
        let data = encoder.into_stream();

        let mut decoder = ArithmeticDecoder::new(data.as_slice());
        let mut raw = [0u8; 4];
        decoder.read_raw(&mut raw).unwrap();
        assert_eq!(&raw, b"RAW!");
        decoder.read_init_bytes().unwrap();

        let mut sym_model = ArithmeticModel::new(29, false);
        let mut bit_model = ArithmeticBitModel::new();
        for (s, b) in symbols.iter().zip(&bits) {
            assert_eq!(decoder.decode_symbol(&mut sym_model).unwrap(), *s);
            assert_eq!(decoder.decode_bit(&mut bit_model).unwrap(), *b);
        }
        for w in &wide {
            assert_eq!(decoder.read_bits(32).unwrap(), *w);
            assert_eq!(decoder.read_bits(5).unwrap(), *w & 0x1F);
        }
    }

    #[test]
    fn test_small_alphabet_without_table() {
        let symbols: Vec<u32> = (0..2000u32).map(|i| (i / 3) % 5).collect();

        let mut encoder = ArithmeticEncoder::new(Vec::new());
        let mut model = ArithmeticModel::new(5, true);
        for s in &symbols {
            encoder.encode_symbol(&mut model, *s).unwrap();
        }
        encoder.done().unwrap();
        let data = encoder.into_stream();

        let mut decoder = ArithmeticDecoder::new(data.as_slice());
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModel::new(5, false);
        for s in &symbols {
            assert_eq!(decoder.decode_symbol(&mut model).unwrap(), *s);
        }
    }

    #[test]
    fn test_in_stream_reads_a_prefix() {
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        encoder.out_stream().extend_from_slice(b"hdr");
        let mut model = ArithmeticModel::new(40, true);
        encoder.encode_symbol(&mut model, 33).unwrap();
        encoder.done().unwrap();
        let data = encoder.into_stream();

        let mut decoder = ArithmeticDecoder::new(data.as_slice());
        let mut header = [0u8; 3];
        decoder.in_stream().read_exact(&mut header).unwrap();
        assert_eq!(&header, b"hdr");
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModel::new(40, false);
        assert_eq!(decoder.decode_symbol(&mut model).unwrap(), 33);
    }

    #[test]
    fn test_calls_after_a_failed_renorm_are_errors() {
        let symbols: Vec<u32> = (0..500u32).map(|i| (i * 7919) % 40).collect();
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        let mut model = ArithmeticModel::new(40, true);
        for s in &symbols {
            encoder.encode_symbol(&mut model, *s).unwrap();
        }
        encoder.done().unwrap();
        let data = encoder.into_stream();

        let mut decoder = ArithmeticDecoder::new(&data[..6]);
        decoder.read_init_bytes().unwrap();
        let mut model = ArithmeticModel::new(40, false);
        let mut bit_model = ArithmeticBitModel::new();
        let mut first_err = None;
        for i in 0..symbols.len() {
            if let Err(e) = decoder.decode_symbol(&mut model) {
                first_err.get_or_insert(i);
                assert!(matches!(
                    e.kind(),
                    io::ErrorKind::UnexpectedEof | io::ErrorKind::InvalidData
                ));
            }
        }
        assert!(first_err.is_some());
        assert!(decoder.decode_bit(&mut bit_model).is_err());
        assert!(decoder.read_bits(24).is_err());
    }

    #[test]
    fn test_truncated_stream_is_an_error() {
        let mut decoder = ArithmeticDecoder::new(&[1u8, 2][..]);
        let err = decoder.read_init_bytes().unwrap_err();
        assert_eq!(err.kind(), io::ErrorKind::UnexpectedEof);
    }
}
