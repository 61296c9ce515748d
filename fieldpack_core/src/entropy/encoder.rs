use std::io::{self, Write};

use log::debug;

use super::models::{ArithmeticBitModel, ArithmeticModel, BM_LENGTH_SHIFT, DM_LENGTH_SHIFT};
use super::{EntropyEncoder, AC_BUFFER_SIZE, AC_MAX_LENGTH, AC_MIN_LENGTH};

/// Adaptive arithmetic encoder writing into a byte sink.
///
/// # Output buffering
/// Coded bytes go into a circular buffer of `2 * AC_BUFFER_SIZE` bytes and
/// reach the stream one half at a time, so a carry can still ripple into
/// bytes that have not been flushed yet. Raw bytes written through
/// [`EntropyEncoder::write_raw`] bypass the buffer entirely; they must come
/// before the first coded symbol to keep the stream in order.
///
/// Call [`done`](EntropyEncoder::done) once after the last symbol, otherwise
/// the tail of the code never reaches the stream.
pub struct ArithmeticEncoder<W: Write> {
    base: u32,
    length: u32,
    out_buffer: Box<[u8]>,
    out_byte: usize,
    end_byte: usize,
    stream: W,
}

impl<W: Write> ArithmeticEncoder<W> {
    pub fn new(stream: W) -> Self {
        Self {
            base: 0,
            length: AC_MAX_LENGTH,
            out_buffer: vec![0u8; 2 * AC_BUFFER_SIZE].into_boxed_slice(),
            out_byte: 0,
            end_byte: 2 * AC_BUFFER_SIZE,
            stream,
        }
    }

    pub fn out_stream(&mut self) -> &mut W {
        &mut self.stream
    }

    pub fn into_stream(self) -> W {
        self.stream
    }

    fn write_short(&mut self, sym: u16) -> io::Result<()> {
        let init_base = self.base;
        self.length >>= 16;
        self.base = self.base.wrapping_add(sym as u32 * self.length);
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    fn propagate_carry(&mut self) {
        let last = self.out_buffer.len() - 1;
        let mut p = if self.out_byte == 0 {
            last
        } else {
            self.out_byte - 1
        };
        while self.out_buffer[p] == 0xFF {
            self.out_buffer[p] = 0;
            p = if p == 0 { last } else { p - 1 };
        }
        self.out_buffer[p] += 1;
    }

    fn renorm_enc_interval(&mut self) -> io::Result<()> {
        loop {
            self.out_buffer[self.out_byte] = (self.base >> 24) as u8;
            self.out_byte += 1;
            if self.out_byte == self.end_byte {
                self.manage_out_buffer()?;
            }
            self.base <<= 8;
            self.length <<= 8;
            if self.length >= AC_MIN_LENGTH {
                break;
            }
        }
        Ok(())
    }

    fn manage_out_buffer(&mut self) -> io::Result<()> {
        if self.out_byte == 2 * AC_BUFFER_SIZE {
            self.out_byte = 0;
        }
        self.stream
            .write_all(&self.out_buffer[self.out_byte..self.out_byte + AC_BUFFER_SIZE])?;
        self.end_byte = self.out_byte + AC_BUFFER_SIZE;
        Ok(())
    }
}

impl<W: Write> EntropyEncoder for ArithmeticEncoder<W> {
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()> {
        self.stream.write_all(bytes)
    }

    fn encode_bit(&mut self, model: &mut ArithmeticBitModel, bit: u32) -> io::Result<()> {
        let x = model.bit_0_prob * (self.length >> BM_LENGTH_SHIFT);
        if bit == 0 {
            self.length = x;
            model.bit_0_count += 1;
        } else {
            let init_base = self.base;
            self.base = self.base.wrapping_add(x);
            self.length -= x;
            if init_base > self.base {
                self.propagate_carry();
            }
        }

        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }

        model.bits_until_update -= 1;
        if model.bits_until_update == 0 {
            model.update();
        }
        Ok(())
    }

    fn encode_symbol(&mut self, model: &mut ArithmeticModel, sym: u32) -> io::Result<()> {
        debug_assert!(sym <= model.last_symbol);
        let init_base = self.base;
        let s = sym as usize;

        if sym == model.last_symbol {
            let x = model.distribution[s] * (self.length >> DM_LENGTH_SHIFT);
            self.base = self.base.wrapping_add(x);
            self.length -= x;
        } else {
            self.length >>= DM_LENGTH_SHIFT;
            let x = model.distribution[s] * self.length;
            self.base = self.base.wrapping_add(x);
            self.length = model.distribution[s + 1] * self.length - x;
        }

        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }

        model.symbol_count[s] += 1;
        model.symbols_until_update -= 1;
        if model.symbols_until_update == 0 {
            model.update();
        }
        Ok(())
    }

    fn write_bits(&mut self, mut bits: u32, mut sym: u32) -> io::Result<()> {
        debug_assert!(bits > 0 && bits <= 32);
        if bits > 19 {
            self.write_short((sym & 0xFFFF) as u16)?;
            sym >>= 16;
            bits -= 16;
        }
        debug_assert!(sym < (1 << bits));

        let init_base = self.base;
        self.length >>= bits;
        self.base = self.base.wrapping_add(sym * self.length);
        if init_base > self.base {
            self.propagate_carry();
        }
        if self.length < AC_MIN_LENGTH {
            self.renorm_enc_interval()?;
        }
        Ok(())
    }

    fn done(&mut self) -> io::Result<()> {
        let init_base = self.base;
        let another_byte = if self.length > 2 * AC_MIN_LENGTH {
            self.base = self.base.wrapping_add(AC_MIN_LENGTH);
            self.length = AC_MIN_LENGTH >> 1;
            true
        } else {
            self.base = self.base.wrapping_add(AC_MIN_LENGTH >> 1);
            self.length = AC_MIN_LENGTH >> 9;
            false
        };

        if init_base > self.base {
            self.propagate_carry();
        }
        self.renorm_enc_interval()?;

        if self.end_byte != 2 * AC_BUFFER_SIZE {
            self.stream.write_all(&self.out_buffer[AC_BUFFER_SIZE..])?;
        }
        if self.out_byte != 0 {
            self.stream.write_all(&self.out_buffer[..self.out_byte])?;
        }

        // trailing zeros cover the bytes the decoder reads ahead
        self.stream.write_all(&[0u8, 0u8])?;
        if another_byte {
            self.stream.write_all(&[0u8])?;
        }
        self.stream.flush()?;
        debug!("arithmetic encoder flushed (another_byte={another_byte})");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_stream_done() {
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        encoder.done().unwrap();
        assert_eq!(encoder.into_stream(), vec![1u8, 0, 0, 0]);
    }

    #[test]
    fn test_raw_bytes_precede_code() {
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        encoder.write_raw(&[17, 42, 35, 1]).unwrap();
        encoder.done().unwrap();
        assert_eq!(encoder.into_stream(), vec![17u8, 42, 35, 1, 1, 0, 0, 0]);
    }

    #[test]
    fn test_out_stream_is_the_sink() {
        let mut encoder = ArithmeticEncoder::new(Vec::new());
        encoder.out_stream().extend_from_slice(b"hdr");
        assert_eq!(encoder.into_stream(), b"hdr".to_vec());
    }
}
