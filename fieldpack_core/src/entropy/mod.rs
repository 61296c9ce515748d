//! Entropy coding layer.
//!
//! Fields only talk to the coder through [`EntropyEncoder`] and
//! [`EntropyDecoder`]. The bundled implementation is an adaptive arithmetic
//! coder ([`ArithmeticEncoder`], [`ArithmeticDecoder`]) with the predictive
//! integer model in [`integer`]; any other coder exposing the same
//! primitives can be plugged into the pipelines instead.

mod decoder;
mod encoder;
pub mod integer;
pub mod models;

use std::io;

pub use decoder::ArithmeticDecoder;
pub use encoder::ArithmeticEncoder;
pub use integer::{IntegerCompressor, IntegerCompressorBuilder, IntegerDecompressor};
pub use models::{ArithmeticBitModel, ArithmeticModel};

/// Size of one half of the encoder's circular output buffer.
pub const AC_BUFFER_SIZE: usize = 1024;
/// Threshold below which the coding interval is renormalized.
pub const AC_MIN_LENGTH: u32 = 0x0100_0000;
pub const AC_MAX_LENGTH: u32 = 0xFFFF_FFFF;

/// Compressing side of an entropy coder.
pub trait EntropyEncoder {
    /// Writes bytes straight to the underlying stream, bypassing the coder.
    fn write_raw(&mut self, bytes: &[u8]) -> io::Result<()>;

    fn encode_bit(&mut self, model: &mut ArithmeticBitModel, bit: u32) -> io::Result<()>;

    fn encode_symbol(&mut self, model: &mut ArithmeticModel, sym: u32) -> io::Result<()>;

    /// Codes the low `bits` bits of `value` with a flat distribution.
    fn write_bits(&mut self, bits: u32, value: u32) -> io::Result<()>;

    /// Flushes the final interval. Must be called exactly once, after the
    /// last symbol.
    fn done(&mut self) -> io::Result<()>;
}

/// Decompressing side of an entropy coder.
pub trait EntropyDecoder {
    /// Reads bytes straight from the underlying stream, bypassing the coder.
    fn read_raw(&mut self, buf: &mut [u8]) -> io::Result<()>;

    /// Loads the coder state from the stream. Called once per stream, after
    /// the raw bytes that precede the code have been read.
    fn read_init_bytes(&mut self) -> io::Result<()>;

    fn decode_bit(&mut self, model: &mut ArithmeticBitModel) -> io::Result<u32>;

    fn decode_symbol(&mut self, model: &mut ArithmeticModel) -> io::Result<u32>;

    fn read_bits(&mut self, bits: u32) -> io::Result<u32>;
}
