//! Conversion between fixed-width values and their little-endian bytes.
//!
//! Record buffers carry no alignment guarantees, so values are always
//! assembled byte by byte instead of being read through typed pointers.
//! Every packer produces the same bytes on every host.

/// A fixed-width value with a canonical little-endian byte layout.
///
/// `unpack_from` and `pack_into` only look at the first [`Packable::SIZE`]
/// bytes of the slice.
///
/// # Panics
/// Both functions panic if the slice is shorter than `SIZE`. Making sure the
/// buffer is long enough is the caller's job.
pub trait Packable: Sized {
    /// Number of bytes the packed form occupies.
    const SIZE: usize;

    fn unpack_from(input: &[u8]) -> Self;

    fn pack_into(&self, output: &mut [u8]);
}

impl Packable for u32 {
    const SIZE: usize = 4;

    fn unpack_from(input: &[u8]) -> Self {
        let b1 = input[0] as u32;
        let b2 = input[1] as u32;
        let b3 = input[2] as u32;
        let b4 = input[3] as u32;
        (b4 << 24) | (b3 << 16) | (b2 << 8) | b1
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[3] = (*self >> 24) as u8;
        output[2] = (*self >> 16) as u8;
        output[1] = (*self >> 8) as u8;
        output[0] = *self as u8;
    }
}

impl Packable for u16 {
    const SIZE: usize = 2;

    fn unpack_from(input: &[u8]) -> Self {
        let b1 = input[0] as u16;
        let b2 = input[1] as u16;
        (b2 << 8) | b1
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[1] = (*self >> 8) as u8;
        output[0] = *self as u8;
    }
}

impl Packable for u8 {
    const SIZE: usize = 1;

    fn unpack_from(input: &[u8]) -> Self {
        input[0]
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self;
    }
}

impl Packable for i32 {
    const SIZE: usize = 4;

    fn unpack_from(input: &[u8]) -> Self {
        u32::unpack_from(input) as i32
    }

    fn pack_into(&self, output: &mut [u8]) {
        (*self as u32).pack_into(output)
    }
}

impl Packable for i16 {
    const SIZE: usize = 2;

    fn unpack_from(input: &[u8]) -> Self {
        u16::unpack_from(input) as i16
    }

    fn pack_into(&self, output: &mut [u8]) {
        (*self as u16).pack_into(output)
    }
}

impl Packable for i8 {
    const SIZE: usize = 1;

    fn unpack_from(input: &[u8]) -> Self {
        input[0] as i8
    }

    fn pack_into(&self, output: &mut [u8]) {
        output[0] = *self as u8;
    }
}

/// Doubles travel as their raw bit pattern: low 32 bits first, then the high
/// 32 bits, each through the `u32` packer. No float arithmetic is involved,
/// so signed zeros and NaN payloads come back untouched.
impl Packable for f64 {
    const SIZE: usize = 8;

    fn unpack_from(input: &[u8]) -> Self {
        let lower = u32::unpack_from(&input[..4]) as u64;
        let upper = u32::unpack_from(&input[4..8]) as u64;
        f64::from_bits((upper << 32) | lower)
    }

    fn pack_into(&self, output: &mut [u8]) {
        let bits = self.to_bits();
        ((bits & 0xFFFF_FFFF) as u32).pack_into(&mut output[..4]);
        ((bits >> 32) as u32).pack_into(&mut output[4..8]);
    }
}
