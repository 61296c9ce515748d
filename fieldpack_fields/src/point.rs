use fieldpack_core::{FieldValue, Packable};

/// A 3D point of doubles, packed as `x`, `y`, `z` little-endian.
///
/// Each coordinate is split into its two 32-bit halves like a plain `f64`
/// field, so a point is coded as six independent lanes.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct Point3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Point3 {
    pub fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    fn coord(&self, axis: usize) -> f64 {
        match axis {
            0 => self.x,
            1 => self.y,
            _ => self.z,
        }
    }

    fn coord_mut(&mut self, axis: usize) -> &mut f64 {
        match axis {
            0 => &mut self.x,
            1 => &mut self.y,
            _ => &mut self.z,
        }
    }
}

impl Packable for Point3 {
    const SIZE: usize = 24;

    fn unpack_from(input: &[u8]) -> Self {
        Self {
            x: f64::unpack_from(&input[0..8]),
            y: f64::unpack_from(&input[8..16]),
            z: f64::unpack_from(&input[16..24]),
        }
    }

    fn pack_into(&self, output: &mut [u8]) {
        self.x.pack_into(&mut output[0..8]);
        self.y.pack_into(&mut output[8..16]);
        self.z.pack_into(&mut output[16..24]);
    }
}

impl FieldValue for Point3 {
    const LANES: usize = 3 * <f64 as FieldValue>::LANES;
    const LANE_BITS: u32 = 32;

    #[inline]
    fn lane(&self, index: usize) -> i32 {
        self.coord(index / 2).lane(index % 2)
    }

    #[inline]
    fn set_lane(&mut self, index: usize, value: i32) {
        self.coord_mut(index / 2).set_lane(index % 2, value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fieldpack_core::{DynamicCompressor, DynamicDecompressor, Field};

    #[test]
    fn test_pack_layout() {
        let p = Point3::new(1.0, -2.5, 1e-300);
        let mut buf = [0u8; 24];
        p.pack_into(&mut buf);
        assert_eq!(&buf[0..8], &1.0f64.to_le_bytes());
        assert_eq!(&buf[8..16], &(-2.5f64).to_le_bytes());
        assert_eq!(&buf[16..24], &1e-300f64.to_le_bytes());
        assert_eq!(Point3::unpack_from(&buf), p);
    }

    #[test]
    fn test_lanes_cover_every_bit() {
        let p = Point3 {
            x: f64::from_bits(0x0102_0304_0506_0708),
            y: f64::from_bits(0x1112_1314_1516_1718),
            z: f64::from_bits(0x2122_2324_2526_2728),
        };
        assert_eq!(Point3::LANES, 6);
        assert_eq!(p.lane(0), 0x0506_0708);
        assert_eq!(p.lane(3), 0x1112_1314);
        assert_eq!(p.lane(4), 0x2526_2728);

        let mut q = Point3::default();
        for lane in 0..Point3::LANES {
            q.set_lane(lane, p.lane(lane));
        }
        assert_eq!(q.x.to_bits(), p.x.to_bits());
        assert_eq!(q.y.to_bits(), p.y.to_bits());
        assert_eq!(q.z.to_bits(), p.z.to_bits());
    }

    #[test]
    fn test_point_field_roundtrip() {
        let points: Vec<Point3> = (0..200)
            .map(|i| {
                let t = i as f64;
                Point3::new(t * 0.5, 1000.0 - t, (t * 0.01).sin())
            })
            .collect();

        let mut c = DynamicCompressor::new(Vec::new());
        c.add_field_instance(Field::<Point3>::new());
        let mut buf = [0u8; 24];
        for p in &points {
            p.pack_into(&mut buf);
            c.compress(&buf).unwrap();
        }
        c.done().unwrap();
        let data = c.into_stream();

        let mut d = DynamicDecompressor::new(data.as_slice());
        d.add_field::<Point3>();
        for p in &points {
            d.decompress(&mut buf).unwrap();
            let got = Point3::unpack_from(&buf);
            assert_eq!(got.z.to_bits(), p.z.to_bits());
            assert_eq!(got, *p);
        }
    }
}
