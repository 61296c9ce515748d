//! Prediction strategies used by fields to pick the value a new one is coded
//! against.

use crate::field::FieldValue;

/// State machine that remembers past values of one field and supplies the
/// prediction for the next one.
///
/// `have_value` must turn true on the first push. Fields write their first
/// value raw straight into the stream, which is only well ordered before the
/// coder has produced any output.
pub trait DiffMethod<T>: Default {
    fn push(&mut self, value: T);

    fn have_value(&self) -> bool;

    /// The predicted next value. Only meaningful once `have_value()` is true.
    fn value(&self) -> T;
}

/// Predicts that the next value equals the last one.
#[derive(Debug, Clone, Default)]
pub struct StandardDiff<T> {
    have_value: bool,
    value: T,
}

impl<T: Copy + Default> DiffMethod<T> for StandardDiff<T> {
    fn push(&mut self, value: T) {
        if !self.have_value {
            self.have_value = true;
        }
        self.value = value;
    }

    fn have_value(&self) -> bool {
        self.have_value
    }

    fn value(&self) -> T {
        self.value
    }
}

/// Extrapolates the last two values lane by lane (`2 * last - previous`,
/// wrapping). Falls back to the last value until two have been seen.
///
/// Works well on steadily increasing counters and coordinates, where the
/// standard strategy would keep coding the same non-zero step.
#[derive(Debug, Clone, Default)]
pub struct LinearDiff<T> {
    seen: u8,
    last: T,
    previous: T,
}

impl<T: FieldValue> DiffMethod<T> for LinearDiff<T> {
    fn push(&mut self, value: T) {
        self.previous = self.last;
        self.last = value;
        if self.seen < 2 {
            self.seen += 1;
        }
    }

    fn have_value(&self) -> bool {
        self.seen > 0
    }

    fn value(&self) -> T {
        if self.seen < 2 {
            return self.last;
        }
        let mut predicted = self.last;
        for lane in 0..T::LANES {
            let last = self.last.lane(lane);
            let step = last.wrapping_sub(self.previous.lane(lane));
            predicted.set_lane(lane, last.wrapping_add(step));
        }
        predicted
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_starts_empty() {
        let diff = StandardDiff::<i32>::default();
        assert!(!diff.have_value());
    }

    #[test]
    fn test_standard_keeps_only_last() {
        let mut diff = StandardDiff::<i16>::default();
        diff.push(7);
        assert!(diff.have_value());
        assert_eq!(diff.value(), 7);
        diff.push(-3);
        diff.push(12);
        assert_eq!(diff.value(), 12);
    }

    #[test]
    fn test_linear_falls_back_to_last() {
        let mut diff = LinearDiff::<i32>::default();
        assert!(!diff.have_value());
        diff.push(10);
        assert!(diff.have_value());
        assert_eq!(diff.value(), 10);
    }

    #[test]
    fn test_linear_extrapolates() {
        let mut diff = LinearDiff::<i32>::default();
        diff.push(10);
        diff.push(13);
        assert_eq!(diff.value(), 16);
        diff.push(12);
        assert_eq!(diff.value(), 11);
    }

    #[test]
    fn test_linear_wraps_narrow_types() {
        let mut diff = LinearDiff::<u8>::default();
        diff.push(200);
        diff.push(250);
        // 250 + 50 wraps modulo 256
        assert_eq!(diff.value(), 44);
    }

    #[test]
    fn test_linear_on_doubles_is_per_lane() {
        let mut diff = LinearDiff::<f64>::default();
        diff.push(600.0);
        diff.push(601.0);
        assert_eq!(diff.value(), 602.0);
    }
}
