use crate::output::OutputRange;
use crate::settings::SettingsError;

/// Command side speed domain, `min < max` is checked on construction.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct SpeedWindow {
    min: f64,
    max: f64,
}

impl SpeedWindow {
    pub fn new(min: f64, max: f64) -> Result<Self, SettingsError> {
        if min.is_finite() && max.is_finite() && min < max {
            Ok(Self { min, max })
        } else {
            Err(SettingsError::DegenerateWindow { min, max })
        }
    }
    pub fn min(&self) -> f64 {
        self.min
    }
    pub fn max(&self) -> f64 {
        self.max
    }
}

/// Maps a spindle speed into the output range, clamping speeds outside of the window.
///
/// The window bounds map exactly onto the range bounds.
pub fn map(magnitude: f64, window: SpeedWindow, range: OutputRange) -> f64 {
    let percent = (magnitude - window.min) / (window.max - window.min);
    if percent <= 0.0 {
        return range.min;
    }
    if percent >= 1.0 {
        return range.max;
    }
    range.clamp(range.min + percent * range.span())
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn window() -> SpeedWindow {
        SpeedWindow::new(0.0, 10000.0).unwrap()
    }

    fn servo() -> OutputRange {
        OutputRange::new(-1.0, 1.0)
    }

    #[test]
    fn maps_window_bounds_exactly() {
        assert_eq!(map(0.0, window(), servo()), -1.0);
        assert_eq!(map(10000.0, window(), servo()), 1.0);

        let duty = OutputRange::new(0.05, 0.15);
        assert_eq!(map(0.0, window(), duty), 0.05);
        assert_eq!(map(10000.0, window(), duty), 0.15);
    }

    #[test]
    fn maps_linear_inside_window() {
        assert_eq!(map(5000.0, window(), servo()), 0.0);
        assert_eq!(map(2500.0, window(), servo()), -0.5);
        assert_eq!(map(7500.0, window(), servo()), 0.5);
    }

    #[test]
    fn clamps_outside_window() {
        assert_eq!(map(-200.0, window(), servo()), -1.0);
        assert_eq!(map(24000.0, window(), servo()), 1.0);
        assert_eq!(map(f64::INFINITY, window(), servo()), 1.0);
        assert_eq!(map(f64::NEG_INFINITY, window(), servo()), -1.0);
    }

    #[test]
    fn rejects_degenerate_window() {
        assert!(SpeedWindow::new(100.0, 100.0).is_err());
        assert!(SpeedWindow::new(200.0, 100.0).is_err());
        assert!(SpeedWindow::new(f64::NAN, 100.0).is_err());
    }

    proptest! {
        #[test]
        fn stays_in_range(speed in -50000.0f64..50000.0) {
            let value = map(speed, window(), servo());
            prop_assert!((-1.0..=1.0).contains(&value));
        }

        #[test]
        fn is_monotonic(a in 0.0f64..=10000.0, b in 0.0f64..=10000.0) {
            let (low, high) = if a <= b { (a, b) } else { (b, a) };
            prop_assert!(map(low, window(), servo()) <= map(high, window(), servo()));
        }

        #[test]
        fn clamps_to_nearest_bound(excess in 0.001f64..1.0e9) {
            prop_assert_eq!(map(-excess, window(), servo()), -1.0);
            prop_assert_eq!(map(10000.0 + excess, window(), servo()), 1.0);
        }
    }
}
