//! Tolerant equality used by change detection.

use fieldforge_config::BoundsSettings;
use glam::{DMat4, DVec2};

/// Tolerance for floating-point comparisons when deciding whether a
/// hierarchy changed.
pub const CACHE_PRECISION: f64 = 1e-5;

/// Equality where every float may differ by at most `tolerance`.
pub trait ApproxEq {
    /// Returns `true` if `self` and `other` are equal within `tolerance`.
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool;
}

impl ApproxEq for f64 {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        (self - other).abs() <= tolerance
    }
}

impl ApproxEq for DVec2 {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.abs_diff_eq(*other, tolerance)
    }
}

impl ApproxEq for DMat4 {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.abs_diff_eq(*other, tolerance)
    }
}

impl<T: ApproxEq> ApproxEq for Option<T> {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        match (self, other) {
            (Some(a), Some(b)) => a.approx_eq(b, tolerance),
            (None, None) => true,
            _ => false,
        }
    }
}

impl ApproxEq for BoundsSettings {
    fn approx_eq(&self, other: &Self, tolerance: f64) -> bool {
        self.final_resolution == other.final_resolution
            && self.viewport_resolution == other.viewport_resolution
            && self.auto_update == other.auto_update
            && self.create_result_object == other.create_result_object
            && self.result_smooth_shade == other.result_smooth_shade
            && self
                .global_blend_factor
                .approx_eq(&other.global_blend_factor, tolerance)
            && self.update_delay_s.approx_eq(&other.update_delay_s, tolerance)
            && self
                .min_update_interval_s
                .approx_eq(&other.min_update_interval_s, tolerance)
    }
}
