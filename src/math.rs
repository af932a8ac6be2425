//! Blending math for the per-frame animation loop.
//!
//! All transition and rotation values approach their targets with a
//! frame-rate-independent exponential blend: two tick sequences covering the
//! same wall-clock time land on the same value regardless of granularity.

/// The frame rate blend factors are calibrated against.
pub const TARGET_FPS: f32 = 60.0;

/// Floor for the frame-rate normalization factor, so a single very slow
/// frame cannot explode the blend rate.
const MIN_DELTA_NORM: f32 = 1e-3;

/// Normalization factor for a frame delta: `1` at the target frame rate,
/// below `1` on slow frames, above `1` on fast ones.
pub fn delta_norm(delta_seconds: f32) -> f32 {
    if delta_seconds > 0.0 {
        (1.0 / TARGET_FPS) / delta_seconds
    } else {
        1.0
    }
}

/// Move `current` toward `target` by `factor` per target-rate frame.
///
/// Written in exponential form (`1 - (1 - factor)^(1/delta_norm)`) so that
/// composing many small steps equals one large step over the same elapsed
/// time, exactly.
pub fn damp(current: f32, target: f32, factor: f32, delta_norm: f32) -> f32 {
    let factor = factor.clamp(0.0, 1.0);
    let delta_norm = delta_norm.max(MIN_DELTA_NORM);
    let t = 1.0 - (1.0 - factor).powf(1.0 / delta_norm);
    current + (target - current) * t
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_damp_reaches_target_at_factor_one() {
        assert_eq!(damp(0.0, 5.0, 1.0, 1.0), 5.0);
    }

    #[test]
    fn test_damp_identity_at_factor_zero() {
        assert_eq!(damp(2.0, 5.0, 0.0, 1.0), 2.0);
    }

    #[test]
    fn test_damp_is_frame_rate_independent() {
        // 10 ticks of 16.67ms vs 2 ticks of 83.3ms: same total elapsed time,
        // same result.
        let factor = 0.06;

        let mut fine = 0.0_f32;
        for _ in 0..10 {
            fine = damp(fine, 1.0, factor, delta_norm(1.0 / 60.0));
        }

        let mut coarse = 0.0_f32;
        for _ in 0..2 {
            coarse = damp(coarse, 1.0, factor, delta_norm(5.0 / 60.0));
        }

        assert!(
            (fine - coarse).abs() < 1e-4,
            "fine={fine} coarse={coarse}"
        );
    }

    #[test]
    fn test_damp_slow_frame_does_not_overshoot() {
        // A pathologically slow frame clamps instead of passing the target.
        let value = damp(0.0, 1.0, 0.9, delta_norm(10.0));
        assert!(value <= 1.0);
        assert!(value > 0.9);
    }

    #[test]
    fn test_delta_norm_at_target_rate() {
        assert!((delta_norm(1.0 / 60.0) - 1.0).abs() < 1e-6);
        assert!((delta_norm(1.0 / 30.0) - 0.5).abs() < 1e-6);
        // Zero delta (first frame) falls back to 1.
        assert_eq!(delta_norm(0.0), 1.0);
    }
}
