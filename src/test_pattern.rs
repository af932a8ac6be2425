//! Procedural RGBA test patterns.
//!
//! Stands in for real video and preview media in the native demo, so the
//! carousel can run without network access or a decoder. Each item gets a
//! visually distinct pattern keyed by its position.

/// Generate one RGBA8 frame of a test pattern.
///
/// `variant` selects the pattern family (keyed by item position); `phase`
/// advances it over time so video stand-ins visibly animate.
pub fn generate_rgba(width: u32, height: u32, variant: usize, phase: f32) -> Vec<u8> {
    let mut data = Vec::with_capacity((width * height * 4) as usize);
    for y in 0..height {
        for x in 0..width {
            let fx = x as f32 / width as f32;
            let fy = y as f32 / height as f32;
            let value = pattern_pixel(variant, fx, fy, phase);
            let (r, g, b) = tint(variant, value);
            data.extend_from_slice(&[r, g, b, 255]);
        }
    }
    data
}

fn pattern_pixel(variant: usize, fx: f32, fy: f32, phase: f32) -> f32 {
    match variant % 4 {
        // Scrolling diagonal gradient.
        0 => ((fx + fy + phase * 0.1) % 1.0 + 1.0) % 1.0,

        // Drifting checkerboard.
        1 => {
            let checker =
                (((fx * 8.0 + phase * 0.5) as i32) + ((fy * 8.0) as i32)) % 2 == 0;
            if checker {
                0.8
            } else {
                0.2
            }
        }

        // Pulsing radial gradient.
        2 => {
            let cx = fx - 0.5;
            let cy = fy - 0.5;
            let dist = (cx * cx + cy * cy).sqrt();
            let radius = 0.35 + 0.15 * phase.sin();
            (1.0 - dist / radius).clamp(0.0, 1.0)
        }

        // Expanding concentric rings.
        _ => {
            let cx = fx - 0.5;
            let cy = fy - 0.5;
            let dist = (cx * cx + cy * cy).sqrt();
            ((dist * 20.0 - phase * 2.0).sin() * 0.5 + 0.5).clamp(0.0, 1.0)
        }
    }
}

/// Per-variant color tint so neighboring items are distinguishable at a
/// glance.
fn tint(variant: usize, value: f32) -> (u8, u8, u8) {
    let v = (value * 255.0) as u8;
    match variant % 3 {
        0 => (v, v / 2, v / 3),
        1 => (v / 3, v, v / 2),
        _ => (v / 2, v / 3, v),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_frame_has_expected_size_and_opaque_alpha() {
        let data = generate_rgba(8, 4, 0, 0.0);
        assert_eq!(data.len(), 8 * 4 * 4);
        assert!(data.chunks(4).all(|px| px[3] == 255));
    }

    #[test]
    fn test_phase_animates_the_frame() {
        let a = generate_rgba(16, 16, 0, 0.0);
        let b = generate_rgba(16, 16, 0, 3.0);
        assert_ne!(a, b);
    }

    #[test]
    fn test_variants_differ() {
        let a = generate_rgba(16, 16, 0, 0.5);
        let b = generate_rgba(16, 16, 1, 0.5);
        assert_ne!(a, b);
    }
}
