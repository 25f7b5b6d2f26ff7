//! Euclidean pattern generation and rotation.
//!
//! Step `i` is a pulse iff `floor(i * pulses / steps)` differs from
//! `floor((i - 1) * pulses / steps)`, which spreads the pulses as evenly as
//! possible and always puts one on step 0 when there is at least one pulse.

/// Generate the canonical, unrotated pattern. `pulses` above `steps` is clamped.
pub fn generate(steps: usize, pulses: usize) -> Vec<bool> {
    if steps == 0 {
        return Vec::new();
    }
    let pulses = pulses.min(steps) as i64;
    let steps_i = steps as i64;
    let bucket = |i: i64| (i * pulses).div_euclid(steps_i);
    (0..steps_i).map(|i| bucket(i) != bucket(i - 1)).collect()
}

/// Rotate left by `rotation mod len`. Negative rotations rotate right.
pub fn rotate(pattern: &[bool], rotation: i64) -> Vec<bool> {
    let mut rotated = pattern.to_vec();
    if !rotated.is_empty() {
        let shift = rotation.rem_euclid(rotated.len() as i64) as usize;
        rotated.rotate_left(shift);
    }
    rotated
}

/// Number of pulses in a pattern.
pub fn pulse_count(pattern: &[bool]) -> usize {
    pattern.iter().filter(|&&on| on).count()
}

/// Render as `x` for pulses and `.` for rests.
pub fn to_ascii(pattern: &[bool]) -> String {
    pattern.iter().map(|&on| if on { 'x' } else { '.' }).collect()
}
