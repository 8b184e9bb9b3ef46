//! Scalar shaping helpers shared by the control components.

/// Sign of `x` as -1, 0 or 1.
#[inline]
pub fn sign(x: f32) -> f32 {
    if x > 0.0 {
        1.0
    } else if x < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Move `value` towards `target` by at most `step`.
#[inline]
pub fn rate_limit(value: &mut f32, target: f32, step: f32) {
    let diff = target - *value;
    if diff.abs() <= step {
        *value = target;
    } else {
        *value += step * sign(diff);
    }
}

/// Move `value` towards `target` with an eased step.
///
/// Far from the target `ramped_step` accelerates towards `step` per tick.
/// Within `center_window` of the target it shrinks with the remaining
/// distance, so the value settles without overshoot.
pub fn smooth_ramp(
    value: &mut f32,
    ramped_step: &mut f32,
    target: f32,
    step: f32,
    smoothing: f32,
    center_window: f32,
) {
    let diff = target - *value;
    if diff.abs() < center_window {
        *ramped_step = smoothing * step * (diff / 2.0) + (1.0 - smoothing) * *ramped_step;
        let centering = ramped_step.abs().min((diff / 2.0).abs() * step) * sign(diff);
        if diff.abs() < centering.abs() {
            *value = target;
        } else {
            *value += centering;
        }
    } else {
        *ramped_step = smoothing * step * sign(diff) + (1.0 - smoothing) * *ramped_step;
        *value += *ramped_step;
    }
}

/// Linear map of `v` from `[x1, x2]` to `[y1, y2]`, unclamped.
///
/// A degenerate input range yields `y1`.
#[inline]
pub fn lerp(x1: f32, x2: f32, y1: f32, y2: f32, v: f32) -> f32 {
    if x1 == x2 {
        return y1;
    }
    y1 + (v - x1) * (y2 - y1) / (x2 - x1)
}

/// One step of an exponential moving average with weight `alpha` on `sample`.
#[inline]
pub fn ema(prev: f32, sample: f32, alpha: f32) -> f32 {
    prev + alpha * (sample - prev)
}
