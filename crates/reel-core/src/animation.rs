use keyframe::functions::Linear;
use keyframe::{AnimationSequence, Keyframe};

/// Straight ramp from `from` to `to` over `duration` ticks.
pub fn linear_ramp(from: f32, to: f32, duration: f64) -> AnimationSequence<f32> {
    AnimationSequence::from(vec![
        Keyframe::new(from, 0.0, Linear),
        Keyframe::new(to, duration, Linear),
    ])
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PulseConfig {
    pub pulses: f64,
    /// Radians per second.
    pub angular_velocity: f64,
    /// Phase shift in radians.
    pub phase: f64,
    /// Opacity held once the pulses are over.
    pub settle: f64,
}

impl PulseConfig {
    pub fn new(settle: f64) -> Self {
        let angular_velocity = 10.0;
        Self {
            pulses: 3.0,
            angular_velocity,
            phase: 0.25 * angular_velocity,
            settle,
        }
    }
}

/// Opacity of a pulsing object `elapsed` seconds after the pulse started.
pub fn pulse_opacity(elapsed: f64, pulse: &PulseConfig) -> f32 {
    let period = std::f64::consts::TAU / pulse.angular_velocity;
    if elapsed / period < pulse.pulses {
        (((pulse.angular_velocity * elapsed + pulse.phase).sin() + 1.0) / 2.0) as f32
    } else {
        pulse.settle as f32
    }
}

/// Outer event-horizon radius, in scene units, for dimensionless spin `a`.
pub fn outer_horizon_radius(spin: f64) -> f32 {
    (10.0 * (1.0 + (1.0 - spin * spin).max(0.0).sqrt())) as f32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ramp_interpolates_and_holds_its_end() {
        let mut ramp = linear_ramp(10.0, 0.0, 10.0);
        assert!((ramp.now() - 10.0).abs() < 1e-4);

        ramp.advance_to(5.0);
        assert!((ramp.now() - 5.0).abs() < 1e-4);

        ramp.advance_to(25.0);
        assert!(ramp.finished());
        assert!(ramp.now().abs() < 1e-4);
    }

    #[test]
    fn pulse_settles_after_configured_cycles() {
        let pulse = PulseConfig::new(0.5);
        let period = std::f64::consts::TAU / pulse.angular_velocity;

        let mid = pulse_opacity(period, &pulse);
        assert!((0.0..=1.0).contains(&mid));
        assert_eq!(pulse_opacity(period * 3.01, &pulse), 0.5);
    }

    #[test]
    fn horizon_shrinks_with_spin() {
        assert_eq!(outer_horizon_radius(0.0), 20.0);
        assert!((outer_horizon_radius(1.0) - 10.0).abs() < 1e-6);
        assert!(outer_horizon_radius(0.5) < 20.0);
    }
}
