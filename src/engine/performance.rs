// Copyright 2024-2026 Mobile AI Core Contributors
// Licensed under the Apache License, Version 2.0

//! Performance score: a diagnostic value in `[0, 1]`.
//!
//! Computed from cheap state only. The optional latency sample comes from a
//! probe run once at initialization, never from a live request.

use std::time::Duration;

/// Base score with a hardware delegate attached.
pub const ACCELERATED_BASE: f32 = 0.8;
/// Base score on plain CPU execution.
pub const CPU_BASE: f32 = 0.6;

const PENALTY_WINDOW: Duration = Duration::from_millis(1000);
const MAX_PENALTY: f32 = 0.5;

pub fn base_score(accelerated: bool) -> f32 {
    if accelerated {
        ACCELERATED_BASE
    } else {
        CPU_BASE
    }
}

/// `base · (1 − 0.5 · min(1, latency / 1s))`, clamped to `[0, 1]`.
pub fn score(accelerated: bool, probe_latency: Option<Duration>) -> f32 {
    let base = base_score(accelerated);
    let penalty = probe_latency
        .map(|d| (d.as_secs_f32() / PENALTY_WINDOW.as_secs_f32()).min(1.0))
        .unwrap_or(0.0);
    clamp(base * (1.0 - penalty * MAX_PENALTY))
}

/// Clamp to `[0, 1]`; NaN maps to 0.
pub fn clamp(value: f32) -> f32 {
    if value.is_nan() {
        0.0
    } else {
        value.clamp(0.0, 1.0)
    }
}

/// Whole percent, truncated.
pub fn as_percent(score: f32) -> u32 {
    (clamp(score) * 100.0) as u32
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_base_scores() {
        assert_eq!(score(true, None), 0.8);
        assert_eq!(score(false, None), 0.6);
    }

    #[test]
    fn test_latency_penalty() {
        let half = score(true, Some(Duration::from_millis(500)));
        assert!((half - 0.6).abs() < 1e-6);
        let slow = score(false, Some(Duration::from_secs(30)));
        assert!((slow - 0.3).abs() < 1e-6);
        assert_eq!(score(true, Some(Duration::ZERO)), 0.8);
    }

    #[test]
    fn test_clamp_and_percent() {
        assert_eq!(clamp(f32::NAN), 0.0);
        assert_eq!(clamp(3.0), 1.0);
        assert_eq!(clamp(-1.0), 0.0);
        assert_eq!(as_percent(0.8), 80);
        assert_eq!(as_percent(0.599), 59);
    }
}
