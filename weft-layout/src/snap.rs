//! Snap-resize with hysteresis.
//!
//! A divider being dragged snaps onto nearby targets (simple fractions of
//! the span plus pane edges aligned elsewhere in the tree). The hysteresis
//! token keeps a snapped divider snapped until the desired position leaves
//! a wider release band, so a repeated small delta at the same edge can
//! never flip between two positions.

/// Snap tuning. Distances are canvas units on the 1000-unit axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapConfig {
    pub enabled: bool,
    /// Maximum distance at which a divider locks onto a target.
    pub engage: i32,
    /// Distance the desired position must move away before the lock
    /// releases. Must be greater than `engage`.
    pub release: i32,
}

impl Default for SnapConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            engage: 16,
            release: 28,
        }
    }
}

/// Hysteresis token threaded through consecutive resize calls.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SnapState {
    pub active: bool,
    pub target: i32,
}

/// Fractions of the divider span used as built-in snap targets.
const SNAP_FRACTIONS: [(i32, i32); 5] = [(1, 4), (1, 3), (1, 2), (2, 3), (3, 4)];

/// Resolve the divider position for `desired` within `[min, max]`.
///
/// `extra_targets` are additional positions (already relative to the split
/// start and within range) contributed by pane edges elsewhere in the tree.
/// Returns the position to use and the updated hysteresis state.
pub fn snap_position_with_targets(
    config: &SnapConfig,
    desired: i32,
    min: i32,
    max: i32,
    state: SnapState,
    extra_targets: &[i32],
) -> (i32, SnapState) {
    let clamped = desired.clamp(min, max.max(min));
    if !config.enabled || max <= min {
        return (clamped, SnapState::default());
    }

    let targets = collect_targets(min, max, extra_targets);
    if targets.is_empty() {
        return (clamped, SnapState::default());
    }

    // An active lock holds until the pointer escapes the release band.
    if state.active
        && targets.contains(&state.target)
        && (desired - state.target).abs() < config.release
    {
        return (state.target, state);
    }

    let nearest = targets
        .iter()
        .copied()
        .min_by_key(|t| (desired - t).abs())
        .unwrap_or(clamped);
    if (desired - nearest).abs() <= config.engage {
        return (
            nearest,
            SnapState {
                active: true,
                target: nearest,
            },
        );
    }
    (clamped, SnapState::default())
}

fn collect_targets(min: i32, max: i32, extra_targets: &[i32]) -> Vec<i32> {
    // The valid divider range [min, max] spans a split of total min+max.
    let total = min + max;
    let mut targets: Vec<i32> = SNAP_FRACTIONS
        .iter()
        .map(|&(num, den)| total * num / den)
        .filter(|&t| t >= min && t <= max)
        .collect();
    targets.extend(
        extra_targets
            .iter()
            .copied()
            .filter(|&t| t >= min && t <= max),
    );
    targets.sort_unstable();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> SnapConfig {
        SnapConfig::default()
    }

    // ==================== Engagement Tests ====================

    #[test]
    fn test_snaps_to_half_when_close() {
        // Span 1000, range [50, 950]; half target at 500.
        let (pos, state) =
            snap_position_with_targets(&config(), 508, 50, 950, SnapState::default(), &[]);
        assert_eq!(pos, 500);
        assert!(state.active);
        assert_eq!(state.target, 500);
    }

    #[test]
    fn test_no_snap_when_far_from_targets() {
        let (pos, state) =
            snap_position_with_targets(&config(), 420, 50, 950, SnapState::default(), &[]);
        assert_eq!(pos, 420);
        assert!(!state.active);
    }

    #[test]
    fn test_extra_targets_participate() {
        let (pos, state) =
            snap_position_with_targets(&config(), 615, 50, 950, SnapState::default(), &[610]);
        assert_eq!(pos, 610);
        assert!(state.active);
    }

    #[test]
    fn test_disabled_returns_clamped_desired() {
        let cfg = SnapConfig {
            enabled: false,
            ..SnapConfig::default()
        };
        let (pos, state) = snap_position_with_targets(&cfg, 2000, 50, 950, SnapState::default(), &[]);
        assert_eq!(pos, 950);
        assert!(!state.active);
    }

    #[test]
    fn test_clamps_below_min() {
        let (pos, _) = snap_position_with_targets(&config(), -50, 50, 950, SnapState::default(), &[]);
        assert!(pos >= 50);
    }

    // ==================== Hysteresis Tests ====================

    #[test]
    fn test_lock_holds_inside_release_band() {
        let state = SnapState {
            active: true,
            target: 500,
        };
        // 520 is beyond engage (16) but inside release (28): stays locked.
        let (pos, next) = snap_position_with_targets(&config(), 520, 50, 950, state, &[]);
        assert_eq!(pos, 500);
        assert!(next.active);
    }

    #[test]
    fn test_lock_releases_outside_band() {
        let state = SnapState {
            active: true,
            target: 500,
        };
        let (pos, next) = snap_position_with_targets(&config(), 540, 50, 950, state, &[]);
        assert_eq!(pos, 540);
        assert!(!next.active);
    }

    #[test]
    fn test_repeated_small_deltas_do_not_oscillate() {
        // Simulate resize calls alternating +10/-10 around a snapped divider.
        let mut state = SnapState::default();
        let mut pos = 505;
        let (p, s) = snap_position_with_targets(&config(), pos, 50, 950, state, &[]);
        pos = p;
        state = s;
        assert_eq!(pos, 500);
        let mut seen = Vec::new();
        for delta in [10, -10, 10, -10, 10, -10] {
            let desired = pos + delta;
            let (p, s) = snap_position_with_targets(&config(), desired, 50, 950, state, &[]);
            pos = p;
            state = s;
            seen.push(pos);
        }
        assert!(seen.iter().all(|&p| p == 500), "divider flickered: {:?}", seen);
    }
}
