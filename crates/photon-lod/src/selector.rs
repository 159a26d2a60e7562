//! Distance-based detail tier selection with validated switch distances.

use photon_config::{ConfigError, LodConfig};

/// Detail tier of a loaded asset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum DetailTier {
    /// Full detail.
    High,
    /// Reserved intermediate tier. Renders the full-detail tree until a
    /// dedicated medium mesh set exists.
    Medium,
    /// Reduced detail.
    Low,
}

impl DetailTier {
    /// Whether this tier renders the high-detail tree.
    pub fn shows_high_detail(self) -> bool {
        matches!(self, Self::High | Self::Medium)
    }
}

/// The two switch distances of an asset.
///
/// `near` is reserved for future tiers; `far` is where the low-detail tree
/// takes over.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LodDistances {
    near: f32,
    far: f32,
}

impl LodDistances {
    /// Create validated distances. Both must be finite and `0 < near < far`.
    pub fn new(near: f32, far: f32) -> Result<Self, ConfigError> {
        if !near.is_finite() || !far.is_finite() {
            return Err(ConfigError::invalid(
                "lod",
                format!("distances must be finite, got near={near} far={far}"),
            ));
        }
        if near <= 0.0 || near >= far {
            return Err(ConfigError::invalid(
                "lod",
                format!("distances must satisfy 0 < near < far, got near={near} far={far}"),
            ));
        }
        Ok(Self { near, far })
    }

    /// Distances taken from the `lod` section of the config.
    pub fn from_config(config: &LodConfig) -> Result<Self, ConfigError> {
        Self::new(config.near_distance, config.far_distance)
    }

    /// Reserved intermediate threshold.
    pub fn near(&self) -> f32 {
        self.near
    }

    /// Low-detail switch distance.
    pub fn far(&self) -> f32 {
        self.far
    }
}

impl Default for LodDistances {
    fn default() -> Self {
        Self {
            near: 5.0,
            far: 15.0,
        }
    }
}

/// Selects detail tiers based on distance from the camera.
pub struct LodSelector {
    distances: LodDistances,
}

impl LodSelector {
    /// Create a new selector with the given distances.
    pub fn new(distances: LodDistances) -> Self {
        Self { distances }
    }

    /// Determine the tier for an asset at the given distance from the camera.
    ///
    /// Distances are clamped at zero. Boundaries belong to the farther tier.
    pub fn select_tier(&self, distance: f32) -> DetailTier {
        let distance = distance.max(0.0);
        if distance < self.distances.near {
            DetailTier::High
        } else if distance < self.distances.far {
            DetailTier::Medium
        } else {
            DetailTier::Low
        }
    }

    /// Access the underlying distances.
    pub fn distances(&self) -> &LodDistances {
        &self.distances
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn default_selector() -> LodSelector {
        LodSelector::new(LodDistances::default())
    }

    #[test]
    fn test_zero_distance_is_high() {
        assert_eq!(default_selector().select_tier(0.0), DetailTier::High);
    }

    #[test]
    fn test_threshold_boundary_behavior() {
        let selector = default_selector();
        assert_eq!(selector.select_tier(4.999), DetailTier::High);
        assert_eq!(selector.select_tier(5.0), DetailTier::Medium);
        assert_eq!(selector.select_tier(14.999), DetailTier::Medium);
        assert_eq!(selector.select_tier(15.0), DetailTier::Low);
    }

    /// The reserved tier has no visual effect of its own.
    #[test]
    fn test_high_tree_visible_below_far_distance() {
        let selector = default_selector();
        for d in [0.0, 3.0, 5.0, 10.0, 14.9] {
            assert!(selector.select_tier(d).shows_high_detail(), "d={d}");
        }
        assert!(!selector.select_tier(15.0).shows_high_detail());
        assert!(!selector.select_tier(1_000.0).shows_high_detail());
    }

    #[test]
    fn test_negative_distance_clamps_to_high() {
        assert_eq!(default_selector().select_tier(-3.0), DetailTier::High);
    }

    #[test]
    fn test_custom_distances() {
        let selector = LodSelector::new(LodDistances::new(10.0, 40.0).unwrap());
        assert_eq!(selector.select_tier(20.0), DetailTier::Medium);
        assert_eq!(selector.select_tier(40.0), DetailTier::Low);
    }

    #[test]
    fn test_invalid_distances_are_config_errors() {
        assert!(LodDistances::new(15.0, 5.0).is_err());
        assert!(LodDistances::new(5.0, 5.0).is_err());
        assert!(LodDistances::new(0.0, 5.0).is_err());
        assert!(LodDistances::new(1.0, f32::INFINITY).is_err());
    }

    #[test]
    fn test_from_config_defaults() {
        let distances = LodDistances::from_config(&LodConfig::default()).unwrap();
        assert_eq!(distances, LodDistances::default());
    }
}
