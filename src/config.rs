//! # Configuration
//!
//! Static configuration for the placement demo: which device capabilities the immersive session
//! asks for, where the status panel sits relative to the viewer, and which geometry/material
//! templates are used for the reticle and for placed objects.
//!
//! All values are plain Rust structs with [`Default`] implementations describing the stock demo.
//! The application shell builds an [`ArConfig`] once at startup and hands it to the
//! [`FrameLoop`](crate::FrameLoop) and to the session affordance.

use crate::error::{ArError, Result};
use crate::scene::{Geometry, Material};

/// A device capability that can be requested for an immersive session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Feature {
    /// Real-world surface hit testing.
    HitTest,
    /// Overlaying a DOM element from the host page on top of the session.
    DomOverlay,
    /// A stable `local` tracking space.
    Local,
    /// A `local-floor` tracking space.
    LocalFloor,
}

impl Feature {
    /// The feature descriptor string understood by the device.
    pub fn as_str(&self) -> &'static str {
        match self {
            Feature::HitTest => "hit-test",
            Feature::DomOverlay => "dom-overlay",
            Feature::Local => "local",
            Feature::LocalFloor => "local-floor",
        }
    }
}

/// Overlay configuration: the id of the host page element shown on top of the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DomOverlay {
    pub root: String,
}

/// Session configuration handed to the device when requesting an immersive AR session.
///
/// Mirrors the `{ requiredFeatures, optionalFeatures, domOverlay: { root } }` dictionary of the
/// device API. A session that cannot satisfy `required_features` is never started.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionConfig {
    pub required_features: Vec<Feature>,
    pub optional_features: Vec<Feature>,
    pub dom_overlay: Option<DomOverlay>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            required_features: vec![Feature::HitTest],
            optional_features: vec![Feature::DomOverlay],
            dom_overlay: Some(DomOverlay {
                root: "overlay".to_string(),
            }),
        }
    }
}

impl SessionConfig {
    /// Checks that the configuration can drive the placement controller.
    ///
    /// Hit testing must be a required feature, and listing `dom-overlay` (required or optional)
    /// needs an overlay root element.
    pub fn validate(&self) -> Result<()> {
        if !self.required_features.contains(&Feature::HitTest) {
            return Err(ArError::Configuration(
                "required features must include hit-test".to_string(),
            ));
        }

        let wants_overlay = self
            .required_features
            .iter()
            .chain(self.optional_features.iter())
            .any(|feature| *feature == Feature::DomOverlay);
        let has_root = self
            .dom_overlay
            .as_ref()
            .is_some_and(|overlay| !overlay.root.is_empty());
        if wants_overlay && !has_root {
            return Err(ArError::Configuration(
                "dom-overlay requested without an overlay root".to_string(),
            ));
        }

        Ok(())
    }

    /// The configuration to request on a page where the overlay root element is, or is not,
    /// `present`.
    ///
    /// A missing root is an error only when `dom-overlay` is required. An optional overlay is
    /// dropped from the request instead, so the session can still start without it.
    pub fn for_page(&self, overlay_root_present: bool) -> Result<SessionConfig> {
        self.validate()?;
        let Some(overlay) = self.dom_overlay.as_ref().filter(|_| !overlay_root_present) else {
            return Ok(self.clone());
        };

        if self.required_features.contains(&Feature::DomOverlay) {
            return Err(ArError::Configuration(format!(
                "overlay root #{} not found",
                overlay.root
            )));
        }
        log::warn!(
            "Overlay root #{} not found; requesting the session without dom-overlay",
            overlay.root
        );
        let mut config = self.clone();
        config
            .optional_features
            .retain(|feature| *feature != Feature::DomOverlay);
        config.dom_overlay = None;
        Ok(config)
    }

    pub fn required_feature_names(&self) -> Vec<&'static str> {
        self.required_features.iter().map(Feature::as_str).collect()
    }

    pub fn optional_feature_names(&self) -> Vec<&'static str> {
        self.optional_features.iter().map(Feature::as_str).collect()
    }
}

/// Geometry and material used to instantiate a mesh node.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ObjectTemplate {
    pub geometry: Geometry,
    pub material: Material,
}

impl ObjectTemplate {
    /// A flat ring lying in the surface plane.
    pub fn reticle() -> Self {
        Self {
            geometry: Geometry::Ring {
                inner_radius: 0.15,
                outer_radius: 0.2,
                segments: 32,
            },
            material: Material {
                color: [1.0, 1.0, 1.0, 1.0],
            },
        }
    }

    pub fn placed_object() -> Self {
        Self {
            geometry: Geometry::Cuboid {
                size: [0.1, 0.1, 0.1],
            },
            material: Material {
                color: [0.2, 0.6, 1.0, 1.0],
            },
        }
    }
}

/// Top-level configuration of the placement demo.
#[derive(Debug, Clone, PartialEq)]
pub struct ArConfig {
    pub session: SessionConfig,
    /// Local offset of the status panel relative to the camera, in meters.
    pub panel_offset: nalgebra_glm::Vec3,
    pub reticle: ObjectTemplate,
    pub placed_object: ObjectTemplate,
}

impl Default for ArConfig {
    fn default() -> Self {
        Self {
            session: SessionConfig::default(),
            panel_offset: nalgebra_glm::vec3(0.0, -0.15, -0.8),
            reticle: ObjectTemplate::reticle(),
            placed_object: ObjectTemplate::placed_object(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_session_config_is_valid() {
        let config = SessionConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.required_feature_names(), vec!["hit-test"]);
        assert_eq!(config.optional_feature_names(), vec!["dom-overlay"]);
    }

    #[test]
    fn test_hit_test_must_be_required() {
        let config = SessionConfig {
            required_features: vec![Feature::Local],
            optional_features: vec![Feature::HitTest],
            dom_overlay: None,
        };
        assert!(matches!(config.validate(), Err(ArError::Configuration(_))));
    }

    #[test]
    fn test_missing_optional_overlay_is_dropped() {
        let config = SessionConfig::default();

        assert_eq!(config.for_page(true), Ok(config.clone()));

        let without = config.for_page(false).expect("overlay is optional");
        assert_eq!(without.optional_feature_names(), Vec::<&str>::new());
        assert_eq!(without.required_feature_names(), vec!["hit-test"]);
        assert!(without.dom_overlay.is_none());
        assert!(without.validate().is_ok());
    }

    #[test]
    fn test_missing_required_overlay_is_an_error() {
        let config = SessionConfig {
            required_features: vec![Feature::HitTest, Feature::DomOverlay],
            optional_features: Vec::new(),
            ..SessionConfig::default()
        };

        assert!(config.for_page(true).is_ok());
        assert!(matches!(
            config.for_page(false),
            Err(ArError::Configuration(_))
        ));
    }

    #[test]
    fn test_overlay_needs_root() {
        let mut config = SessionConfig::default();
        config.dom_overlay = None;
        assert!(config.validate().is_err());

        config.dom_overlay = Some(DomOverlay {
            root: String::new(),
        });
        assert!(config.validate().is_err());

        config.optional_features.clear();
        assert!(config.validate().is_ok());
    }
}
