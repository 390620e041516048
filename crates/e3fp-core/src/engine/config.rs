use crate::core::models::fingerprint::RepresentationKind;
use thiserror::Error;

pub const DEFAULT_SHELL_RADIUS: f64 = 2.0;

#[derive(Debug, Error, PartialEq, Clone)]
pub enum ConfigError {
    #[error("Invalid parameter '{name}': {reason}")]
    InvalidParameter {
        name: &'static str,
        reason: String,
    },
}

/// Immutable fingerprinting parameters, constructed once per batch run and
/// reused for every molecule.
#[derive(Debug, Clone, PartialEq)]
pub struct FingerprintingConfig {
    /// Maximum iteration level, or `None` to run until the engine reports
    /// natural termination (shell growth stabilized).
    pub max_level: Option<usize>,
    /// Distance by which each atom's shell radius grows per level, starting
    /// at 0.0. Must be positive and finite.
    pub shell_radius: f64,
    /// Bit-presence or occurrence-count representation.
    pub kind: RepresentationKind,
    /// Differentiate shells by stereochemistry.
    pub stereo: bool,
    /// Hash atoms that are not bond-connected to the shell center. On by
    /// default; turning it off is a debugging knob that makes the 3D
    /// fingerprint behave more like its 2D counterpart.
    pub include_disconnected: bool,
    /// Retain the identifier-to-substructure map inside each fingerprint.
    /// Drastically increases fingerprint size.
    pub retain_substructures: bool,
}

impl Default for FingerprintingConfig {
    fn default() -> Self {
        Self {
            max_level: None,
            shell_radius: DEFAULT_SHELL_RADIUS,
            kind: RepresentationKind::Bits,
            stereo: false,
            include_disconnected: true,
            retain_substructures: false,
        }
    }
}

impl FingerprintingConfig {
    pub fn builder() -> FingerprintingConfigBuilder {
        FingerprintingConfigBuilder::default()
    }
}

#[derive(Debug, Default)]
pub struct FingerprintingConfigBuilder {
    max_level: Option<Option<usize>>,
    shell_radius: Option<f64>,
    kind: Option<RepresentationKind>,
    stereo: Option<bool>,
    include_disconnected: Option<bool>,
    retain_substructures: Option<bool>,
}

impl FingerprintingConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Caps the iteration level; `None` means run to natural termination.
    pub fn max_level(mut self, level: Option<usize>) -> Self {
        self.max_level = Some(level);
        self
    }

    pub fn shell_radius(mut self, radius: f64) -> Self {
        self.shell_radius = Some(radius);
        self
    }

    pub fn kind(mut self, kind: RepresentationKind) -> Self {
        self.kind = Some(kind);
        self
    }

    pub fn stereo(mut self, stereo: bool) -> Self {
        self.stereo = Some(stereo);
        self
    }

    pub fn include_disconnected(mut self, include: bool) -> Self {
        self.include_disconnected = Some(include);
        self
    }

    pub fn retain_substructures(mut self, retain: bool) -> Self {
        self.retain_substructures = Some(retain);
        self
    }

    pub fn build(self) -> Result<FingerprintingConfig, ConfigError> {
        let defaults = FingerprintingConfig::default();
        let shell_radius = self.shell_radius.unwrap_or(defaults.shell_radius);
        if !shell_radius.is_finite() || shell_radius <= 0.0 {
            return Err(ConfigError::InvalidParameter {
                name: "shell_radius",
                reason: format!("must be a positive finite number, got {shell_radius}"),
            });
        }

        Ok(FingerprintingConfig {
            max_level: self.max_level.unwrap_or(defaults.max_level),
            shell_radius,
            kind: self.kind.unwrap_or(defaults.kind),
            stereo: self.stereo.unwrap_or(defaults.stereo),
            include_disconnected: self
                .include_disconnected
                .unwrap_or(defaults.include_disconnected),
            retain_substructures: self
                .retain_substructures
                .unwrap_or(defaults.retain_substructures),
        })
    }
}
