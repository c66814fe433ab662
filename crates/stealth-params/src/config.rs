//! JSON configuration

use crate::identity::{DecoyIdentity, ProtectedSurface};
use crate::timing::{
    TimingParams, DEFAULT_BLUR_GRACE_MS, DEFAULT_DOUBLE_ACTIVATION_WINDOW_MS,
    DEFAULT_NOTIFICATION_DISPLAY_MS,
};
use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::Path;
use std::time::Duration;

/// Argon2id cost parameters for the passcode verifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinKdfParams {
    /// Memory cost in KiB
    pub memory_kib: u32,
    /// Iterations
    pub iterations: u32,
    /// Lanes
    pub lanes: u32,
}

impl Default for PinKdfParams {
    fn default() -> Self {
        // 16 MiB, 2 iterations, 2 lanes
        Self {
            memory_kib: 16_384,
            iterations: 2,
            lanes: 2,
        }
    }
}

/// One protected surface and the identity covering it
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SurfaceConfig {
    /// Surface being hidden
    pub surface: ProtectedSurface,
    /// Decoy identity; falls back to the surface default
    #[serde(default)]
    pub identity: Option<DecoyIdentity>,
    /// Replacement for the identity's cover title
    #[serde(default)]
    pub title: Option<String>,
}

impl SurfaceConfig {
    /// Config for `surface` with its default identity
    pub fn new(surface: ProtectedSurface) -> Self {
        Self {
            surface,
            identity: None,
            title: None,
        }
    }

    /// Effective identity
    pub fn identity(&self) -> DecoyIdentity {
        self.identity
            .unwrap_or_else(|| self.surface.default_identity())
    }

    /// Effective cover title
    pub fn cover_title(&self) -> String {
        self.title
            .clone()
            .unwrap_or_else(|| self.identity().cover_title().to_string())
    }
}

/// Top-level stealth configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StealthConfig {
    /// Blur grace period in milliseconds
    pub blur_grace_ms: u64,
    /// Secret trigger window in milliseconds
    pub double_activation_window_ms: u64,
    /// Camouflaged notification lifetime in milliseconds
    pub notification_display_ms: u64,
    /// Inactivity re-lock in milliseconds, disabled when absent
    pub idle_relock_after_ms: Option<u64>,
    /// Passcode hashing cost
    pub pin_kdf: PinKdfParams,
    /// Protected surfaces
    pub surfaces: Vec<SurfaceConfig>,
}

impl Default for StealthConfig {
    fn default() -> Self {
        Self {
            blur_grace_ms: DEFAULT_BLUR_GRACE_MS,
            double_activation_window_ms: DEFAULT_DOUBLE_ACTIVATION_WINDOW_MS,
            notification_display_ms: DEFAULT_NOTIFICATION_DISPLAY_MS,
            idle_relock_after_ms: None,
            pin_kdf: PinKdfParams::default(),
            surfaces: vec![
                SurfaceConfig::new(ProtectedSurface::Vault),
                SurfaceConfig::new(ProtectedSurface::Messaging),
            ],
        }
    }
}

impl StealthConfig {
    /// Load and validate a JSON config file
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    /// Parse and validate a JSON config string
    pub fn from_json(raw: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configs the controller cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.blur_grace_ms == 0 {
            return Err(Error::InvalidConfig("blur_grace_ms must be positive".to_string()));
        }
        if self.double_activation_window_ms == 0 {
            return Err(Error::InvalidConfig(
                "double_activation_window_ms must be positive".to_string(),
            ));
        }
        if self.notification_display_ms == 0 {
            return Err(Error::InvalidConfig(
                "notification_display_ms must be positive".to_string(),
            ));
        }
        if self.idle_relock_after_ms == Some(0) {
            return Err(Error::InvalidConfig(
                "idle_relock_after_ms must be positive when set".to_string(),
            ));
        }
        if self.surfaces.is_empty() {
            return Err(Error::InvalidConfig("no protected surfaces configured".to_string()));
        }

        let mut surfaces = HashSet::new();
        let mut identities = HashSet::new();
        for surface in &self.surfaces {
            if !surfaces.insert(surface.surface) {
                return Err(Error::InvalidConfig(format!(
                    "surface {} configured twice",
                    surface.surface
                )));
            }
            // Two surfaces behind the same cover would be interchangeable.
            if !identities.insert(surface.identity()) {
                return Err(Error::InvalidConfig(format!(
                    "identity {} shared by several surfaces",
                    surface.identity()
                )));
            }
        }

        Ok(())
    }

    /// Resolved timing parameters
    pub fn timing(&self) -> TimingParams {
        TimingParams {
            blur_grace: Duration::from_millis(self.blur_grace_ms),
            double_activation_window: Duration::from_millis(self.double_activation_window_ms),
            notification_display: Duration::from_millis(self.notification_display_ms),
            idle_relock_after: self.idle_relock_after_ms.map(Duration::from_millis),
        }
    }

    /// Config entry for `surface`
    pub fn surface(&self, surface: ProtectedSurface) -> Option<&SurfaceConfig> {
        self.surfaces.iter().find(|s| s.surface == surface)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_default_config_is_valid() {
        let config = StealthConfig::default();
        config.validate().unwrap();
        assert_eq!(config.timing(), TimingParams::default());
        assert_eq!(config.surfaces.len(), 2);
    }

    #[test]
    fn test_partial_json_takes_defaults() {
        let config = StealthConfig::from_json(r#"{ "blur_grace_ms": 10000 }"#).unwrap();
        assert_eq!(config.timing().blur_grace, Duration::from_secs(10));
        assert_eq!(config.double_activation_window_ms, 500);
        assert_eq!(config.pin_kdf, PinKdfParams::default());
    }

    #[test]
    fn test_shared_identity_rejected() {
        let raw = r#"{
            "surfaces": [
                { "surface": "vault", "identity": "notes" },
                { "surface": "messaging" }
            ]
        }"#;
        assert!(matches!(
            StealthConfig::from_json(raw),
            Err(Error::InvalidConfig(_))
        ));
    }

    #[test]
    fn test_zero_window_rejected() {
        assert!(StealthConfig::from_json(r#"{ "double_activation_window_ms": 0 }"#).is_err());
        assert!(StealthConfig::from_json(r#"{ "idle_relock_after_ms": 0 }"#).is_err());
        assert!(StealthConfig::from_json(r#"{ "surfaces": [] }"#).is_err());
    }

    #[test]
    fn test_title_override() {
        let raw = r#"{ "surfaces": [ { "surface": "vault", "title": "Morning Paper" } ] }"#;
        let config = StealthConfig::from_json(raw).unwrap();
        let vault = config.surface(ProtectedSurface::Vault).unwrap();
        assert_eq!(vault.identity(), DecoyIdentity::NewsReader);
        assert_eq!(vault.cover_title(), "Morning Paper");
        assert!(config.surface(ProtectedSurface::Messaging).is_none());
    }

    #[test]
    fn test_load_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{ "idle_relock_after_ms": 120000 }}"#).unwrap();

        let config = StealthConfig::load(file.path()).unwrap();
        assert_eq!(
            config.timing().idle_relock_after,
            Some(Duration::from_secs(120))
        );
    }
}
