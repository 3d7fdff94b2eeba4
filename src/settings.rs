use std::path::Path;

use faer::{MatMut, MatRef};
use serde::Deserialize;

use crate::{
    error::{AssemblyError, Result},
    filter,
};

/// The only wake convection scheme the linearisation supports: the wake shape
/// is prescribed and not convected while the Jacobians are assembled.
pub const PRESCRIBED_WAKE_SCHEME: u8 = 2;

/// Assembly settings, usually read from the `assembly` block of a YAML input file.
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default)]
pub struct AssemblySettings {
    pub vortex_core_radius: f64, // Biot-Savart cutoff radius
    pub convection_scheme: u8,   // Wake convection scheme id
    pub parallel: bool,          // Assemble output surfaces in parallel
    pub gamma_dot_filtering: usize, // Wiener window for circulation rates (0 = off)
}

impl Default for AssemblySettings {
    fn default() -> Self {
        Self {
            vortex_core_radius: 1e-6,
            convection_scheme: PRESCRIBED_WAKE_SCHEME,
            parallel: true,
            gamma_dot_filtering: 0,
        }
    }
}

impl AssemblySettings {
    pub fn from_yaml_str(yaml: &str) -> Result<Self> {
        let settings: AssemblySettings = serde_yaml::from_str(yaml)?;
        settings.validate()?;
        Ok(settings)
    }

    pub fn from_file(file_path: impl AsRef<Path>) -> Result<Self> {
        let yaml_file = std::fs::read_to_string(file_path)?;
        Self::from_yaml_str(&yaml_file)
    }

    /// Filter the circulation rates of one surface over `history` with the
    /// configured `gamma_dot_filtering` window; a no-op when filtering is off.
    pub fn filter_gamma_dot(&self, history: &[MatRef<f64>], current: MatMut<f64>) -> Result<()> {
        filter::filter_gamma_dot(history, current, self.gamma_dot_filtering)
    }

    /// Reject settings the assemblers cannot honour instead of downgrading them.
    pub fn validate(&self) -> Result<()> {
        if self.convection_scheme != PRESCRIBED_WAKE_SCHEME {
            return Err(AssemblyError::UnsupportedConfiguration(format!(
                "convection_scheme {} (only {} is supported)",
                self.convection_scheme, PRESCRIBED_WAKE_SCHEME
            )));
        }
        if !self.vortex_core_radius.is_finite() || self.vortex_core_radius < 0. {
            return Err(AssemblyError::UnsupportedConfiguration(format!(
                "vortex_core_radius {} must be finite and non-negative",
                self.vortex_core_radius
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use faer::Mat;

    #[test]
    fn test_defaults_from_empty_document() {
        let settings = AssemblySettings::from_yaml_str("{}").unwrap();
        assert_eq!(settings, AssemblySettings::default());
    }

    #[test]
    fn test_partial_document() {
        let settings = AssemblySettings::from_yaml_str(
            "vortex_core_radius: 1.0e-3\nparallel: false\ngamma_dot_filtering: 5\n",
        )
        .unwrap();
        assert_eq!(settings.vortex_core_radius, 1e-3);
        assert!(!settings.parallel);
        assert_eq!(settings.gamma_dot_filtering, 5);
        assert_eq!(settings.convection_scheme, PRESCRIBED_WAKE_SCHEME);
    }

    #[test]
    fn test_unsupported_convection_scheme() {
        let err = AssemblySettings::from_yaml_str("convection_scheme: 3").unwrap_err();
        assert!(matches!(err, AssemblyError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn test_negative_core_radius() {
        let err = AssemblySettings::from_yaml_str("vortex_core_radius: -1.0").unwrap_err();
        assert!(matches!(err, AssemblyError::UnsupportedConfiguration(_)));
    }

    #[test]
    fn test_malformed_yaml() {
        let err = AssemblySettings::from_yaml_str("parallel: [1, 2").unwrap_err();
        assert!(matches!(err, AssemblyError::Yaml(_)));
    }

    #[test]
    fn test_gamma_dot_filtering_window() {
        let history = [1., 2., 3., 4.].map(|v| Mat::from_fn(1, 1, |_, _| v));
        let history_refs = history.iter().map(|h| h.as_ref()).collect::<Vec<_>>();

        let mut current = Mat::from_fn(1, 1, |_, _| 5.);
        AssemblySettings::default()
            .filter_gamma_dot(&history_refs, current.as_mut())
            .unwrap();
        assert_eq!(current[(0, 0)], 5.);

        let settings = AssemblySettings::from_yaml_str("gamma_dot_filtering: 3").unwrap();
        settings
            .filter_gamma_dot(&history_refs, current.as_mut())
            .unwrap();
        assert!((current[(0, 0)] - (3. + 48. / 35.)).abs() < 1e-12);
    }

    #[test]
    fn test_missing_file() {
        let err = AssemblySettings::from_file("does/not/exist.yaml").unwrap_err();
        assert!(matches!(err, AssemblyError::Io(_)));
    }
}
