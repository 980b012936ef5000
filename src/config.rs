//! Equalizer configuration and parameter files
//!
//! Configurations are JSON objects tagged by `type`:
//!
//! ```json
//! { "type": "zero_phase_fir", "num_bins": 1024, "channel_mode": "stereo",
//!   "filterbank": { "scale": "mel_htk", "n_filters": 40, "sample_rate": 44100 } }
//! { "type": "graphic", "scale": "third_oct", "sample_rate": 48000, "backend": "exact" }
//! ```
//!
//! Parameter files map each parameter name to a list of rows:
//! `{ "log_gains": [[0.0, 0.5, ...]] }`.

use std::collections::BTreeMap;
use std::path::Path;

use serde::{Deserialize, Serialize};
use serde_json::error::Category;
use tracing::debug;

use crate::dsp::backend::{BackendKind, BiquadBackend, DEFAULT_FSM_FIR_LEN};
use crate::dsp::equalizer::{Equalizer, GraphicEqualizer, ParameterSizes, ZeroPhaseFirEqualizer};
use crate::dsp::filterbank::{FilterbankConfig, FilterbankMatrix};
use crate::dsp::fir::{FilterbankFir, FirSynthesizer, ZeroPhaseFir, DEFAULT_FILTERBANK_EPS};
use crate::dsp::geq::GraphicEqDesigner;
use crate::dsp::midside::ChannelMode;
use crate::dsp::scale::BandLayout;
use crate::dsp::window::{WindowSpec, DEFAULT_KAISER_BETA};
use crate::engine::DEFAULT_SAMPLE_RATE;
use crate::error::{EqError, Result};

// ============================================================================
// Equalizer Configuration
// ============================================================================

/// Any equalizer this crate can build
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum EqualizerConfig {
    ZeroPhaseFir(ZeroPhaseFirConfig),
    Graphic(GraphicEqConfig),
}

/// Options of the zero-phase FIR equalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ZeroPhaseFirConfig {
    /// Number of one-sided magnitude bins K
    pub num_bins: usize,
    pub channel_mode: ChannelMode,
    /// Window name or explicit coefficients (2K − 1 values)
    pub window: WindowSpec,
    /// Kaiser shape parameter
    pub window_beta: f64,
    /// Stabilizer of the filterbank magnitude
    pub eps: f64,
    /// Parameterize by filterbank band energies instead of bins
    pub filterbank: Option<FilterbankConfig>,
}

impl Default for ZeroPhaseFirConfig {
    fn default() -> Self {
        Self {
            num_bins: 1024,
            channel_mode: ChannelMode::Mono,
            window: WindowSpec::default(),
            window_beta: DEFAULT_KAISER_BETA,
            eps: DEFAULT_FILTERBANK_EPS,
            filterbank: None,
        }
    }
}

/// Options of the graphic equalizer
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GraphicEqConfig {
    /// Band layout (`bark`, `third_oct` or a warped table)
    pub scale: BandLayout,
    pub sample_rate: f64,
    pub backend: BackendKind,
    /// FIR length of the `fsm` backend
    pub fsm_fir_len: usize,
    pub channel_mode: ChannelMode,
}

impl Default for GraphicEqConfig {
    fn default() -> Self {
        Self {
            scale: BandLayout::Bark,
            sample_rate: DEFAULT_SAMPLE_RATE as f64,
            backend: BackendKind::Fsm,
            fsm_fir_len: DEFAULT_FSM_FIR_LEN,
            channel_mode: ChannelMode::Mono,
        }
    }
}

impl EqualizerConfig {
    /// Parse a configuration from JSON text
    ///
    /// # Errors
    /// * `Configuration` - If the JSON is well formed but names an unknown
    ///   equalizer type, scale, channel mode or backend, or a value has the
    ///   wrong type
    /// * `Serialization` - If the text is not valid JSON
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| match e.classify() {
            Category::Data => EqError::config(format!("invalid equalizer config: {}", e)),
            _ => EqError::Serialization(e),
        })
    }

    /// Load a configuration from a JSON file
    ///
    /// # Errors
    /// * `Io` - If the file cannot be read
    /// * `Configuration` - If an option has an unknown or mistyped value
    /// * `Serialization` - If the JSON is malformed
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        debug!(path = %path.display(), kind = config.kind(), "loaded equalizer config");
        Ok(config)
    }

    /// Pretty-printed JSON
    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// The `type` tag
    pub fn kind(&self) -> &'static str {
        match self {
            EqualizerConfig::ZeroPhaseFir(_) => "zero_phase_fir",
            EqualizerConfig::Graphic(_) => "graphic",
        }
    }

    /// Validate the options and build the equalizer
    ///
    /// # Errors
    /// * `Configuration` - If any option is invalid or the combination is
    ///   unsupported
    pub fn build(&self) -> Result<Box<dyn Equalizer>> {
        match self {
            EqualizerConfig::ZeroPhaseFir(config) => Ok(Box::new(config.build()?)),
            EqualizerConfig::Graphic(config) => Ok(Box::new(config.build()?)),
        }
    }
}

impl ZeroPhaseFirConfig {
    pub fn build(&self) -> Result<ZeroPhaseFirEqualizer> {
        let fir = ZeroPhaseFir::new(self.num_bins, &self.window, Some(self.window_beta))?;
        let synthesizer = match &self.filterbank {
            None => FirSynthesizer::Direct(fir),
            Some(fb) => {
                let bank = FilterbankMatrix::from_config(self.num_bins, fb)?;
                FirSynthesizer::Filterbank(FilterbankFir::new(bank, fir, self.eps)?)
            }
        };
        Ok(ZeroPhaseFirEqualizer::new(synthesizer, self.channel_mode))
    }
}

impl GraphicEqConfig {
    pub fn build(&self) -> Result<GraphicEqualizer> {
        let designer = GraphicEqDesigner::new(self.scale.clone(), self.sample_rate)?;
        let backend = BiquadBackend::new(self.backend, self.fsm_fir_len)?;
        GraphicEqualizer::new(designer, backend, self.channel_mode)
    }
}

// ============================================================================
// Parameter Sets
// ============================================================================

/// Named parameter matrices, as stored in a parameter file
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSet(BTreeMap<String, Vec<Vec<f64>>>);

impl ParameterSet {
    /// All-zero parameters of the given sizes (a flat response for every
    /// equalizer in this crate)
    pub fn zeros(sizes: &ParameterSizes) -> Self {
        Self(
            sizes
                .iter()
                .map(|(name, (rows, cols))| (name.to_string(), vec![vec![0.0; cols]; rows]))
                .collect(),
        )
    }

    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Load a parameter file
    pub fn from_file(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }

    pub fn to_json_string(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Set the rows of parameter `name`
    pub fn insert(&mut self, name: &str, rows: Vec<Vec<f64>>) {
        self.0.insert(name.to_string(), rows);
    }

    pub fn get(&self, name: &str) -> Option<&[Vec<f64>]> {
        self.0.get(name).map(Vec::as_slice)
    }

    /// The rows `eq` consumes
    ///
    /// # Errors
    /// * `Shape` - If the set lacks the equalizer's parameter
    pub fn for_equalizer(&self, eq: &dyn Equalizer) -> Result<&[Vec<f64>]> {
        let sizes = eq.parameter_size();
        let (name, _) = sizes
            .iter()
            .next()
            .ok_or_else(|| EqError::config(format!("{} takes no parameters", eq.name())))?;
        self.get(name).ok_or_else(|| {
            EqError::shape(
                format!("parameter '{}'", name),
                "present",
                format!("missing (found: {})", self.0.keys().cloned().collect::<Vec<_>>().join(", ")),
            )
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::scale::FrequencyScale;
    use pretty_assertions::assert_eq;
    use tempfile::tempdir;
    use test_case::test_case;

    #[test]
    fn test_graphic_defaults() {
        let config = EqualizerConfig::from_json_str(r#"{ "type": "graphic" }"#).unwrap();
        assert_eq!(config, EqualizerConfig::Graphic(GraphicEqConfig::default()));
        let eq = config.build().unwrap();
        assert_eq!(eq.name(), "graphic");
        assert_eq!(eq.parameter_size().get("log_gains"), Some((1, 24)));
    }

    #[test]
    fn test_fir_defaults() {
        let config = EqualizerConfig::from_json_str(r#"{ "type": "zero_phase_fir" }"#).unwrap();
        let eq = config.build().unwrap();
        assert_eq!(eq.parameter_size().get("log_magnitude"), Some((1, 1024)));
    }

    #[test]
    fn test_full_fir_config() {
        let json = r#"{
            "type": "zero_phase_fir",
            "num_bins": 257,
            "channel_mode": "pseudo_midside",
            "window": "kaiser",
            "window_beta": 8.0,
            "filterbank": { "scale": "mel_htk", "n_filters": 40, "sample_rate": 16000 }
        }"#;
        let config = EqualizerConfig::from_json_str(json).unwrap();
        let EqualizerConfig::ZeroPhaseFir(fir) = &config else {
            panic!("expected a zero-phase FIR config");
        };
        assert_eq!(fir.channel_mode, ChannelMode::PseudoMidSide);
        assert_eq!(fir.eps, DEFAULT_FILTERBANK_EPS);
        let fb = fir.filterbank.as_ref().unwrap();
        assert_eq!(fb.scale, FrequencyScale::MelHtk);
        assert_eq!(fb.f_min, 40.0);

        let eq = config.build().unwrap();
        assert_eq!(eq.parameter_size().get("log_energy"), Some((2, 40)));
    }

    #[test]
    fn test_explicit_window_array() {
        let json = r#"{ "type": "zero_phase_fir", "num_bins": 3, "window": [0.5, 1.0, 1.0, 1.0, 0.5] }"#;
        let config = EqualizerConfig::from_json_str(json).unwrap();
        assert!(config.build().is_ok());

        let json = r#"{ "type": "zero_phase_fir", "num_bins": 3, "window": [0.5, 1.0, 0.5] }"#;
        let err = EqualizerConfig::from_json_str(json).unwrap().build().err().unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test]
    fn test_warped_layout_and_exact_alias() {
        let json = r#"{
            "type": "graphic",
            "scale": { "warped": { "scale": "log", "n_bands": 10, "f_min": 31.25, "f_max": 16000.0 } },
            "backend": "lfilter",
            "sample_rate": 48000,
            "channel_mode": "midside"
        }"#;
        let config = EqualizerConfig::from_json_str(json).unwrap();
        let EqualizerConfig::Graphic(geq) = &config else {
            panic!("expected a graphic config");
        };
        assert_eq!(geq.backend, BackendKind::Exact);
        let eq = config.build().unwrap();
        assert_eq!(eq.parameter_size().get("log_gains"), Some((2, 10)));
    }

    #[test]
    fn test_round_trip() {
        let config = EqualizerConfig::Graphic(GraphicEqConfig {
            scale: BandLayout::ThirdOct,
            sample_rate: 48000.0,
            backend: BackendKind::Exact,
            fsm_fir_len: 2048,
            channel_mode: ChannelMode::Stereo,
        });
        let json = config.to_json_string().unwrap();
        assert!(json.contains("\"type\": \"graphic\""));
        assert_eq!(EqualizerConfig::from_json_str(&json).unwrap(), config);
    }

    #[test]
    fn test_invalid_configs() {
        let err = EqualizerConfig::from_json_str(r#"{ "type": "parametric" }"#).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let err = EqualizerConfig::from_json_str(r#"{ "type": "graphic", "#).unwrap_err();
        assert_eq!(err.error_code(), "SERIALIZATION_ERROR");

        let err = EqualizerConfig::from_json_str(
            r#"{ "type": "graphic", "backend": "exact", "channel_mode": "pseudo_midside" }"#,
        )
        .unwrap()
        .build()
        .err()
        .unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(!err.is_recoverable());

        let err = EqualizerConfig::from_json_str(r#"{ "type": "graphic", "fsm_fir_len": 2 }"#)
            .unwrap()
            .build()
            .err()
            .unwrap();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
    }

    #[test_case(r#"{ "type": "graphic", "scale": "octave" }"# ; "unknown band layout")]
    #[test_case(r#"{ "type": "zero_phase_fir", "filterbank": { "scale": "mel_foo", "sample_rate": 44100 } }"# ; "unknown filterbank scale")]
    #[test_case(r#"{ "type": "zero_phase_fir", "channel_mode": "surround" }"# ; "unknown channel mode")]
    #[test_case(r#"{ "type": "graphic", "backend": "iir" }"# ; "unknown backend")]
    #[test_case(r#"{ "type": "graphic", "sample_rate": "fast" }"# ; "mistyped value")]
    fn test_unknown_option_values_are_configuration_errors(json: &str) {
        let err = EqualizerConfig::from_json_str(json).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");
        assert!(!err.is_recoverable());
    }

    #[test]
    fn test_load_from_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("eq.json");
        std::fs::write(&path, r#"{ "type": "graphic", "scale": "third_octave" }"#).unwrap();
        let config = EqualizerConfig::from_file(&path).unwrap();
        assert_eq!(config.build().unwrap().parameter_size().get("log_gains"), Some((1, 31)));

        let missing = dir.path().join("missing.json");
        assert_eq!(
            EqualizerConfig::from_file(&missing).unwrap_err().error_code(),
            "IO_ERROR"
        );
    }

    #[test]
    fn test_parameter_set_lookup() {
        let eq = EqualizerConfig::Graphic(GraphicEqConfig::default()).build().unwrap();
        let zeros = ParameterSet::zeros(&eq.parameter_size());
        assert_eq!(zeros.for_equalizer(eq.as_ref()).unwrap(), &[vec![0.0; 24]][..]);

        let json = zeros.to_json_string().unwrap();
        assert_eq!(ParameterSet::from_json_str(&json).unwrap(), zeros);

        let mut other = ParameterSet::default();
        other.insert("log_magnitude", vec![vec![0.0; 4]]);
        let err = other.for_equalizer(eq.as_ref()).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_ERROR");
    }
}
