//! Equalizer façades
//!
//! Each equalizer owns everything built at construction (synthesizer or band
//! table, backend, channel strategy) and maps `(input, params)` to an output
//! buffer of the same shape. Parameters are a matrix of rows: one row for
//! [`ChannelMode::Mono`], two rows (left/right or mid/side) otherwise.

use std::collections::BTreeMap;

use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::backend::{fsm_kernel, BiquadBackend};
use super::biquad::BiquadCascade;
use super::convolution::{convolve, ConvolutionMode};
use super::fir::FirSynthesizer;
use super::geq::GraphicEqDesigner;
use super::midside::{lr_to_ms, ms_to_lr, ms_to_lr_kernels, ChannelMode};
use crate::engine::AudioBuffer;
use crate::error::{EqError, Result};

// ============================================================================
// Common Types
// ============================================================================

/// Expected (rows, cols) of every parameter, keyed by name
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterSizes(BTreeMap<String, (usize, usize)>);

impl ParameterSizes {
    /// Sizes for an equalizer with a single parameter matrix
    pub fn single(name: &str, rows: usize, cols: usize) -> Self {
        let mut sizes = BTreeMap::new();
        sizes.insert(name.to_string(), (rows, cols));
        Self(sizes)
    }

    /// Shape of the parameter `name`
    pub fn get(&self, name: &str) -> Option<(usize, usize)> {
        self.0.get(name).copied()
    }

    /// Iterate over (name, shape) pairs in name order
    pub fn iter(&self) -> impl Iterator<Item = (&str, (usize, usize))> {
        self.0.iter().map(|(name, shape)| (name.as_str(), *shape))
    }
}

/// The concrete filters an equalizer would apply for a parameter set
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "filters", rename_all = "snake_case")]
pub enum FilterDesign {
    /// One symmetric FIR kernel per parameter row
    Fir(Vec<Vec<f64>>),
    /// One biquad cascade per parameter row
    Biquad(Vec<BiquadCascade>),
}

impl FilterDesign {
    /// Number of filters in the design
    pub fn len(&self) -> usize {
        match self {
            FilterDesign::Fir(kernels) => kernels.len(),
            FilterDesign::Biquad(cascades) => cascades.len(),
        }
    }

    /// Check if the design holds no filter
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Common interface of all equalizers
pub trait Equalizer: Send + Sync {
    /// Short identifier of the equalizer type
    fn name(&self) -> &'static str;

    /// Channel mode fixed at construction
    fn channel_mode(&self) -> ChannelMode;

    /// Expected shape of every parameter
    fn parameter_size(&self) -> ParameterSizes;

    /// Compute the filters for `params` without applying them
    ///
    /// # Errors
    /// * `Shape` - If `params` does not match [`Equalizer::parameter_size`]
    /// * `NumericDomain` - If a parameter is non-finite or overflows
    fn design(&self, params: &[Vec<f64>]) -> Result<FilterDesign>;

    /// Filter `input` with the filters designed from `params`
    ///
    /// # Errors
    /// * `Shape` - If the input channel count or the parameter shape is wrong
    /// * `NumericDomain` - If a parameter is non-finite or overflows
    fn process(&self, input: &AudioBuffer, params: &[Vec<f64>]) -> Result<AudioBuffer>;

    /// Like [`Equalizer::process`], writing into an existing buffer of the
    /// input's shape. `output` is left untouched when an error is returned.
    fn process_into(
        &self,
        input: &AudioBuffer,
        params: &[Vec<f64>],
        output: &mut AudioBuffer,
    ) -> Result<()> {
        if output.shape() != input.shape() {
            return Err(EqError::shape(
                "output buffer",
                format!("{:?}", input.shape()),
                format!("{:?}", output.shape()),
            ));
        }
        let processed = self.process(input, params)?;
        for (dst, src) in output.samples.iter_mut().zip(processed.samples) {
            dst.copy_from_slice(&src);
        }
        output.sample_rate = processed.sample_rate;
        Ok(())
    }
}

/// Process independent (input, params) items in parallel
///
/// Returns one result per item in input order; a failing item does not
/// affect the others.
pub fn process_batch<E>(eq: &E, items: &[(AudioBuffer, Vec<Vec<f64>>)]) -> Vec<Result<AudioBuffer>>
where
    E: Equalizer + ?Sized,
{
    items
        .par_iter()
        .map(|(input, params)| eq.process(input, params))
        .collect()
}

// ============================================================================
// Channel Strategy
// ============================================================================

/// Channel mode resolved into the processing path
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ChannelStrategy {
    /// Filters applied to the channels as given (mono and stereo)
    Direct,
    /// Signal converted to mid/side around the filter
    MidSide,
    /// Filter pair converted to left/right, signal untouched
    PseudoMidSide,
}

impl From<ChannelMode> for ChannelStrategy {
    fn from(mode: ChannelMode) -> Self {
        match mode {
            ChannelMode::Mono | ChannelMode::Stereo => ChannelStrategy::Direct,
            ChannelMode::MidSide => ChannelStrategy::MidSide,
            ChannelMode::PseudoMidSide => ChannelStrategy::PseudoMidSide,
        }
    }
}

impl ChannelStrategy {
    /// Run `filter` on the signal representation this strategy works in
    fn run<F>(&self, input: &AudioBuffer, filter: F) -> Result<AudioBuffer>
    where
        F: FnOnce(&AudioBuffer) -> Result<AudioBuffer>,
    {
        match self {
            ChannelStrategy::Direct | ChannelStrategy::PseudoMidSide => filter(input),
            ChannelStrategy::MidSide => ms_to_lr(&filter(&lr_to_ms(input)?)?),
        }
    }
}

fn check_input(mode: ChannelMode, input: &AudioBuffer) -> Result<()> {
    match mode.required_channels() {
        Some(channels) if input.channels() != channels => Err(EqError::shape(
            format!("input channels ({} mode)", mode),
            channels,
            input.channels(),
        )),
        _ => Ok(()),
    }
}

fn check_params(name: &str, params: &[Vec<f64>], rows: usize, cols: usize) -> Result<()> {
    if params.len() != rows {
        return Err(EqError::shape(format!("{} rows", name), rows, params.len()));
    }
    for (i, row) in params.iter().enumerate() {
        if row.len() != cols {
            return Err(EqError::shape(format!("{}[{}]", name, i), cols, row.len()));
        }
    }
    Ok(())
}

fn mix_pseudo_midside(kernels: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
    match kernels {
        [mid, side] => Ok(ms_to_lr_kernels(mid, side)?.into()),
        _ => Err(EqError::shape("mid/side kernels", 2, kernels.len())),
    }
}

// ============================================================================
// Zero-Phase FIR Equalizer
// ============================================================================

/// Equalizer driven by a log-magnitude (or filterbank log-energy) per row,
/// applied by zero-phase convolution
#[derive(Debug, Clone)]
pub struct ZeroPhaseFirEqualizer {
    synthesizer: FirSynthesizer,
    mode: ChannelMode,
    strategy: ChannelStrategy,
}

impl ZeroPhaseFirEqualizer {
    pub fn new(synthesizer: FirSynthesizer, mode: ChannelMode) -> Self {
        debug!(
            param = synthesizer.param_name(),
            param_len = synthesizer.param_len(),
            kernel_len = synthesizer.kernel_len(),
            channel_mode = %mode,
            "created zero-phase FIR equalizer"
        );
        Self {
            synthesizer,
            mode,
            strategy: mode.into(),
        }
    }

    /// The synthesis path
    pub fn synthesizer(&self) -> &FirSynthesizer {
        &self.synthesizer
    }

    fn kernels(&self, params: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        check_params(
            self.synthesizer.param_name(),
            params,
            self.mode.filter_count(),
            self.synthesizer.param_len(),
        )?;
        params
            .iter()
            .map(|row| self.synthesizer.synthesize(row))
            .collect()
    }
}

impl Equalizer for ZeroPhaseFirEqualizer {
    fn name(&self) -> &'static str {
        "zero_phase_fir"
    }

    fn channel_mode(&self) -> ChannelMode {
        self.mode
    }

    fn parameter_size(&self) -> ParameterSizes {
        ParameterSizes::single(
            self.synthesizer.param_name(),
            self.mode.filter_count(),
            self.synthesizer.param_len(),
        )
    }

    fn design(&self, params: &[Vec<f64>]) -> Result<FilterDesign> {
        Ok(FilterDesign::Fir(self.kernels(params)?))
    }

    fn process(&self, input: &AudioBuffer, params: &[Vec<f64>]) -> Result<AudioBuffer> {
        check_input(self.mode, input)?;
        let mut kernels = self.kernels(params)?;
        if self.strategy == ChannelStrategy::PseudoMidSide {
            kernels = mix_pseudo_midside(&kernels)?;
        }
        self.strategy
            .run(input, |signal| convolve(signal, &kernels, ConvolutionMode::ZeroPhase))
    }
}

// ============================================================================
// Graphic Equalizer
// ============================================================================

/// Equalizer driven by per-band log-gains, realized as a cascade of peaking
/// biquads per row
#[derive(Debug, Clone)]
pub struct GraphicEqualizer {
    designer: GraphicEqDesigner,
    backend: BiquadBackend,
    mode: ChannelMode,
    strategy: ChannelStrategy,
}

impl GraphicEqualizer {
    /// # Errors
    /// * `Configuration` - If pseudo mid/side is requested with the exact
    ///   backend (it needs an FIR to mix)
    pub fn new(designer: GraphicEqDesigner, backend: BiquadBackend, mode: ChannelMode) -> Result<Self> {
        if mode == ChannelMode::PseudoMidSide && backend == BiquadBackend::Exact {
            return Err(EqError::config(
                "pseudo_midside needs the fsm backend: exact biquads cannot be mixed into a left/right pair",
            ));
        }
        debug!(
            num_bands = designer.num_bands(),
            backend = ?backend,
            channel_mode = %mode,
            "created graphic equalizer"
        );
        Ok(Self {
            designer,
            backend,
            mode,
            strategy: mode.into(),
        })
    }

    /// The band designer
    pub fn designer(&self) -> &GraphicEqDesigner {
        &self.designer
    }

    /// The configured backend
    pub fn backend(&self) -> BiquadBackend {
        self.backend
    }

    fn cascades(&self, params: &[Vec<f64>]) -> Result<Vec<BiquadCascade>> {
        check_params(
            "log_gains",
            params,
            self.mode.filter_count(),
            self.designer.num_bands(),
        )?;
        params.iter().map(|row| self.designer.design(row)).collect()
    }
}

impl Equalizer for GraphicEqualizer {
    fn name(&self) -> &'static str {
        "graphic"
    }

    fn channel_mode(&self) -> ChannelMode {
        self.mode
    }

    fn parameter_size(&self) -> ParameterSizes {
        ParameterSizes::single(
            "log_gains",
            self.mode.filter_count(),
            self.designer.num_bands(),
        )
    }

    fn design(&self, params: &[Vec<f64>]) -> Result<FilterDesign> {
        Ok(FilterDesign::Biquad(self.cascades(params)?))
    }

    fn process(&self, input: &AudioBuffer, params: &[Vec<f64>]) -> Result<AudioBuffer> {
        check_input(self.mode, input)?;
        let cascades = self.cascades(params)?;

        match (self.strategy, self.backend) {
            (ChannelStrategy::PseudoMidSide, BiquadBackend::Fsm { fir_len }) => {
                let kernels = cascades
                    .iter()
                    .map(|c| fsm_kernel(c, fir_len))
                    .collect::<Result<Vec<_>>>()?;
                convolve(input, &mix_pseudo_midside(&kernels)?, ConvolutionMode::Causal)
            }
            (strategy, backend) => strategy.run(input, |signal| backend.apply(signal, &cascades)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::backend::BackendKind;
    use crate::dsp::fir::{FilterbankFir, ZeroPhaseFir, DEFAULT_FILTERBANK_EPS};
    use crate::dsp::filterbank::FilterbankMatrix;
    use crate::dsp::scale::{BandLayout, FrequencyScale};
    use crate::dsp::window::WindowSpec;
    use approx::assert_relative_eq;
    use pretty_assertions::assert_eq;

    const K: usize = 64;

    fn direct_fir(mode: ChannelMode) -> ZeroPhaseFirEqualizer {
        let fir = ZeroPhaseFir::new(K, &WindowSpec::default(), None).unwrap();
        ZeroPhaseFirEqualizer::new(FirSynthesizer::Direct(fir), mode)
    }

    fn ramp(len: usize, freq: f64) -> Vec<f64> {
        (0..len).map(|i| (i as f64 * freq).sin()).collect()
    }

    fn stereo_input() -> AudioBuffer {
        AudioBuffer::from_channels(vec![ramp(512, 0.05), ramp(512, 0.9)], 44100).unwrap()
    }

    fn tilt(scale: f64) -> Vec<f64> {
        (0..K).map(|k| scale * (k as f64 / K as f64 - 0.5)).collect()
    }

    fn assert_buffers_close(a: &AudioBuffer, b: &AudioBuffer, epsilon: f64) {
        assert_eq!(a.shape(), b.shape());
        for ch in 0..a.channels() {
            for (x, y) in a.channel(ch).iter().zip(b.channel(ch)) {
                assert_relative_eq!(x, y, epsilon = epsilon);
            }
        }
    }

    #[test]
    fn test_zero_log_magnitude_is_transparent() {
        let eq = direct_fir(ChannelMode::Mono);
        let input = AudioBuffer::from_channels(vec![ramp(300, 0.1); 3], 48000).unwrap();
        let output = eq.process(&input, &[vec![0.0; K]]).unwrap();
        assert_buffers_close(&output, &input, 1e-12);
    }

    #[test]
    fn test_parameter_sizes() {
        assert_eq!(
            direct_fir(ChannelMode::Mono).parameter_size().get("log_magnitude"),
            Some((1, K))
        );
        assert_eq!(
            direct_fir(ChannelMode::MidSide).parameter_size().get("log_magnitude"),
            Some((2, K))
        );

        let bank =
            FilterbankMatrix::new(K, FrequencyScale::BarkTraunmuller, 20, 40.0, None, Some(44100.0))
                .unwrap();
        let fir = ZeroPhaseFir::new(K, &WindowSpec::default(), None).unwrap();
        let fb = FilterbankFir::new(bank, fir, DEFAULT_FILTERBANK_EPS).unwrap();
        let eq = ZeroPhaseFirEqualizer::new(FirSynthesizer::Filterbank(fb), ChannelMode::Stereo);
        let sizes = eq.parameter_size();
        assert_eq!(sizes.get("log_energy"), Some((2, 20)));
        assert_eq!(sizes.get("log_magnitude"), None);
    }

    #[test]
    fn test_stereo_filters_each_channel() {
        let eq = direct_fir(ChannelMode::Stereo);
        let mono = direct_fir(ChannelMode::Mono);
        let input = stereo_input();
        let params = vec![vec![0.0; K], tilt(2.0)];

        let output = eq.process(&input, &params).unwrap();
        let right_only =
            AudioBuffer::from_channels(vec![input.channel(1).to_vec()], 44100).unwrap();
        let expected_right = mono.process(&right_only, &params[1..]).unwrap();

        for (x, y) in output.channel(0).iter().zip(input.channel(0)) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
        for (x, y) in output.channel(1).iter().zip(expected_right.channel(0)) {
            assert_relative_eq!(x, y, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_midside_with_matching_filters_equals_stereo() {
        let input = stereo_input();
        let params = vec![tilt(1.5), tilt(1.5)];
        let midside = direct_fir(ChannelMode::MidSide).process(&input, &params).unwrap();
        let stereo = direct_fir(ChannelMode::Stereo).process(&input, &params).unwrap();
        assert_buffers_close(&midside, &stereo, 1e-10);
    }

    #[test]
    fn test_pseudo_midside_keeps_only_direct_paths() {
        let params = vec![tilt(1.0), tilt(-2.0)];
        let midside = direct_fir(ChannelMode::MidSide);
        let pseudo = direct_fir(ChannelMode::PseudoMidSide);
        let silent = vec![0.0; 512];

        // Left-only input: identical left output
        let left_only =
            AudioBuffer::from_channels(vec![ramp(512, 0.3), silent.clone()], 44100).unwrap();
        let true_ms = midside.process(&left_only, &params).unwrap();
        let pseudo_ms = pseudo.process(&left_only, &params).unwrap();
        for (x, y) in pseudo_ms.channel(0).iter().zip(true_ms.channel(0)) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }
        assert!(pseudo_ms.channel(1).iter().all(|&v| v == 0.0));

        // Right-only input: the right filter is the cross path of true mid/side
        let right_only = AudioBuffer::from_channels(vec![silent, ramp(512, 0.3)], 44100).unwrap();
        let true_ms = midside.process(&right_only, &params).unwrap();
        let pseudo_ms = pseudo.process(&right_only, &params).unwrap();
        for (x, y) in pseudo_ms.channel(1).iter().zip(true_ms.channel(0)) {
            assert_relative_eq!(x, y, epsilon = 1e-10);
        }
        let max_diff = pseudo_ms
            .channel(1)
            .iter()
            .zip(true_ms.channel(1))
            .map(|(x, y)| (x - y).abs())
            .fold(0.0, f64::max);
        assert!(max_diff > 1e-3);
    }

    #[test]
    fn test_shape_errors_leave_output_untouched() {
        let eq = direct_fir(ChannelMode::Stereo);
        let input = stereo_input();
        let mut output = AudioBuffer::from_channels(vec![vec![7.0; 512]; 2], 44100).unwrap();
        let before = output.clone();

        let err = eq.process_into(&input, &[vec![0.0; K]], &mut output).unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_ERROR");
        let err = eq
            .process_into(&input, &[vec![0.0; K], vec![0.0; K - 1]], &mut output)
            .unwrap_err();
        assert_eq!(err.error_code(), "SHAPE_ERROR");
        let mono_input = AudioBuffer::new(1, 512, 44100);
        assert!(eq.process_into(&mono_input, &[vec![0.0; K], vec![0.0; K]], &mut output).is_err());
        assert_eq!(output, before);

        // A valid call still succeeds afterwards
        eq.process_into(&input, &[vec![0.0; K], vec![0.0; K]], &mut output).unwrap();
        assert_buffers_close(&output, &input, 1e-12);
    }

    #[test]
    fn test_fir_design_is_symmetric() {
        let eq = direct_fir(ChannelMode::Stereo);
        let design = eq.design(&[tilt(1.0), tilt(3.0)]).unwrap();
        let FilterDesign::Fir(kernels) = design else {
            panic!("expected FIR design");
        };
        for kernel in kernels {
            assert_eq!(kernel.len(), 2 * K - 1);
            for n in 0..K {
                assert_eq!(kernel[K - 1 + n], kernel[K - 1 - n]);
            }
        }
    }

    fn geq(backend: BiquadBackend, mode: ChannelMode) -> Result<GraphicEqualizer> {
        let designer = GraphicEqDesigner::new(BandLayout::Bark, 44100.0)?;
        GraphicEqualizer::new(designer, backend, mode)
    }

    #[test]
    fn test_unity_graphic_eq_is_identity() {
        let eq = geq(BiquadBackend::Exact, ChannelMode::Mono).unwrap();
        let input = stereo_input();
        let output = eq.process(&input, &[vec![0.0; 24]]).unwrap();
        assert_eq!(output, input);

        let FilterDesign::Biquad(cascades) = eq.design(&[vec![0.0; 24]]).unwrap() else {
            panic!("expected biquad design");
        };
        assert!(cascades[0].is_identity());
    }

    #[test]
    fn test_graphic_backends_agree() {
        let gains: Vec<f64> = (0..24).map(|k| ((k as f64) * 0.7).sin() * 0.6).collect();
        let params = vec![gains.clone(), gains.iter().map(|g| -g).collect()];
        let input = stereo_input();

        for mode in [ChannelMode::Stereo, ChannelMode::MidSide] {
            let exact = geq(BiquadBackend::Exact, mode).unwrap().process(&input, &params).unwrap();
            let fsm = geq(BiquadBackend::default(), mode).unwrap().process(&input, &params).unwrap();
            assert_buffers_close(&exact, &fsm, 1e-6);
        }
    }

    #[test]
    fn test_pseudo_midside_requires_fsm() {
        let err = geq(BiquadBackend::Exact, ChannelMode::PseudoMidSide).unwrap_err();
        assert_eq!(err.error_code(), "CONFIGURATION_ERROR");

        let backend = BiquadBackend::new(BackendKind::Fsm, 4096).unwrap();
        let eq = geq(backend, ChannelMode::PseudoMidSide).unwrap();
        let output = eq.process(&stereo_input(), &[vec![0.3; 24], vec![0.0; 24]]).unwrap();
        assert_eq!(output.shape(), (2, 512));
        assert!(output.is_finite());
    }

    #[test]
    fn test_graphic_parameter_size() {
        let eq = geq(BiquadBackend::Exact, ChannelMode::Stereo).unwrap();
        assert_eq!(eq.parameter_size(), ParameterSizes::single("log_gains", 2, 24));
        assert_eq!(eq.name(), "graphic");
    }

    #[test]
    fn test_batch_results_are_independent() {
        let eq = direct_fir(ChannelMode::Mono);
        let input = AudioBuffer::from_channels(vec![ramp(128, 0.2)], 44100).unwrap();
        let items = vec![
            (input.clone(), vec![vec![0.0; K]]),
            (input.clone(), vec![vec![0.0; K - 2]]),
            (input.clone(), vec![tilt(1.0)]),
        ];
        let results = process_batch(&eq, &items);
        assert_eq!(results.len(), 3);
        assert_buffers_close(results[0].as_ref().unwrap(), &input, 1e-12);
        assert!(results[1].is_err());
        assert_eq!(
            results[2].as_ref().unwrap(),
            &eq.process(&input, &[tilt(1.0)]).unwrap()
        );

        let boxed: Box<dyn Equalizer> = Box::new(eq);
        assert_eq!(process_batch(boxed.as_ref(), &items).len(), 3);
    }
}
