//! Filter Design and Application
//!
//! Building blocks, bottom-up:
//! - Frequency scales and band layouts
//! - Windows, triangular filterbanks and zero-phase FIR synthesis
//! - Peaking-biquad graphic EQ design with exact and FSM backends
//! - Convolution and mid/side channel transforms
//! - Equalizer façades composing the above

pub mod backend;
pub mod biquad;
pub mod convolution;
pub mod equalizer;
pub mod filterbank;
pub mod fir;
pub mod geq;
pub mod midside;
pub mod scale;
pub mod window;

pub use backend::{fsm_kernel, BackendKind, BiquadBackend, DEFAULT_FSM_FIR_LEN};
pub use biquad::{BiquadCascade, BiquadSection};
pub use convolution::{convolve, ConvolutionMode};
pub use equalizer::{
    process_batch, Equalizer, FilterDesign, GraphicEqualizer, ParameterSizes,
    ZeroPhaseFirEqualizer,
};
pub use filterbank::{FilterbankConfig, FilterbankMatrix};
pub use fir::{FilterbankFir, FirSynthesizer, ZeroPhaseFir, DEFAULT_FILTERBANK_EPS};
pub use geq::GraphicEqDesigner;
pub use midside::{lr_to_ms, ms_to_lr, ms_to_lr_kernels, ChannelMode};
pub use scale::{Band, BandLayout, FrequencyScale};
pub use window::{WindowKind, WindowSpec, DEFAULT_KAISER_BETA};
