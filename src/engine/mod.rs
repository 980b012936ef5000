//! Audio Engine Module
//!
//! Signal containers and file I/O around the filters:
//! - Planar multichannel audio buffer
//! - WAV reading and writing

pub mod buffer;
pub mod io;

pub use buffer::{linear_to_db, AudioBuffer, DEFAULT_SAMPLE_RATE};
pub use io::{read_wav, write_wav, WavFormat};
