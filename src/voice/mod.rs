//! Microphone capture and speech transcription

mod recorder;
mod transcribe;

pub use recorder::*;
pub use transcribe::*;
