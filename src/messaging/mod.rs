//! Message content: tones, prompt rendering and WhatsApp hand-off.

pub mod handoff;
pub mod prompt;
pub mod tone;

pub use tone::Tone;
