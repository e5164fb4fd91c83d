//! Barline — a bar-arranging loop sequencer.
//!
//! Generated bars land in per-track pools, get placed into fixed-length
//! arrangements, and compile into events that a looping transport fires into
//! a playback sink. Arrangements export as standard MIDI files and every
//! session action is reachable over OSC.

pub mod arrangement;
pub mod bar;
pub mod control;
pub mod event;
pub mod generate;
pub mod midi;
pub mod osc;
pub mod playback;
pub mod session;
