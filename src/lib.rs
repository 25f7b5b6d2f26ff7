//! euclidfx — Euclidean-rhythm MIDI note effects over a lookahead transport.

pub mod config;
pub mod euclid;
pub mod event;
