// File format module - codecs and transcoders for the PES family

//! File format codecs
//!
//! This module contains the decoders and encoders for the PEC, PES and
//! SVG embroidery formats, and the transcoders composing them.

/// File I/O operations
pub mod io;

/// PES to SVG embroidery transcoders and back
pub mod transcode;
