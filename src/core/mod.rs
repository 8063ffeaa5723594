// Core module - fundamental stitch and thread types

//! Core embroidery stitch structures and utilities
//!
//! This module contains the fundamental types shared by the PEC, PES and
//! SVG embroidery codecs.

/// Stitch bounds tracking
pub mod bounds;

/// Affine transformation matrix
pub mod matrix;

/// Stitch kinds and coordinate conversions
pub mod stitch;

/// Thread color management
pub mod thread;
