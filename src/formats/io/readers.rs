// Format decoders - one-shot decoders over complete input buffers

//! Format decoders
//!
//! Each decoder owns a copy of its input for its lifetime and exposes
//! scalar accessors plus callback iteration over blocks and stitches.

/// Brother PEC decoder
pub mod pec;

/// Brother PES decoder
pub mod pes;

/// SVG embroidery decoder
pub mod svg_emb;
