// Format encoders - append-then-emit encoders drained through byte sinks

//! Format encoders
//!
//! Each encoder accumulates appended threads and stitches and is drained
//! through a byte-sink callback. Emitting never mutates the encoder, so
//! the same encoder can be size-probed and emitted repeatedly.

/// Brother PEC encoder
pub mod pec;

/// Brother PES encoder
pub mod pes;

/// SVG embroidery encoder
pub mod svg_emb;
