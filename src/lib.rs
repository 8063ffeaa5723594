//! # peslib
//!
//! A Rust codec library for the Brother PES embroidery file family and its
//! embedded PEC stitch section, with a lossless round trip to a restricted
//! SVG "embroidery" text form.
//!
//! ## Features
//!
//! - **PEC codec**: stitch-stream decoding and encoding with
//!   variable-length signed deltas, control markers and the monochrome
//!   preview thumbnails
//! - **PES codec**: versioned container parsing (versions 1, 4, 5, 6 on
//!   read, version 1 on write) with CEmbOne/CSewSeg block framing, thread
//!   tables and change lists
//! - **SVG embroidery codec**: one path per color run, byte-stable output
//! - **Transcoders**: lossless PES to SVG embroidery round trip within the
//!   common feature set
//! - **Palette**: the fixed 64-thread Brother palette with
//!   nearest-neighbor RGB lookup
//!
//! ## Quick Start
//!
//! ```rust
//! use peslib::prelude::*;
//!
//! let mut encoder = PesEncoder::new();
//! encoder.append_thread(palette_thread_by_index(20))?;
//! encoder.append_stitch(0, 0.0, 0.0)?;
//! encoder.append_stitch(0, 10.0, 0.0)?;
//!
//! let mut pes = Vec::new();
//! encoder.emit1(|chunk| {
//!     pes.extend_from_slice(chunk);
//!     true
//! })?;
//!
//! let decoder = PesDecoder::new(&pes)?;
//! assert_eq!(decoder.version(), "0001");
//! assert_eq!(decoder.stitch_count(), 2);
//! # Ok::<(), peslib::Error>(())
//! ```
//!
//! ## Control flow
//!
//! Decoders are constructed from a complete byte or text buffer, then
//! queried through scalar accessors or callback iteration. Encoders are
//! built by appended operations and drained through a byte-sink callback
//! that may abort by returning false. The core performs no I/O of its own
//! and is strictly single-threaded.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core modules
pub mod core;
pub mod formats;
pub mod palettes;
pub mod utils;

// Re-export commonly used types at the crate root
pub use crate::core::bounds::Bounds;
pub use crate::core::matrix::PesTransform;
pub use crate::core::stitch::StitchKind;
pub use crate::core::thread::{PecThread, Rgb};
pub use crate::utils::error::Error;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::core::bounds::Bounds;
    pub use crate::core::matrix::PesTransform;
    pub use crate::core::stitch::{mm_to_raw, raw_to_mm, StitchKind};
    pub use crate::core::thread::{PecThread, Rgb};
    pub use crate::formats::io::readers::pec::PecDecoder;
    pub use crate::formats::io::readers::pes::{PesDecoder, PesStitchEvent};
    pub use crate::formats::io::readers::svg_emb::{SvgEmbDecoder, SvgEmbStitchEvent};
    pub use crate::formats::io::writers::pec::PecEncoder;
    pub use crate::formats::io::writers::pes::PesEncoder;
    pub use crate::formats::io::writers::svg_emb::SvgEmbEncoder;
    pub use crate::formats::transcode::{
        pes_to_svg_emb, svg_emb_to_pes1, svg_emb_to_pes4, svg_emb_to_pes5, svg_emb_to_pes6,
    };
    pub use crate::palettes::thread_pec::{
        palette_index_by_rgb, palette_thread_by_index, PEC_THREADS,
    };
    pub use crate::utils::error::*;
}

#[cfg(test)]
mod tests {
    use super::prelude::*;

    #[test]
    fn test_empty_encoder_has_no_threads() {
        let encoder = PecEncoder::new();
        assert_eq!(encoder.thread_count(), 0);
    }
}
