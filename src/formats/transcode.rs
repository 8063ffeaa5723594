//! PES to SVG embroidery transcoders and back
//!
//! Composes the decoders and encoders of the two representations. The
//! round trip is lossless for documents within the common feature set:
//! version 1 files with a single CEmbOne and CSewSeg, stitch deltas within
//! the signed 12-bit raw range and threads matchable by exact RGB.

use crate::formats::io::readers::pes::{PesDecoder, PesStitchEvent};
use crate::formats::io::readers::svg_emb::{SvgEmbDecoder, SvgEmbStitchEvent};
use crate::formats::io::writers::pes::PesEncoder;
use crate::formats::io::writers::svg_emb::SvgEmbEncoder;
use crate::utils::error::{Error, Result};

/// Transcode a PES file to SVG embroidery text
///
/// Drains a [`PesDecoder`] into an [`SvgEmbEncoder`]: one SVG thread per
/// PES thread with the index preserved, the affine transform, then the
/// blocks. A non-normal block marks its following normal stitch as a jump;
/// the stitches of non-normal blocks are the framing between runs and are
/// skipped.
pub fn pes_to_svg_emb<F: FnMut(&[u8]) -> bool>(data: &[u8], sink: F) -> Result<()> {
    let decoder = PesDecoder::new(data)?;
    let mut encoder = SvgEmbEncoder::new();

    for i in 0..decoder.thread_count() {
        encoder.append_thread(decoder.thread(i))?;
    }

    encoder.set_transform(decoder.affine_transform());

    let mut failure = None;
    let mut thread_index = 0usize;
    let mut normal_block = true;
    let mut jump = false;

    let walked = decoder.for_each_stitch(|event| {
        match event {
            PesStitchEvent::Block {
                thread,
                stitch_type,
                ..
            } => {
                thread_index = thread.index;
                normal_block = stitch_type == 0;
                if !normal_block {
                    jump = true;
                }
            }
            PesStitchEvent::Stitch { x, y, .. } => {
                if !normal_block {
                    return true;
                }

                let appended = if jump {
                    encoder.append_jump_stitch(thread_index, x, y)
                } else {
                    encoder.append_stitch(thread_index, x, y)
                };
                if let Err(error) = appended {
                    failure = Some(error);
                    return false;
                }

                jump = false;
            }
        }
        true
    });

    match (walked, failure) {
        (Err(Error::Aborted), Some(error)) => return Err(error),
        (Err(error), _) => return Err(error),
        (Ok(()), _) => {}
    }

    encoder.emit(sink)
}

/// Build a [`PesEncoder`] from SVG embroidery text
///
/// Threads, transform, then the blocks, where the first stitch of every
/// path after the first is a jump.
fn svg_emb_pes_encoder(text: &str) -> Result<PesEncoder> {
    let decoder = SvgEmbDecoder::new(text)?;
    let mut encoder = PesEncoder::new();

    for i in 0..decoder.thread_count() {
        encoder.append_thread(decoder.thread(i))?;
    }

    encoder.set_transform(decoder.affine_transform());

    let mut failure = None;
    let mut thread_index = 0usize;
    let mut jump = false;

    let walked = decoder.for_each_stitch(|event| {
        match event {
            SvgEmbStitchEvent::Block {
                block_index,
                thread,
                ..
            } => {
                thread_index = thread.index;
                jump = block_index != 0;
            }
            SvgEmbStitchEvent::Stitch { x, y, .. } => {
                let appended = if jump {
                    encoder.append_jump_stitch(thread_index, x, y)
                } else {
                    encoder.append_stitch(thread_index, x, y)
                };
                if let Err(error) = appended {
                    failure = Some(error);
                    return false;
                }

                jump = false;
            }
        }
        true
    });

    match (walked, failure) {
        (Err(Error::Aborted), Some(error)) => Err(error),
        (Err(error), _) => Err(error),
        (Ok(()), _) => Ok(encoder),
    }
}

/// Transcode SVG embroidery text to a version 1 PES file
pub fn svg_emb_to_pes1<F: FnMut(&[u8]) -> bool>(text: &str, sink: F) -> Result<()> {
    svg_emb_pes_encoder(text)?.emit1(sink)
}

/// Transcode SVG embroidery text to a version 4 PES file
///
/// Fails like the version 4 encode stub.
pub fn svg_emb_to_pes4<F: FnMut(&[u8]) -> bool>(text: &str, sink: F) -> Result<()> {
    svg_emb_pes_encoder(text)?.emit4(sink)
}

/// Transcode SVG embroidery text to a version 5 PES file
///
/// Fails like the version 5 encode stub.
pub fn svg_emb_to_pes5<F: FnMut(&[u8]) -> bool>(text: &str, sink: F) -> Result<()> {
    svg_emb_pes_encoder(text)?.emit5(sink)
}

/// Transcode SVG embroidery text to a version 6 PES file
///
/// Fails like the version 6 encode stub.
pub fn svg_emb_to_pes6<F: FnMut(&[u8]) -> bool>(text: &str, sink: F) -> Result<()> {
    svg_emb_pes_encoder(text)?.emit6(sink)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rejects_non_pes_input() {
        assert!(pes_to_svg_emb(b"not a pes file", |_| true).is_err());
    }

    #[test]
    fn test_rejects_non_svg_input() {
        assert!(svg_emb_to_pes1("<svg><path d='M 0 0'/></svg>", |_| true).is_err());
    }

    #[test]
    fn test_versioned_stubs_fail() {
        let text = "<svg>\n  <path stroke=\"#000000\" d=\"M 0.0 0.0\" />\n</svg>\n";
        assert!(matches!(
            svg_emb_to_pes4(text, |_| true),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            svg_emb_to_pes5(text, |_| true),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            svg_emb_to_pes6(text, |_| true),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_minimal_svg_to_pes() {
        let text = "<svg>\n  <path stroke=\"#000000\" d=\"M 0.0 0.0 L 1.0 1.0\" />\n</svg>\n";

        let mut pes = Vec::new();
        svg_emb_to_pes1(text, |chunk| {
            pes.extend_from_slice(chunk);
            true
        })
        .unwrap();

        assert_eq!(&pes[..8], b"#PES0001");
    }
}
