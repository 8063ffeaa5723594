//! Brother PEC format decoder
//!
//! PEC is the Brother Embroidery Card format, also used as the embedded
//! stitch section of PES files. It stores a thread table of 64-color
//! palette indices, a stitch stream of variable-length signed deltas and a
//! set of monochrome preview thumbnails.
//!
//! ## Stitch encoding
//! - 1-byte form: a 7-bit signed delta for Normal stitches in -64..=63
//! - 2-byte form (bit 7 set): a 12-bit signed delta; bit 5 marks Trim,
//!   bit 4 marks Jump
//! - `0xFE` introduces a Stop marker (3 bytes total), `0xFF` terminates

use crate::core::stitch::{raw_to_mm, StitchKind};
use crate::core::thread::PecThread;
use crate::formats::io::utils::RawReader;
use crate::palettes::thread_pec::palette_thread_by_index;
use crate::utils::error::{Error, Result};

/// Byte offset of the thumbnail-offset base
const BLOCK_BASE: usize = 512;
/// Byte offset of the first stitch byte
const STITCH_STREAM_START: usize = 532;
/// Smallest structurally valid PEC payload
const MIN_PEC_SIZE: usize = 534;

/// One-shot decoder over a complete PEC payload
pub struct PecDecoder {
    data: Vec<u8>,
    label: String,
}

impl PecDecoder {
    /// Create a decoder over a copy of the given PEC payload
    ///
    /// Fails when the payload is smaller than the fixed PEC structure.
    pub fn new(data: &[u8]) -> Result<Self> {
        if data.len() < MIN_PEC_SIZE {
            return Err(Error::Marker(format!(
                "PEC payload is {} bytes, expected at least {}",
                data.len(),
                MIN_PEC_SIZE
            )));
        }

        let label = String::from_utf8_lossy(&data[..19]).into_owned();

        Ok(Self {
            data: data.to_vec(),
            label,
        })
    }

    fn reader(&self) -> RawReader<'_> {
        RawReader::new(&self.data)
    }

    /// The 19-byte label, preserved verbatim
    pub fn label(&self) -> &str {
        &self.label
    }

    /// Number of threads in the thread table
    pub fn thread_count(&self) -> usize {
        match self.reader().u8_at(48) {
            Ok(raw) => raw as usize + 1,
            Err(_) => 0,
        }
    }

    /// Thread at the given 0-based index
    ///
    /// Returns the undefined thread for indices outside the table, with
    /// the document-relative index substituted for the palette's.
    pub fn thread(&self, thread_index: usize) -> PecThread {
        if thread_index >= self.thread_count() {
            return PecThread::undefined();
        }

        match self.reader().u8_at(49 + thread_index) {
            Ok(palette_index) => {
                let mut thread = palette_thread_by_index(palette_index as usize);
                thread.index = thread_index;
                thread
            }
            Err(_) => PecThread::undefined(),
        }
    }

    /// Number of stitches in the stitch stream, including Stop markers
    pub fn stitch_count(&self) -> usize {
        let mut counter = 0;
        let _ = self.for_each_stitch(|_, _, _, _| {
            counter += 1;
            true
        });
        counter
    }

    /// Iterate the stitch stream
    ///
    /// The callback receives the stitch index, physical millimeter
    /// coordinates and the stitch kind; returning false aborts the
    /// iteration.
    pub fn for_each_stitch<F>(&self, mut stitch_cb: F) -> Result<()>
    where
        F: FnMut(usize, f32, f32, StitchKind) -> bool,
    {
        let reader = self.reader();
        let mut offset = STITCH_STREAM_START;
        let mut x = 0i32;
        let mut y = 0i32;

        for stitch_index in 0.. {
            let cmd = reader.u8_at(offset)?;

            if cmd == 0xFF {
                break;
            }

            if cmd == 0xFE {
                if !stitch_cb(stitch_index, raw_to_mm(x), raw_to_mm(y), StitchKind::Stop) {
                    return Err(Error::Aborted);
                }
                // TODO: the two bytes after the marker carry the stop
                // alternation counter, whose meaning is unknown.
                offset += 3;
                continue;
            }

            let mut kind = StitchKind::Normal;
            decode_stitch_coordinate(&reader, &mut offset, &mut x, &mut kind)?;
            decode_stitch_coordinate(&reader, &mut offset, &mut y, &mut kind)?;

            if !stitch_cb(stitch_index, raw_to_mm(x), raw_to_mm(y), kind) {
                return Err(Error::Aborted);
            }
        }

        Ok(())
    }

    /// Thumbnail width in pixels
    pub fn thumbnail_width(&self) -> usize {
        match self.reader().u8_at(34) {
            Ok(width) => 8 * width as usize,
            Err(_) => 0,
        }
    }

    /// Thumbnail height in pixels
    pub fn thumbnail_height(&self) -> usize {
        match self.reader().u8_at(35) {
            Ok(height) => height as usize,
            Err(_) => 0,
        }
    }

    /// Pixel of the given thumbnail image
    ///
    /// Image 0 shows all stitches; images `1..=thread_count` show one
    /// color run each. Pixels are packed 8 per byte with bit 0 leftmost.
    /// Returns false for anything outside the buffer.
    pub fn thumbnail_pixel(&self, thumbnail_index: usize, x: usize, y: usize) -> bool {
        let reader = self.reader();

        let thumbnail_offset = match reader.u16_le_at(514) {
            Ok(offset) => BLOCK_BASE + offset as usize,
            Err(_) => return false,
        };

        let width = self.thumbnail_width();
        let height = self.thumbnail_height();
        let image_offset = match thumbnail_index.checked_mul(width * height / 8) {
            Some(offset) => offset,
            None => return false,
        };
        let pixel_offset = (x + width * y) / 8;

        let offset = thumbnail_offset
            .checked_add(image_offset)
            .and_then(|offset| offset.checked_add(pixel_offset));

        match offset.map(|offset| reader.u8_at(offset)) {
            Some(Ok(raw)) => raw & (1 << (x % 8)) != 0,
            _ => false,
        }
    }
}

/// Decode one signed delta and accumulate it into the coordinate
///
/// The 2-byte form carries the Trim/Jump kind bits; with both axes in the
/// 2-byte form the y axis wins, matching the read order.
fn decode_stitch_coordinate(
    reader: &RawReader<'_>,
    offset: &mut usize,
    c: &mut i32,
    kind: &mut StitchKind,
) -> Result<()> {
    let mut u = reader.u8_at(*offset)? as i32;
    *offset += 1;

    if u & 0x80 != 0 {
        if u & 0x20 != 0 {
            *kind = StitchKind::Trim;
        }
        if u & 0x10 != 0 {
            *kind = StitchKind::Jump;
        }

        let v = reader.u8_at(*offset)? as i32;
        *offset += 1;
        u = ((u & 0x0F) << 8) + v;

        if u & 0x800 != 0 {
            u -= 0x1000;
        }
    } else if u >= 0x40 {
        u -= 0x80;
    }

    *c += u;

    Ok(())
}
