//! Brother PEC format encoder
//!
//! Emits the fixed PEC layout: label block, thread table, stitch stream
//! and the monochrome preview thumbnails rasterized from the accumulated
//! stitches. Stitches are appended in physical millimeter coordinates and
//! stored verbatim; the stream is delta-encoded against the pattern's
//! minimum bounds corner on emit.

use crate::core::bounds::Bounds;
use crate::core::stitch::{mm_to_raw, StitchKind};
use crate::formats::io::utils::{checked_u16, SinkWriter};
use crate::palettes::thread_pec::PEC_PALETTE_SIZE;
use crate::utils::error::{Error, Result};

/// Thumbnail width in pixels
pub const THUMBNAIL_WIDTH: usize = 48;
/// Thumbnail height in pixels
pub const THUMBNAIL_HEIGHT: usize = 38;

/// Largest number of threads a PEC thread table can hold
pub const MAX_THREADS: usize = 256;

/// Smallest and largest encodable per-axis delta in raw units
const DELTA_MIN: i32 = -0x800;
const DELTA_MAX: i32 = 0x7FF;

#[derive(Debug, Clone, Copy)]
struct PecStitch {
    x: f32,
    y: f32,
    kind: StitchKind,
}

struct Thumbnail {
    image: [[u8; THUMBNAIL_WIDTH / 8]; THUMBNAIL_HEIGHT],
}

impl Thumbnail {
    fn new() -> Self {
        Self {
            image: [[0; THUMBNAIL_WIDTH / 8]; THUMBNAIL_HEIGHT],
        }
    }

    fn plot(&mut self, c: i32, r: i32) {
        if (0..THUMBNAIL_WIDTH as i32).contains(&c) && (0..THUMBNAIL_HEIGHT as i32).contains(&r) {
            self.image[r as usize][c as usize / 8] |= 1 << (c as usize % 8);
        }
    }

    fn framed_plot(&mut self, x: f32, y: f32, bounds: &Bounds) {
        let margin = 5;
        let w = bounds.max_x - bounds.min_x;
        let h = bounds.max_y - bounds.min_y;
        let cx = 0.5 * (bounds.min_x + bounds.max_x);
        let cy = 0.5 * (bounds.min_y + bounds.max_y);
        let tx = 0.5 * (THUMBNAIL_WIDTH - 2 * margin) as f32;
        let ty = 0.5 * (THUMBNAIL_HEIGHT - 2 * margin) as f32;

        if 0.0 < w || 0.0 < h {
            let sw = 2.0 * tx / w;
            let sh = 2.0 * ty / h;
            let s = sw.min(sh);
            let c = margin as i32 + (tx + (x - cx) * s).round() as i32;
            let r = margin as i32 + (ty + (y - cy) * s).round() as i32;

            self.plot(c, r);
        }
    }

    fn framed_line(&mut self, a: &PecStitch, b: &PecStitch, bounds: &Bounds) {
        if a.kind != StitchKind::Normal || b.kind != StitchKind::Normal {
            return;
        }

        for i in 0..=100 {
            let t = i as f32 / 100.0;

            self.framed_plot(
                (1.0 - t) * a.x + t * b.x,
                (1.0 - t) * a.y + t * b.y,
                bounds,
            );
        }
    }

    /// Decorative border with rounded corners
    fn frame(&mut self) {
        let width = THUMBNAIL_WIDTH as i32;
        let height = THUMBNAIL_HEIGHT as i32;

        for c in 4..width - 4 {
            self.plot(c, 1);
            self.plot(c, height - 2);
        }

        for r in 4..height - 4 {
            self.plot(1, r);
            self.plot(width - 2, r);
        }

        self.plot(3, 2);
        self.plot(2, 3);
        self.plot(width - 4, 2);
        self.plot(width - 3, 3);
        self.plot(2, height - 4);
        self.plot(3, height - 3);
        self.plot(width - 3, height - 4);
        self.plot(width - 4, height - 3);
    }
}

/// Append-then-emit encoder producing a complete PEC payload
pub struct PecEncoder {
    bounds: Bounds,
    stitch_list: Vec<PecStitch>,
    palette: Vec<u8>,
    last_raw: Option<(i32, i32)>,
}

impl PecEncoder {
    /// Create an empty encoder
    pub fn new() -> Self {
        Self {
            bounds: Bounds::new(),
            stitch_list: Vec::new(),
            palette: Vec::new(),
            last_raw: None,
        }
    }

    /// Number of appended threads
    pub fn thread_count(&self) -> usize {
        self.palette.len()
    }

    /// Number of appended stitches, including synthesized Stops
    pub fn stitch_count(&self) -> usize {
        self.stitch_list.len()
    }

    /// Append a thread by its 1-based palette index
    ///
    /// A Stop marker is synthesized before every thread after the first.
    pub fn append_thread(&mut self, palette_index: u8) -> Result<()> {
        if !(1..=PEC_PALETTE_SIZE as u8).contains(&palette_index) {
            return Err(Error::Range(format!(
                "palette index outside 1..={}: {}",
                PEC_PALETTE_SIZE, palette_index
            )));
        }
        if self.palette.len() >= MAX_THREADS {
            return Err(Error::Range(format!(
                "thread count outside 1..={}",
                MAX_THREADS
            )));
        }

        self.palette.push(palette_index);

        if self.stitch_list.is_empty() {
            Ok(())
        } else {
            self.push_stitch(StitchKind::Stop, 0.0, 0.0)
        }
    }

    /// Append a normal stitch at the given millimeter coordinates
    pub fn append_stitch(&mut self, x: f32, y: f32) -> Result<()> {
        self.push_stitch(StitchKind::Normal, x, y)
    }

    /// Append a jump stitch at the given millimeter coordinates
    pub fn append_jump_stitch(&mut self, x: f32, y: f32) -> Result<()> {
        self.push_stitch(StitchKind::Jump, x, y)
    }

    /// Append a trim stitch at the given millimeter coordinates
    pub fn append_trim_stitch(&mut self, x: f32, y: f32) -> Result<()> {
        self.push_stitch(StitchKind::Trim, x, y)
    }

    fn push_stitch(&mut self, kind: StitchKind, x: f32, y: f32) -> Result<()> {
        if self.palette.is_empty() {
            return Err(Error::Range(
                "stitch appended before any thread".to_string(),
            ));
        }

        if kind != StitchKind::Stop {
            let nx = mm_to_raw(x);
            let ny = mm_to_raw(y);

            if let Some((px, py)) = self.last_raw {
                let dx = nx - px;
                let dy = ny - py;
                if !(DELTA_MIN..=DELTA_MAX).contains(&dx)
                    || !(DELTA_MIN..=DELTA_MAX).contains(&dy)
                {
                    return Err(Error::Range(format!(
                        "stitch delta ({}, {}) outside signed 12-bit range",
                        dx, dy
                    )));
                }
            }
            self.last_raw = Some((nx, ny));
        }

        self.stitch_list.push(PecStitch { x, y, kind });
        self.bounds.update(x, y);

        Ok(())
    }

    /// Emit the complete PEC payload through the given byte sink
    ///
    /// The sink aborts the emit by returning false. Emitting does not
    /// change the encoder.
    pub fn emit<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        let mut writer = SinkWriter::new(&mut sink);

        self.encode_label(&mut writer)?;
        self.encode_thumbnail_size(&mut writer)?;
        self.encode_threads(&mut writer)?;
        self.encode_thumbnail_offset(&mut writer)?;
        self.encode_size(&mut writer)?;
        self.encode_stitch_list(&mut writer)?;
        self.encode_thumbnail_list(&mut writer)
    }

    /// Size in bytes of the payload `emit` would produce
    pub fn size(&self) -> Result<usize> {
        let mut total = 0usize;
        self.emit(|chunk| {
            total += chunk.len();
            true
        })?;
        Ok(total)
    }

    fn encode_label(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        writer.write_str("LA:                \r            ")?;
        writer.write_u16_le(0x00FF)
    }

    fn encode_thumbnail_size(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        writer.write_u8((THUMBNAIL_WIDTH / 8) as u8)?;
        writer.write_u8(THUMBNAIL_HEIGHT as u8)
    }

    fn encode_threads(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let thread_count = self.palette.len();

        if !(1..=MAX_THREADS).contains(&thread_count) {
            return Err(Error::Range(format!(
                "thread count outside 1..={}: {}",
                MAX_THREADS, thread_count
            )));
        }

        writer.write_str("            ")?;
        writer.write_u8((thread_count - 1) as u8)?;

        for &palette_index in &self.palette {
            writer.write_u8(palette_index)?;
        }

        for _ in thread_count..463 {
            writer.write_u8(0x20)?;
        }

        Ok(())
    }

    fn encode_thumbnail_offset(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut size = 20usize;
        {
            let mut count = |chunk: &[u8]| {
                size += chunk.len();
                true
            };
            let mut probe = SinkWriter::new(&mut count);
            self.encode_stitch_list(&mut probe)?;
        }

        writer.write_u16_le(0x0000)?;
        writer.write_u16_le(checked_u16(size, "thumbnail offset")?)?;
        writer.write_u16_le(0x3100)?;
        writer.write_u16_le(0xF0FF)
    }

    fn encode_size(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let width = if self.bounds.valid {
            mm_to_raw(self.bounds.max_x) - mm_to_raw(self.bounds.min_x)
        } else {
            0
        };
        let height = if self.bounds.valid {
            mm_to_raw(self.bounds.max_y) - mm_to_raw(self.bounds.min_y)
        } else {
            0
        };

        writer.write_u16_le(checked_u16(width as usize, "width")?)?;
        writer.write_u16_le(checked_u16(height as usize, "height")?)?;
        writer.write_u16_le(0x01E0)?;
        writer.write_u16_le(0x01B0)?;
        writer.write_u16_le(0x0000)?;
        writer.write_u16_le(0x0000)
    }

    fn encode_stitch(
        &self,
        writer: &mut SinkWriter<'_>,
        kind: StitchKind,
        d: i32,
    ) -> Result<()> {
        if !(DELTA_MIN..=DELTA_MAX).contains(&d) {
            return Err(Error::Range(format!(
                "stitch delta outside signed 12-bit range: {}",
                d
            )));
        }

        if kind == StitchKind::Normal && (-0x40..=0x3F).contains(&d) {
            writer.write_u8((d & 0x7F) as u8)
        } else {
            let kind_bits = match kind {
                StitchKind::Trim => 0x20,
                StitchKind::Jump => 0x10,
                _ => 0x00,
            };
            writer.write_u8((((d >> 8) & 0xF) | 0x80 | kind_bits) as u8)?;
            writer.write_u8((d & 0xFF) as u8)
        }
    }

    fn encode_stitch_list(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut x = mm_to_raw(self.bounds.min_x);
        let mut y = mm_to_raw(self.bounds.min_y);
        let mut stop = 2u8;

        for stitch in &self.stitch_list {
            if stitch.kind == StitchKind::Stop {
                writer.write_u16_le(0xB0FE)?;
                writer.write_u8(stop)?;
                // TODO: why does the counter alternate between 2 and 1?
                stop = 3 - stop;
                continue;
            }

            let nx = mm_to_raw(stitch.x);
            let ny = mm_to_raw(stitch.y);

            self.encode_stitch(writer, stitch.kind, nx - x)?;
            self.encode_stitch(writer, stitch.kind, ny - y)?;

            x = nx;
            y = ny;
        }

        writer.write_u8(0xFF)
    }

    fn encode_thumbnail(
        &self,
        writer: &mut SinkWriter<'_>,
        thumbnail: &mut Thumbnail,
    ) -> Result<()> {
        thumbnail.frame();

        for row in &thumbnail.image {
            writer.write_bytes(row)?;
        }

        Ok(())
    }

    fn encode_thumbnail_list(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut thumbnail = Thumbnail::new();

        for k in 1..self.stitch_list.len() {
            thumbnail.framed_line(&self.stitch_list[k - 1], &self.stitch_list[k], &self.bounds);
        }

        self.encode_thumbnail(writer, &mut thumbnail)?;

        let mut k = 1;
        for _ in 0..self.palette.len() {
            let mut thumbnail = Thumbnail::new();

            while k < self.stitch_list.len() && self.stitch_list[k].kind != StitchKind::Stop {
                thumbnail.framed_line(
                    &self.stitch_list[k - 1],
                    &self.stitch_list[k],
                    &self.bounds,
                );
                k += 1;
            }
            k += 1;

            self.encode_thumbnail(writer, &mut thumbnail)?;
        }

        Ok(())
    }
}

impl Default for PecEncoder {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formats::io::readers::pec::PecDecoder;

    fn emit_to_vec(encoder: &PecEncoder) -> Vec<u8> {
        let mut data = Vec::new();
        encoder
            .emit(|chunk| {
                data.extend_from_slice(chunk);
                true
            })
            .unwrap();
        data
    }

    #[test]
    fn test_stitch_before_thread_fails() {
        let mut encoder = PecEncoder::new();
        assert!(encoder.append_stitch(0.0, 0.0).is_err());
    }

    #[test]
    fn test_palette_index_range() {
        let mut encoder = PecEncoder::new();
        assert!(encoder.append_thread(0).is_err());
        assert!(encoder.append_thread(65).is_err());
        assert!(encoder.append_thread(1).is_ok());
        assert!(encoder.append_thread(64).is_ok());
    }

    #[test]
    fn test_single_stitch_stream() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        encoder.append_stitch(0.0, 0.0).unwrap();

        let data = emit_to_vec(&encoder);
        // Stream: zero delta pair plus terminator, directly followed by
        // two 48x38 thumbnails.
        assert_eq!(&data[532..535], &[0x00, 0x00, 0xFF]);
        assert_eq!(data.len(), 535 + 2 * (48 * 38 / 8));
        assert_eq!(u16::from_le_bytes([data[514], data[515]]), 23);
        assert_eq!(data[48], 0);
        assert_eq!(data[49], 20);

        assert_eq!(encoder.size().unwrap(), data.len());

        let decoder = PecDecoder::new(&data).unwrap();
        assert_eq!(decoder.stitch_count(), 1);
        assert_eq!(decoder.thread_count(), 1);
        assert_eq!(decoder.thread(0).name, "Black");
    }

    #[test]
    fn test_stop_alternation() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        encoder.append_stitch(0.0, 0.0).unwrap();
        encoder.append_thread(5).unwrap();
        encoder.append_stitch(1.0, 0.0).unwrap();
        encoder.append_thread(9).unwrap();
        encoder.append_stitch(2.0, 0.0).unwrap();

        let data = emit_to_vec(&encoder);
        let stream = &data[532..];
        // First stop writes 2, second writes 1.
        assert_eq!(&stream[2..5], &[0xFE, 0xB0, 0x02]);
        assert_eq!(&stream[7..10], &[0xFE, 0xB0, 0x01]);
    }

    #[test]
    fn test_delta_overflow_rejected_at_append() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        encoder.append_stitch(0.0, 0.0).unwrap();

        assert!(matches!(
            encoder.append_stitch(300.0, 0.0),
            Err(Error::Range(_))
        ));
        assert_eq!(encoder.stitch_count(), 1);

        // The encoder stays usable after the failed append.
        encoder.append_stitch(10.0, 0.0).unwrap();
        assert_eq!(encoder.stitch_count(), 2);
    }

    #[test]
    fn test_emit_abort() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        encoder.append_stitch(0.0, 0.0).unwrap();

        let result = encoder.emit(|_| false);
        assert!(matches!(result, Err(Error::Aborted)));
    }

    #[test]
    fn test_round_trip_kinds() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(35).unwrap();
        encoder.append_jump_stitch(1.0, 2.0).unwrap();
        encoder.append_stitch(1.5, 2.5).unwrap();
        encoder.append_trim_stitch(15.0, 2.5).unwrap();
        encoder.append_stitch(15.0, 3.0).unwrap();

        let data = emit_to_vec(&encoder);
        let decoder = PecDecoder::new(&data).unwrap();

        let mut kinds = Vec::new();
        decoder
            .for_each_stitch(|_, _, _, kind| {
                kinds.push(kind);
                true
            })
            .unwrap();
        assert_eq!(
            kinds,
            vec![
                StitchKind::Jump,
                StitchKind::Normal,
                StitchKind::Trim,
                StitchKind::Normal,
            ]
        );
    }

    #[test]
    fn test_thumbnail_count_and_frame() {
        let mut encoder = PecEncoder::new();
        encoder.append_thread(20).unwrap();
        encoder.append_stitch(0.0, 0.0).unwrap();
        encoder.append_stitch(5.0, 5.0).unwrap();
        encoder.append_thread(5).unwrap();
        encoder.append_stitch(5.0, 0.0).unwrap();

        let data = emit_to_vec(&encoder);
        let decoder = PecDecoder::new(&data).unwrap();
        assert_eq!(decoder.thumbnail_width(), 48);
        assert_eq!(decoder.thumbnail_height(), 38);

        // Every thumbnail carries the decorative border.
        for thumbnail_index in 0..=decoder.thread_count() {
            assert!(decoder.thumbnail_pixel(thumbnail_index, 3, 2));
            assert!(decoder.thumbnail_pixel(thumbnail_index, 5, 1));
            assert!(!decoder.thumbnail_pixel(thumbnail_index, 0, 0));
        }
    }
}
