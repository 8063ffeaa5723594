//! Brother PES format encoder
//!
//! Emits version 1 PES files: the `#PES0001` header, the CEmbOne and
//! CSewSeg sections and the embedded PEC payload. Every appended stitch
//! also drives a companion [`PecEncoder`], so the PEC section always
//! matches the CSewSeg blocks: a thread change becomes a PEC Stop followed
//! by a Jump to the new coordinate, an explicit jump becomes a PEC Trim.
//!
//! Versions 4, 5 and 6 are recognized by the decoder only; their emit
//! entry points are explicit stubs.

use crate::core::bounds::Bounds;
use crate::core::matrix::PesTransform;
use crate::core::stitch::{mm_to_raw, StitchKind};
use crate::core::thread::PecThread;
use crate::formats::io::utils::{checked_i16, checked_u16, SinkWriter};
use crate::formats::io::writers::pec::PecEncoder;
use crate::palettes::thread_pec::palette_index_by_rgb;
use crate::utils::error::{Error, Result};

/// Largest number of threads a PES file can reference
pub const MAX_THREADS: usize = 256;

/// Size of the `#PES0001` header preceding the sections
const HEADER1_SIZE: usize = 22;

#[derive(Debug, Clone, Copy)]
struct PesStitch {
    thread_index: usize,
    x: f32,
    y: f32,
    jump: bool,
}

/// Append-then-emit encoder producing version 1 PES files
pub struct PesEncoder {
    bounds: Bounds,
    affine_transform: PesTransform,
    thread_list: Vec<PecThread>,
    stitch_list: Vec<PesStitch>,
    block_count: usize,
    pec: PecEncoder,
}

impl PesEncoder {
    /// Create an empty encoder with an identity transform
    pub fn new() -> Self {
        Self {
            bounds: Bounds::new(),
            affine_transform: PesTransform::identity(),
            thread_list: Vec::new(),
            stitch_list: Vec::new(),
            block_count: 0,
            pec: PecEncoder::new(),
        }
    }

    /// Number of appended threads
    pub fn thread_count(&self) -> usize {
        self.thread_list.len()
    }

    /// Number of appended stitches
    pub fn stitch_count(&self) -> usize {
        self.stitch_list.len()
    }

    /// Append a thread; stitches reference threads by append order
    pub fn append_thread(&mut self, thread: PecThread) -> Result<()> {
        if self.thread_list.len() >= MAX_THREADS {
            return Err(Error::Range(format!(
                "thread count outside 1..={}",
                MAX_THREADS
            )));
        }

        self.thread_list.push(thread);

        Ok(())
    }

    /// Append a normal stitch for the given thread
    pub fn append_stitch(&mut self, thread_index: usize, x: f32, y: f32) -> Result<()> {
        self.push_stitch(thread_index, x, y, false)
    }

    /// Append a jump stitch for the given thread
    pub fn append_jump_stitch(&mut self, thread_index: usize, x: f32, y: f32) -> Result<()> {
        self.push_stitch(thread_index, x, y, true)
    }

    /// Set the CEmbOne affine transform, translation in millimeters
    pub fn set_transform(&mut self, affine_transform: PesTransform) {
        self.affine_transform = affine_transform;
    }

    fn push_stitch(&mut self, thread_index: usize, x: f32, y: f32, jump: bool) -> Result<()> {
        if thread_index >= self.thread_list.len() {
            return Err(Error::Range(format!(
                "stitch references thread {} of {}",
                thread_index,
                self.thread_list.len()
            )));
        }

        let thread_change = self
            .stitch_list
            .last()
            .map_or(false, |last| last.thread_index != thread_index);

        if self.stitch_list.is_empty() || thread_change {
            let palette_index = palette_index_by_rgb(self.thread_list[thread_index].rgb);
            self.pec.append_thread(palette_index as u8)?;
        }

        if thread_change {
            self.pec.append_jump_stitch(x, y)?;
        } else if jump {
            self.pec.append_trim_stitch(x, y)?;
        } else {
            self.pec.append_stitch(x, y)?;
        }

        self.stitch_list.push(PesStitch {
            thread_index,
            x,
            y,
            jump,
        });
        self.bounds.update(x, y);

        // Jump stitches are encoded as two blocks.
        if self.is_block(self.stitch_list.len() - 1) {
            self.block_count += if self.stitch_list.len() == 1 { 1 } else { 2 };
        }

        Ok(())
    }

    /// Whether a new CSewSeg block starts at the given stitch index
    fn is_block(&self, stitch_index: usize) -> bool {
        stitch_index == 0
            || self.stitch_list[stitch_index].jump
            || self.stitch_list[stitch_index - 1].thread_index
                != self.stitch_list[stitch_index].thread_index
    }

    /// Number of stitches in the block starting at the given index
    fn block_stitch_count(&self, stitch_index: usize) -> usize {
        let mut count = 0;

        while stitch_index + count < self.stitch_list.len()
            && (count == 0 || !self.is_block(stitch_index + count))
        {
            count += 1;
        }

        count
    }

    /// Emit a version 1 PES file through the given byte sink
    pub fn emit1<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        let mut writer = SinkWriter::new(&mut sink);

        writer.write_str("#PES0001")?;
        self.encode_pec_offset1(&mut writer)?;
        writer.write_u16_le(0x0000)?;
        writer.write_u16_le(0x0001)?;
        writer.write_u16_le(0x0001)?;
        writer.write_u16_le(0xFFFF)?;
        writer.write_u16_le(0x0000)?;
        self.encode_sections(&mut writer)?;
        self.encode_pec(&mut writer)
    }

    /// Emit the companion PEC payload
    ///
    /// With no stitches appended the companion encoder has never seen a
    /// thread, so an empty design emits a scratch payload seeded from the
    /// thread list instead.
    fn encode_pec(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        if self.stitch_list.is_empty() && !self.thread_list.is_empty() {
            let mut pec = PecEncoder::new();
            for thread in &self.thread_list {
                pec.append_thread(palette_index_by_rgb(thread.rgb) as u8)?;
            }
            return pec.emit(|chunk| writer.write_bytes(chunk).is_ok());
        }

        self.pec.emit(|chunk| writer.write_bytes(chunk).is_ok())
    }

    /// Version 4 emit stub
    pub fn emit4<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        SinkWriter::new(&mut sink).write_str("#PES0040")?;
        Err(Error::Unsupported("PES version 4 encoding".to_string()))
    }

    /// Version 5 emit stub
    pub fn emit5<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        SinkWriter::new(&mut sink).write_str("#PES0050")?;
        Err(Error::Unsupported("PES version 5 encoding".to_string()))
    }

    /// Version 6 emit stub
    pub fn emit6<F: FnMut(&[u8]) -> bool>(&self, mut sink: F) -> Result<()> {
        SinkWriter::new(&mut sink).write_str("#PES0060")?;
        Err(Error::Unsupported("PES version 6 encoding".to_string()))
    }

    /// Size in bytes of the file `emit1` would produce
    pub fn size_1(&self) -> Result<usize> {
        let mut total = 0usize;
        self.emit1(|chunk| {
            total += chunk.len();
            true
        })?;
        Ok(total)
    }

    /// Version 4 size stub
    pub fn size_4(&self) -> Result<usize> {
        Err(Error::Unsupported("PES version 4 encoding".to_string()))
    }

    /// Version 5 size stub
    pub fn size_5(&self) -> Result<usize> {
        Err(Error::Unsupported("PES version 5 encoding".to_string()))
    }

    /// Version 6 size stub
    pub fn size_6(&self) -> Result<usize> {
        Err(Error::Unsupported("PES version 6 encoding".to_string()))
    }

    fn encode_pec_offset1(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut pec_offset = HEADER1_SIZE;
        {
            let mut count = |chunk: &[u8]| {
                pec_offset += chunk.len();
                true
            };
            let mut probe = SinkWriter::new(&mut count);
            self.encode_sections(&mut probe)?;
        }

        let pec_offset = i32::try_from(pec_offset)
            .map_err(|_| Error::Range(format!("PEC offset out of i32 range: {}", pec_offset)))?;
        writer.write_i32_le(pec_offset)
    }

    fn encode_sections(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        self.encode_cembone(writer)?;
        self.encode_csewseg(writer)
    }

    fn encode_transform(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut t = self.affine_transform;
        let physical_translation_scale = 1.0 / crate::core::stitch::raw_to_mm(1);

        t.matrix[2][0] *= physical_translation_scale;
        t.matrix[2][1] *= physical_translation_scale;

        for row in &t.matrix {
            writer.write_f32_le(row[0])?;
            writer.write_f32_le(row[1])?;
        }

        Ok(())
    }

    fn encode_cembone(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        // TODO: bounds are stored untransformed except for the translation
        // shift; a rotational transform would require recomputing them.
        let (translation_x, translation_y) = self.affine_transform.translation();
        let t_x = mm_to_raw(translation_x);
        let t_y = mm_to_raw(translation_y);

        let min_x = mm_to_raw(self.bounds.min_x) + t_x;
        let min_y = mm_to_raw(self.bounds.min_y) + t_y;
        let max_x = mm_to_raw(self.bounds.max_x) + t_x;
        let max_y = mm_to_raw(self.bounds.max_y) + t_y;

        let width = if self.bounds.valid { max_x - min_x } else { 0 };
        let height = if self.bounds.valid { max_y - min_y } else { 0 };

        writer.write_marker("CEmbOne")?;
        for _ in 0..2 {
            writer.write_i16_le(checked_i16(min_x, "bounds min x")?)?;
            writer.write_i16_le(checked_i16(min_y, "bounds min y")?)?;
            writer.write_i16_le(checked_i16(max_x, "bounds max x")?)?;
            writer.write_i16_le(checked_i16(max_y, "bounds max y")?)?;
        }
        self.encode_transform(writer)?;
        writer.write_u16_le(1)?;
        // TODO: the meaning of the stored translation pair is unknown;
        // files written here always carry zero.
        writer.write_i16_le(0)?;
        writer.write_i16_le(0)?;
        writer.write_u16_le(checked_u16(width as usize, "width")?)?;
        writer.write_u16_le(checked_u16(height as usize, "height")?)?;
        writer.write_bytes(&[0; 8])?;
        writer.write_u16_le(checked_u16(self.block_count, "block count")?)?;
        writer.write_u16_le(0xFFFF)?;
        writer.write_u16_le(0x0000)
    }

    fn encode_block_header(
        &self,
        writer: &mut SinkWriter<'_>,
        kind: StitchKind,
        thread_index: usize,
        stitch_count: usize,
    ) -> Result<()> {
        writer.write_u16_le(kind.code())?;
        writer.write_u16_le(checked_u16(thread_index + 1, "block id")?)?;
        writer.write_u16_le(checked_u16(stitch_count, "block stitch count")?)
    }

    fn encode_coordinates(&self, writer: &mut SinkWriter<'_>, x: f32, y: f32) -> Result<()> {
        writer.write_i16_le(checked_i16(mm_to_raw(x), "stitch x")?)?;
        writer.write_i16_le(checked_i16(mm_to_raw(y), "stitch y")?)
    }

    fn encode_stitch_list(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        for (i, stitch) in self.stitch_list.iter().enumerate() {
            if i == 0 {
                self.encode_block_header(
                    writer,
                    StitchKind::Normal,
                    stitch.thread_index,
                    self.block_stitch_count(i),
                )?;
            } else if self.is_block(i) {
                // A jump is either explicit or implicit on a thread
                // change; both split the run with a two-stitch Jump block.
                let previous = &self.stitch_list[i - 1];

                writer.write_u16_le(0x8003)?;
                self.encode_block_header(writer, StitchKind::Jump, stitch.thread_index, 2)?;
                self.encode_coordinates(writer, previous.x, previous.y)?;
                self.encode_coordinates(writer, stitch.x, stitch.y)?;
                writer.write_u16_le(0x8003)?;

                self.encode_block_header(
                    writer,
                    StitchKind::Normal,
                    stitch.thread_index,
                    self.block_stitch_count(i),
                )?;
            }

            self.encode_coordinates(writer, stitch.x, stitch.y)?;
        }

        Ok(())
    }

    fn encode_thread_list(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        let mut change_count = 0;
        for i in 0..self.stitch_list.len() {
            if i == 0
                || self.stitch_list[i - 1].thread_index != self.stitch_list[i].thread_index
            {
                change_count += 1;
            }
        }

        writer.write_u16_le(checked_u16(change_count, "change count")?)?;

        let mut block_index = 0usize;
        for (i, stitch) in self.stitch_list.iter().enumerate() {
            if i == 0 || self.stitch_list[i - 1].thread_index != stitch.thread_index {
                writer.write_u16_le(checked_u16(block_index, "change block index")?)?;

                let thread = &self.thread_list[stitch.thread_index];
                let palette_index = palette_index_by_rgb(thread.rgb);
                writer.write_u16_le(palette_index as u16)?;
            }

            // Jump stitches are encoded as two blocks.
            if self.is_block(i) {
                block_index += if i == 0 { 1 } else { 2 };
            }
        }

        writer.write_u16_le(0)?;
        writer.write_u16_le(0)
    }

    fn encode_csewseg(&self, writer: &mut SinkWriter<'_>) -> Result<()> {
        writer.write_marker("CSewSeg")?;
        self.encode_stitch_list(writer)?;
        self.encode_thread_list(writer)
    }
}

impl Default for PesEncoder {
    fn default() -> Self {
        Self::new()
    }
}
