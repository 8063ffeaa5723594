//! Thread color palettes
//!
//! This module contains the fixed thread color palette of the Brother PEC
//! format.

/// Brother PEC palette (64 colors)
pub mod thread_pec;
