//! Affine transformation matrix for the PES CEmbOne region
//!
//! A 3×2 matrix in the file's row order, where
//!
//! ```text
//! [ a b ]                                          [ a c e ]
//! [ c d ] corresponds to the transformation matrix [ b d f ].
//! [ e f ]                                          [ 0 0 1 ]
//! ```
//!
//! The translation row `(e, f)` is stored in raw tenth-millimeter units on
//! disk; the decoders and encoders convert it to millimeters at the API
//! boundary.

use serde::{Deserialize, Serialize};

/// Affine 3×2 PES transformation matrix
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PesTransform {
    /// Matrix rows `[[a, b], [c, d], [e, f]]`
    pub matrix: [[f32; 2]; 3],
}

impl PesTransform {
    /// Create the identity transform
    ///
    /// # Example
    ///
    /// ```
    /// use peslib::core::matrix::PesTransform;
    ///
    /// assert!(PesTransform::identity().is_identity());
    /// ```
    pub fn identity() -> Self {
        Self {
            matrix: [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]],
        }
    }

    /// Create a transform from the six matrix entries in file order
    pub fn from_parts(a: f32, b: f32, c: f32, d: f32, e: f32, f: f32) -> Self {
        Self {
            matrix: [[a, b], [c, d], [e, f]],
        }
    }

    /// Whether this transform is exactly the identity
    pub fn is_identity(&self) -> bool {
        self.matrix == [[1.0, 0.0], [0.0, 1.0], [0.0, 0.0]]
    }

    /// Translation components `(e, f)`
    pub fn translation(&self) -> (f32, f32) {
        (self.matrix[2][0], self.matrix[2][1])
    }
}

impl Default for PesTransform {
    fn default() -> Self {
        Self::identity()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identity() {
        let transform = PesTransform::default();
        assert!(transform.is_identity());
        assert_eq!(transform.translation(), (0.0, 0.0));
    }

    #[test]
    fn test_non_identity() {
        let transform = PesTransform::from_parts(1.0, 0.0, 0.0, 1.0, 4.0, -2.5);
        assert!(!transform.is_identity());
        assert_eq!(transform.translation(), (4.0, -2.5));
    }
}
