//! Brother PEC thread color palette
//!
//! The 64 threads below have been verified with a Brother Innovis 955
//! sewing and embroidery machine and its "EMBROIDERY" thread space.
//! Palette indices are 1-based; index 0 is reserved for the undefined
//! thread.

use crate::core::thread::{PecThread, Rgb};
use lazy_static::lazy_static;

/// Number of threads in the PEC palette
pub const PEC_PALETTE_SIZE: usize = 64;

fn palette_thread(index: usize, name: &str, rgb: [u8; 3]) -> PecThread {
    PecThread::new(
        index,
        index.to_string(),
        "000",
        name,
        'A',
        Rgb::new(rgb[0], rgb[1], rgb[2]),
    )
}

lazy_static! {
    /// The fixed PEC thread palette in index order
    pub static ref PEC_THREADS: Vec<PecThread> = vec![
        palette_thread(1, "Prussian Blue", [26, 10, 148]),
        palette_thread(2, "Blue", [15, 117, 255]),
        palette_thread(3, "Teal Green", [0, 147, 76]),
        palette_thread(4, "Corn Flower Blue", [186, 189, 254]),
        palette_thread(5, "Red", [236, 0, 0]),
        palette_thread(6, "Reddish Brown", [228, 153, 90]),
        palette_thread(7, "Magenta", [204, 72, 171]),
        palette_thread(8, "Light Lilac", [253, 196, 250]),
        palette_thread(9, "Lilac", [221, 132, 205]),
        palette_thread(10, "Mint Green", [107, 211, 138]),
        palette_thread(11, "Deep Gold", [228, 169, 69]),
        palette_thread(12, "Orange", [255, 189, 66]),
        palette_thread(13, "Yellow", [255, 230, 0]),
        palette_thread(14, "Lime Green", [108, 217, 0]),
        palette_thread(15, "Brass", [193, 169, 65]),
        palette_thread(16, "Silver", [181, 173, 151]),
        palette_thread(17, "Russet Brown", [186, 156, 95]),
        palette_thread(18, "Cream Brown", [250, 245, 158]),
        palette_thread(19, "Pewter", [128, 128, 128]),
        palette_thread(20, "Black", [0, 0, 0]),
        palette_thread(21, "Ultramarine", [0, 28, 223]),
        palette_thread(22, "Royal Purple", [223, 0, 184]),
        palette_thread(23, "Dark Gray", [98, 98, 98]),
        palette_thread(24, "Dark Brown", [105, 38, 13]),
        palette_thread(25, "Deep Rose", [255, 0, 96]),
        palette_thread(26, "Light Brown", [191, 130, 0]),
        palette_thread(27, "Salmon Pink", [243, 145, 120]),
        palette_thread(28, "Vermillion", [255, 104, 5]),
        palette_thread(29, "White", [240, 240, 240]),
        palette_thread(30, "Violet", [200, 50, 205]),
        palette_thread(31, "Seacrest", [176, 191, 155]),
        palette_thread(32, "Sky Blue", [101, 191, 235]),
        palette_thread(33, "Pumpkin", [255, 186, 4]),
        palette_thread(34, "Cream Yellow", [255, 240, 108]),
        palette_thread(35, "Khaki", [254, 202, 21]),
        palette_thread(36, "Clay Brown", [243, 129, 1]),
        palette_thread(37, "Leaf Green", [55, 169, 35]),
        palette_thread(38, "Peacock Blue", [35, 70, 95]),
        palette_thread(39, "Gray", [166, 166, 149]),
        palette_thread(40, "Warm Gray", [206, 191, 166]),
        palette_thread(41, "Dark Olive", [150, 170, 2]),
        palette_thread(42, "Linen", [255, 227, 198]),
        palette_thread(43, "Pink", [255, 153, 215]),
        palette_thread(44, "Deep Green", [0, 112, 4]),
        palette_thread(45, "Lavender", [237, 204, 251]),
        palette_thread(46, "Wisteria Violet", [192, 137, 216]),
        palette_thread(47, "Beige", [231, 217, 180]),
        palette_thread(48, "Carmine", [233, 14, 134]),
        palette_thread(49, "Amber Red", [207, 104, 41]),
        palette_thread(50, "Olive Green", [64, 134, 21]),
        palette_thread(51, "Dark Fuschia", [219, 23, 151]),
        palette_thread(52, "Tangerine", [255, 167, 4]),
        palette_thread(53, "Light Blue", [185, 255, 255]),
        palette_thread(54, "Emerald Green", [34, 137, 39]),
        palette_thread(55, "Purple", [182, 18, 205]),
        palette_thread(56, "Moss Green", [0, 170, 0]),
        palette_thread(57, "Flesh Pink", [254, 169, 220]),
        palette_thread(58, "Harvest Gold", [254, 213, 16]),
        palette_thread(59, "Electric Blue", [0, 151, 223]),
        palette_thread(60, "Lemon Yellow", [255, 255, 132]),
        palette_thread(61, "Fresh Green", [207, 231, 116]),
        palette_thread(62, "Applique Material", [255, 200, 100]),
        palette_thread(63, "Applique Position", [255, 200, 200]),
        palette_thread(64, "Applique", [255, 200, 200]),
    ];
}

/// Look up a palette thread by its 1-based index
///
/// Returns the undefined thread for indices outside `1..=64`.
///
/// # Example
///
/// ```
/// use peslib::palettes::thread_pec::palette_thread_by_index;
///
/// assert_eq!(palette_thread_by_index(20).name, "Black");
/// assert_eq!(palette_thread_by_index(0).name, "Undefined");
/// ```
pub fn palette_thread_by_index(palette_index: usize) -> PecThread {
    if (1..=PEC_PALETTE_SIZE).contains(&palette_index) {
        PEC_THREADS[palette_index - 1].clone()
    } else {
        PecThread::undefined()
    }
}

/// Find the 1-based palette index closest to the given color
///
/// Distance is squared Euclidean distance in RGB space; ties are broken by
/// the first palette entry in index order.
pub fn palette_index_by_rgb(rgb: Rgb) -> usize {
    let mut best_index = 1;
    let mut best_distance = rgb.distance_squared(PEC_THREADS[0].rgb);

    for (i, thread) in PEC_THREADS.iter().enumerate().skip(1) {
        let distance = rgb.distance_squared(thread.rgb);
        if distance < best_distance {
            best_distance = distance;
            best_index = i + 1;
        }
    }

    best_index
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_palette_size_and_indices() {
        assert_eq!(PEC_THREADS.len(), PEC_PALETTE_SIZE);
        for i in 1..=PEC_PALETTE_SIZE {
            assert_eq!(palette_thread_by_index(i).index, i);
        }
    }

    #[test]
    fn test_out_of_range_is_undefined() {
        assert_eq!(palette_thread_by_index(0), PecThread::undefined());
        assert_eq!(palette_thread_by_index(65), PecThread::undefined());
    }

    #[test]
    fn test_exact_colors_map_to_themselves() {
        // Entry 64 repeats entry 63's color, so the first-wins rule maps
        // it back to 63; every other entry is unique.
        for thread in PEC_THREADS.iter() {
            let expect = if thread.index == 64 { 63 } else { thread.index };
            assert_eq!(palette_index_by_rgb(thread.rgb), expect);
        }
    }

    #[test]
    fn test_nearest_is_minimal() {
        let probes = [
            Rgb::new(0, 0, 0),
            Rgb::new(255, 255, 255),
            Rgb::new(254, 202, 21),
            Rgb::new(150, 170, 2),
            Rgb::new(17, 99, 201),
        ];
        for rgb in probes {
            let found = palette_thread_by_index(palette_index_by_rgb(rgb));
            let best = rgb.distance_squared(found.rgb);
            for thread in PEC_THREADS.iter() {
                assert!(best <= rgb.distance_squared(thread.rgb));
            }
        }
    }
}
