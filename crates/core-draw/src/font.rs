//! Built-in 4x7 monospace digit bitmaps for the overlay number renderer.

pub const DIGIT_WIDTH: usize = 4;
pub const DIGIT_HEIGHT: usize = 7;
/// Horizontal gap inserted before every digit, in unscaled pixels.
pub const DIGIT_SPACING: usize = 4;

/// One row per digit, 1 = lit. Rendering multiplies by 255 and scales
/// uniformly.
#[rustfmt::skip]
pub const DIGIT_PIXELS: [[u8; DIGIT_WIDTH * DIGIT_HEIGHT]; 10] = [
    [1, 1, 1, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1],
    [0, 1, 1, 0,
     0, 0, 1, 0,
     0, 0, 1, 0,
     0, 0, 1, 0,
     0, 0, 1, 0,
     0, 0, 1, 0,
     1, 1, 1, 1],
    [1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     1, 1, 1, 1,
     1, 0, 0, 0,
     1, 0, 0, 0,
     1, 1, 1, 1],
    [1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     1, 1, 1, 1],
    [1, 0, 0, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     0, 0, 0, 1],
    [1, 1, 1, 1,
     1, 0, 0, 0,
     1, 0, 0, 0,
     1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     1, 1, 1, 1],
    [1, 1, 1, 1,
     1, 0, 0, 0,
     1, 0, 0, 0,
     1, 1, 1, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1],
    [1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     0, 0, 0, 1],
    [1, 1, 1, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1],
    [1, 1, 1, 1,
     1, 0, 0, 1,
     1, 0, 0, 1,
     1, 1, 1, 1,
     0, 0, 0, 1,
     0, 0, 0, 1,
     1, 1, 1, 1],
];

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_digit_lights_some_pixels() {
        for (digit, rows) in DIGIT_PIXELS.iter().enumerate() {
            let lit = rows.iter().filter(|&&b| b == 1).count();
            assert!(lit >= DIGIT_HEIGHT, "digit {digit} looks too sparse");
        }
    }

    #[test]
    fn bitmap_is_binary() {
        for rows in DIGIT_PIXELS.iter() {
            assert!(rows.iter().all(|&b| b <= 1));
        }
    }
}
