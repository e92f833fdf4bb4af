//! Serpentine LED ordering
//!
//! Panels are wired as one chain that snakes through the rows: even rows run
//! left to right, odd rows right to left. Both the encoder and anything that
//! reconstructs an image from the chain use these two functions.

/// Chain position of the LED at panel coordinates (x, y)
#[inline]
pub fn led_index(x: usize, y: usize, width: usize) -> usize {
    if y % 2 == 0 {
        y * width + x
    } else {
        y * width + (width - 1 - x)
    }
}

/// Panel coordinates of chain position `index`
#[inline]
pub fn coords(index: usize, width: usize) -> (usize, usize) {
    let y = index / width;
    let col = index % width;
    if y % 2 == 0 {
        (col, y)
    } else {
        (width - 1 - col, y)
    }
}
