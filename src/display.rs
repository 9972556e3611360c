use log::trace;

pub const WIDTH: usize = 64;
pub const HEIGHT: usize = 32;

/// Monochrome 64x32 screen, one byte per pixel, row-major, each 0 or 1.
#[derive(Debug, Clone)]
pub struct FrameBuffer {
    bit_buffer: [u8; WIDTH * HEIGHT],
    redraw: bool,
}

impl Default for FrameBuffer {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameBuffer {
    pub fn new() -> Self {
        Self {
            bit_buffer: [0; WIDTH * HEIGHT],
            redraw: false,
        }
    }

    pub fn clear_buffer(&mut self) {
        self.bit_buffer = [0; WIDTH * HEIGHT];
        self.redraw = true;
    }

    pub fn pixels(&self) -> &[u8] {
        &self.bit_buffer
    }

    pub fn pixel(&self, x: usize, y: usize) -> u8 {
        self.bit_buffer[y * WIDTH + x]
    }

    /// Reads and clears the redraw flag.
    pub fn take_redraw(&mut self) -> bool {
        std::mem::take(&mut self.redraw)
    }

    /// XOR `sprite` onto the screen with its top-left corner at (x, y).
    ///
    /// The origin always wraps around the screen; pixels running past an edge
    /// wrap too when `wrap` is set and are clipped otherwise. Returns whether
    /// any pixel went from set to unset.
    pub fn paint(&mut self, x: u8, y: u8, sprite: &[u8], wrap: bool) -> bool {
        trace!("painting sprite at ({x}, {y}): {sprite:02x?}");
        let (ox, oy) = (x as usize % WIDTH, y as usize % HEIGHT);
        let mut collision = false;
        for (i, row) in sprite.iter().enumerate() {
            for j in 0..8 {
                let bit = (row >> (7 - j)) & 1;
                if bit == 0 {
                    continue;
                }
                let (mut nx, mut ny) = (ox + j, oy + i);
                if nx >= WIDTH || ny >= HEIGHT {
                    if !wrap {
                        continue;
                    }
                    nx %= WIDTH;
                    ny %= HEIGHT;
                }
                let index = (ny * WIDTH) + nx;
                if self.bit_buffer[index] == 1 {
                    collision = true;
                }
                self.bit_buffer[index] ^= 1;
            }
        }
        self.redraw = true;
        collision
    }
}
