use anyhow::Context;
use minifb::{Key, Scale, Window, WindowOptions};

use emuchip::display::{HEIGHT, WIDTH};
use emuchip::keyboard::key_to_num;

const OFF: u32 = 0x00_00_00;
const ON: u32 = 0x00_7F_FF;

/// minifb window showing the framebuffer and collecting keypad input.
pub struct Screen {
    pixel_buffer: Vec<u32>,
    window: Window,
    last_key: Option<u8>,
}

impl Screen {
    pub fn new(scale: Scale) -> anyhow::Result<Self> {
        let mut window = Window::new(
            "emuchip - ESC to exit",
            WIDTH,
            HEIGHT,
            WindowOptions {
                scale,
                ..WindowOptions::default()
            },
        )
        .context("failed to open window")?;
        window.set_position(500, 300);
        Ok(Self {
            pixel_buffer: vec![OFF; WIDTH * HEIGHT],
            window,
            last_key: None,
        })
    }

    pub fn is_open(&self) -> bool {
        self.window.is_open() && !self.window.is_key_down(Key::Escape)
    }

    /// Repaint from a row-major 0/1 framebuffer.
    pub fn paint(&mut self, frame: &[u8]) -> anyhow::Result<()> {
        for (pixel, bit) in self.pixel_buffer.iter_mut().zip(frame) {
            *pixel = if *bit == 1 { ON } else { OFF };
        }
        self.window
            .update_with_buffer(&self.pixel_buffer, WIDTH, HEIGHT)
            .context("failed to update window")
    }

    /// Pump window events without repainting.
    pub fn poll(&mut self) {
        self.window.update();
    }

    /// The keypad key to latch for the next cycles: a freshly pressed key wins,
    /// otherwise the last one pressed while it is still held.
    pub fn key(&mut self) -> Option<u8> {
        let fresh = self
            .window
            .get_keys_pressed(minifb::KeyRepeat::No)
            .into_iter()
            .filter_map(key_to_num)
            .last();
        if fresh.is_some() {
            self.last_key = fresh;
            return fresh;
        }
        let held: Vec<u8> = self
            .window
            .get_keys()
            .into_iter()
            .filter_map(key_to_num)
            .collect();
        self.last_key = match self.last_key {
            Some(k) if held.contains(&k) => Some(k),
            _ => held.last().copied(),
        };
        self.last_key
    }
}
