use minifb::Key;

/// Physical key to hex keypad code, standard 4x4 layout.
///
/// ```text
/// |1|2|3|4|      |1|2|3|C|
/// |Q|W|E|R|  ->  |4|5|6|D|
/// |A|S|D|F|  ->  |7|8|9|E|
/// |Z|X|C|V|      |A|0|B|F|
/// ```
pub const KEYMAP: [(Key, u8); 16] = [
    (Key::Key1, 0x1),
    (Key::Key2, 0x2),
    (Key::Key3, 0x3),
    (Key::Key4, 0xC),
    (Key::Q, 0x4),
    (Key::W, 0x5),
    (Key::E, 0x6),
    (Key::R, 0xD),
    (Key::A, 0x7),
    (Key::S, 0x8),
    (Key::D, 0x9),
    (Key::F, 0xE),
    (Key::Z, 0xA),
    (Key::X, 0x0),
    (Key::C, 0xB),
    (Key::V, 0xF),
];

pub fn key_to_num(key: Key) -> Option<u8> {
    KEYMAP
        .iter()
        .find(|(physical, _)| *physical == key)
        .map(|(_, num)| *num)
}

pub fn num_to_key(num: u8) -> Option<Key> {
    KEYMAP
        .iter()
        .find(|(_, code)| *code == num)
        .map(|(physical, _)| *physical)
}

/// The one key observed this cycle, if any.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct InputLatch {
    key: Option<u8>,
}

impl InputLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace whatever was latched. Codes above 0xF are dropped.
    pub fn set(&mut self, key: Option<u8>) {
        self.key = key.filter(|k| *k <= 0xF);
    }

    pub fn clear(&mut self) {
        self.key = None;
    }

    pub fn get(&self) -> Option<u8> {
        self.key
    }

    pub fn is_pressed(&self, num: u8) -> bool {
        self.key == Some(num)
    }
}
