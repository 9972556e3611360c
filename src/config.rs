/// Behaviours that differ between historical interpreters.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Quirks {
    /// 8XY6/8XYE shift VX and leave VY alone, instead of shifting VY into both.
    pub shift_in_place: bool,
    /// FX55/FX65 leave I pointing past the last register copied.
    pub load_store_increments_index: bool,
    /// Sprite pixels running off an edge reappear on the other side instead of
    /// being clipped.
    pub wrap_sprites: bool,
}

impl Default for Quirks {
    fn default() -> Self {
        Self {
            shift_in_place: false,
            load_store_increments_index: true,
            wrap_sprites: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Config {
    /// Timers count down once every this many cycles. 1 couples them to the
    /// instruction rate.
    pub cycles_per_timer_tick: u32,
    pub quirks: Quirks,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            cycles_per_timer_tick: 1,
            quirks: Quirks::default(),
        }
    }
}
