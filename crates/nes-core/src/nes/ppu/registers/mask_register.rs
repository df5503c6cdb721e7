use bitflags::bitflags;

bitflags! {
    /* See: https://www.nesdev.org/wiki/PPU_registers#PPUMASK
        7  bit  0
        ---- ----
        BGRs bMmG
        |||| ||||
        |||| |||+- Greyscale (0: normal color, 1: greyscale)
        |||| ||+-- 1: Show background in leftmost 8 pixels of screen, 0: Hide
        |||| |+--- 1: Show sprites in leftmost 8 pixels of screen, 0: Hide
        |||| +---- 1: Enable background rendering
        |||+------ 1: Enable sprite rendering
        ||+------- Emphasize red
        |+-------- Emphasize green
        +--------- Emphasize blue
     */
    #[derive(Debug, Copy, Clone, PartialEq, Eq)]
    pub struct MaskRegister: u8 {
        const GREYSCALE                 = 0b0000_0001;
        const LEFTMOST_8PXL_BACKGROUND  = 0b0000_0010;
        const LEFTMOST_8PXL_SPRITE      = 0b0000_0100;
        const SHOW_BACKGROUND           = 0b0000_1000;
        const SHOW_SPRITES              = 0b0001_0000;
        const EMPHASISE_RED             = 0b0010_0000;
        const EMPHASISE_GREEN           = 0b0100_0000;
        const EMPHASISE_BLUE            = 0b1000_0000;
    }
}

impl MaskRegister {
    /// Power-on state: both layers shown, no edge clipping
    pub fn new() -> Self {
        MaskRegister::SHOW_BACKGROUND
            | MaskRegister::SHOW_SPRITES
            | MaskRegister::LEFTMOST_8PXL_BACKGROUND
            | MaskRegister::LEFTMOST_8PXL_SPRITE
    }

    pub fn is_greyscale(&self) -> bool {
        self.contains(MaskRegister::GREYSCALE)
    }

    pub fn hide_edge_background(&self) -> bool {
        !self.contains(MaskRegister::LEFTMOST_8PXL_BACKGROUND)
    }

    pub fn hide_edge_sprites(&self) -> bool {
        !self.contains(MaskRegister::LEFTMOST_8PXL_SPRITE)
    }

    pub fn show_background(&self) -> bool {
        self.contains(MaskRegister::SHOW_BACKGROUND)
    }

    pub fn show_sprites(&self) -> bool {
        self.contains(MaskRegister::SHOW_SPRITES)
    }

    /// Scroll copies and the odd-frame skip need both layers enabled
    pub fn is_rendering(&self) -> bool {
        self.show_background() && self.show_sprites()
    }

    pub fn update(&mut self, data: u8) {
        *self = MaskRegister::from_bits_truncate(data);
    }
}
