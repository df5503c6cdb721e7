use bitflags::bitflags;

bitflags! {
    /// PPUCTRL ($2000), write only.
    ///
    /// ```text
    /// VPHB SINN
    /// |||| ||++- base nametable, copied into the temporary address
    /// |||| |+--- PPUDATA step: 1 across, 32 down
    /// |||| +---- 8x8 sprite pattern page
    /// |||+------ background pattern page
    /// ||+------- 8x16 sprites
    /// |+-------- EXT pin direction (unused)
    /// +--------- NMI at the start of vblank
    /// ```
    /// See: https://www.nesdev.org/wiki/PPU_registers#PPUCTRL
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct ControlRegister: u8 {
        const NAMETABLE_LOW      = 0b0000_0001;
        const NAMETABLE_HIGH     = 0b0000_0010;
        const INCREMENT_DOWN     = 0b0000_0100;
        const SPRITE_PAGE        = 0b0000_1000;
        const BACKGROUND_PAGE    = 0b0001_0000;
        const TALL_SPRITES       = 0b0010_0000;
        const EXT_OUTPUT         = 0b0100_0000;
        const NMI_ENABLE         = 0b1000_0000;
    }
}

const PATTERN_PAGE_SIZE: u16 = 0x1000;

impl ControlRegister {
    pub fn vram_increment(&self) -> u16 {
        if self.contains(Self::INCREMENT_DOWN) { 32 } else { 1 }
    }

    pub fn nmi_enabled(&self) -> bool {
        self.contains(Self::NMI_ENABLE)
    }

    /// Nametable select, 0..=3
    pub fn base_nametable(&self) -> u16 {
        (self.bits() & 0b11) as u16
    }

    pub fn background_page(&self) -> u16 {
        if self.contains(Self::BACKGROUND_PAGE) { PATTERN_PAGE_SIZE } else { 0 }
    }

    /// Only used by 8x8 sprites; tall sprites pick the page from the tile index
    pub fn sprite_page(&self) -> u16 {
        if self.contains(Self::SPRITE_PAGE) { PATTERN_PAGE_SIZE } else { 0 }
    }

    pub fn tall_sprites(&self) -> bool {
        self.contains(Self::TALL_SPRITES)
    }

    pub fn sprite_height(&self) -> i32 {
        if self.tall_sprites() { 16 } else { 8 }
    }

    pub fn update(&mut self, value: u8) {
        *self = Self::from_bits_retain(value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_power_on_value() {
        let ctrl = ControlRegister::default();
        assert_eq!(ctrl.vram_increment(), 1);
        assert!(!ctrl.nmi_enabled());
        assert_eq!((ctrl.background_page(), ctrl.sprite_page()), (0, 0));
        assert_eq!(ctrl.sprite_height(), 8);
    }

    #[test]
    fn test_update_decodes_every_field() {
        let mut ctrl = ControlRegister::default();
        ctrl.update(0b1011_0110);
        assert!(ctrl.nmi_enabled());
        assert!(ctrl.tall_sprites());
        assert_eq!(ctrl.sprite_height(), 16);
        assert_eq!(ctrl.background_page(), 0x1000);
        assert_eq!(ctrl.sprite_page(), 0);
        assert_eq!(ctrl.vram_increment(), 32);
        assert_eq!(ctrl.base_nametable(), 2);
        assert_eq!(ctrl.bits(), 0b1011_0110);
    }
}
