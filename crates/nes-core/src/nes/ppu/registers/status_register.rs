use bitflags::bitflags;

bitflags! {
    /// PPUSTATUS ($2002), read only. Reading it clears vblank.
    ///
    /// Only the top three bits are driven; sprite overflow is never raised.
    /// See: https://www.nesdev.org/wiki/PPU_registers#PPUSTATUS
    #[derive(Debug, Copy, Clone, PartialEq, Eq, Default)]
    pub struct StatusRegister: u8 {
        const SPRITE_OVERFLOW = 0b0010_0000;
        const SPRITE_ZERO_HIT = 0b0100_0000;
        const VBLANK          = 0b1000_0000;
    }
}

impl StatusRegister {
    pub fn in_vblank(&self) -> bool {
        self.contains(Self::VBLANK)
    }

    pub fn set_vblank(&mut self, value: bool) {
        self.set(Self::VBLANK, value);
    }

    pub fn sprite_zero_hit(&self) -> bool {
        self.contains(Self::SPRITE_ZERO_HIT)
    }

    pub fn set_sprite_zero_hit(&mut self, value: bool) {
        self.set(Self::SPRITE_ZERO_HIT, value);
    }
}
