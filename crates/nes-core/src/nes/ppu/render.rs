use super::consts::{NES_SYSTEM_PALETTE, SCREEN_WIDTH};
use super::{PPU, PipelineVariant};
use crate::nes::bus::picture_bus::PictureBus;
use crate::nes::cartridge::Mapper;

/// Sprite pixel selected for the current dot
pub(super) struct SpritePixel {
    pub color: u8,
    pub in_front: bool,
}

impl PPU {
    /// Produces the pixel for the current dot of a visible scanline.
    pub(super) fn render_pixel(&mut self, bus: &PictureBus, mapper: &Mapper) {
        let x = (self.cycles - 1) as usize;
        let y = self.scanline as usize;
        let with_color = self.variant == PipelineVariant::Full;

        let mut bg_color = 0;
        if self.mask_register.show_background() {
            let x_fine = (self.fine_x_scroll as usize + x) % 8;
            if !self.mask_register.hide_edge_background() || x >= 8 {
                bg_color = self.background_color(bus, mapper, x_fine as u8, with_color);
            }
            // advance to the next tile once its last column is drawn
            if x_fine == 7 {
                self.increment_coarse_x();
            }
        }
        let bg_opaque = bg_color & 0b11 != 0;

        let sprite = if self.mask_register.show_sprites()
            && (!self.mask_register.hide_edge_sprites() || x >= 8)
        {
            self.sprite_pixel(bus, mapper, x, y, bg_opaque, with_color)
        } else {
            None
        };

        if !with_color {
            return;
        }

        let palette_address = match sprite {
            Some(sprite) if !bg_opaque || sprite.in_front => sprite.color,
            _ if !bg_opaque => 0,
            _ => bg_color,
        };
        let mut color = bus.read_palette(palette_address) & 0x3F;
        if self.mask_register.is_greyscale() {
            color &= 0x30;
        }
        self.screen[y * SCREEN_WIDTH + x] = NES_SYSTEM_PALETTE[color as usize];
    }

    /// Two pattern bits for the tile under the VRAM address, plus the
    /// attribute palette bits when colors are wanted.
    fn background_color(
        &self,
        bus: &PictureBus,
        mapper: &Mapper,
        x_fine: u8,
        with_color: bool,
    ) -> u8 {
        let v = self.data_address;
        let tile = bus.read(mapper, 0x2000 | (v & 0x0FFF)) as u16;
        let address = (tile * 16 + ((v >> 12) & 0x7)) | self.ctrl_register.background_page();

        let shift = 7 ^ x_fine;
        let mut color = (bus.read(mapper, address) >> shift) & 1;
        color |= ((bus.read(mapper, address + 8) >> shift) & 1) << 1;

        if with_color && color != 0 {
            let attribute_address = 0x23C0 | (v & 0x0C00) | ((v >> 4) & 0x38) | ((v >> 2) & 0x07);
            let attribute = bus.read(mapper, attribute_address);
            let quadrant = ((v >> 4) & 4) | (v & 2);
            color |= ((attribute >> quadrant) & 0x3) << 2;
        }
        color
    }

    /* See: https://www.nesdev.org/wiki/PPU_scrolling#Coarse_X_increment */
    pub(super) fn increment_coarse_x(&mut self) {
        if self.data_address & 0x001F == 31 {
            self.data_address &= !0x001F;
            self.data_address ^= 0x0400;
        } else {
            self.data_address += 1;
        }
    }

    /* See: https://www.nesdev.org/wiki/PPU_scrolling#Y_increment */
    pub(super) fn increment_y(&mut self) {
        if self.data_address & 0x7000 != 0x7000 {
            self.data_address += 0x1000;
            return;
        }
        self.data_address &= !0x7000;
        let mut coarse_y = (self.data_address & 0x03E0) >> 5;
        if coarse_y == 29 {
            coarse_y = 0;
            self.data_address ^= 0x0800;
        } else if coarse_y == 31 {
            coarse_y = 0;
        } else {
            coarse_y += 1;
        }
        self.data_address = (self.data_address & !0x03E0) | (coarse_y << 5);
    }

    /// v: ....A.. ...BCDEF <- t: ....A.. ...BCDEF
    pub(super) fn copy_horizontal_bits(&mut self) {
        self.data_address = (self.data_address & !0x041F) | (self.temp_address & 0x041F);
    }

    /// v: GHIA.BC DEF..... <- t: GHIA.BC DEF.....
    pub(super) fn copy_vertical_bits(&mut self) {
        self.data_address = (self.data_address & !0x7BE0) | (self.temp_address & 0x7BE0);
    }
}
