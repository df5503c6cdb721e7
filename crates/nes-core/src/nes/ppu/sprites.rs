use super::PPU;
use super::consts::MAX_SPRITES_PER_LINE;
use super::render::SpritePixel;
use crate::nes::bus::picture_bus::PictureBus;
use crate::nes::cartridge::Mapper;

impl PPU {
    /// Picks up to eight sprites whose rows cover the current scanline. They
    /// are drawn on the following line.
    pub(super) fn evaluate_sprites(&mut self) {
        let height = self.ctrl_register.sprite_height();
        self.sprite_count = 0;
        for index in (self.sprite_data_address / 4) as usize..64 {
            let diff = self.scanline as i32 - self.sprite_memory[index * 4] as i32;
            if (0..height).contains(&diff) {
                self.scanline_sprites[self.sprite_count] = index as u8;
                self.sprite_count += 1;
                if self.sprite_count >= MAX_SPRITES_PER_LINE {
                    break;
                }
            }
        }
    }

    /// First opaque sprite pixel at `(x, y)` in OAM order.
    ///
    /// Also latches the sprite-zero hit flag the first time sprite 0 overlaps
    /// an opaque background pixel.
    pub(super) fn sprite_pixel(
        &mut self,
        bus: &PictureBus,
        mapper: &Mapper,
        x: usize,
        y: usize,
        bg_opaque: bool,
        with_color: bool,
    ) -> Option<SpritePixel> {
        let height = self.ctrl_register.sprite_height();
        for n in 0..self.sprite_count {
            let index = self.scanline_sprites[n];
            let base = index as usize * 4;
            let sprite_x = self.sprite_memory[base + 3] as i32;
            let dx = x as i32 - sprite_x;
            if !(0..8).contains(&dx) {
                continue;
            }

            /*
                Byte 2 (attributes)
                76543210
                ||||||||
                ||||||++- Palette (4 to 7) of sprite
                |||+++--- Unimplemented (read 0)
                ||+------ Priority (0: in front of background; 1: behind background)
                |+------- Flip sprite horizontally
                +-------- Flip sprite vertically
            */
            let sprite_y = self.sprite_memory[base].wrapping_add(1) as i32;
            let tile = self.sprite_memory[base + 1] as u16;
            let attribute = self.sprite_memory[base + 2];

            let mut x_shift = dx % 8;
            let mut y_offset = (y as i32 - sprite_y).rem_euclid(height);
            if attribute & 0x40 == 0 {
                x_shift ^= 7;
            }
            if attribute & 0x80 != 0 {
                y_offset ^= height - 1;
            }

            let address = if height == 8 {
                tile * 16 + y_offset as u16 + self.ctrl_register.sprite_page()
            } else {
                // 8x16: bit 0 of the tile picks the table, bit 3 of the row the half
                let y_offset = ((y_offset & 7) | ((y_offset & 8) << 1)) as u16;
                ((tile >> 1) * 32 + y_offset) | ((tile & 1) << 12)
            };

            let mut color = (bus.read(mapper, address) >> x_shift) & 1;
            color |= ((bus.read(mapper, address + 8) >> x_shift) & 1) << 1;
            if color == 0 {
                continue;
            }

            if index == 0
                && bg_opaque
                && self.mask_register.show_background()
                && !self.status_register.sprite_zero_hit()
            {
                self.status_register.set_sprite_zero_hit(true);
            }

            if with_color {
                color |= 0x10 | ((attribute & 0x3) << 2);
            }
            return Some(SpritePixel {
                color,
                in_front: attribute & 0x20 == 0,
            });
        }
        None
    }
}
