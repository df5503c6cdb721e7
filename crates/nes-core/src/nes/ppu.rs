use crate::nes::bus::picture_bus::PictureBus;
use crate::nes::cartridge::Mapper;
use crate::nes::serialization::{self, Serializable};
use crate::trace;
use consts::*;
use log::error;
use registers::control_register::ControlRegister;
use registers::mask_register::MaskRegister;
use registers::status_register::StatusRegister;

pub mod consts;
pub mod registers;
mod render;
mod sprites;


/// Where the pipeline is within a frame.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
#[repr(u8)]
pub enum PipelineState {
    PreRender = 0,
    Render = 1,
    PostRender = 2,
    VerticalBlank = 3,
}

impl PipelineState {
    fn from_u8(value: u8) -> PipelineState {
        match value {
            0 => PipelineState::PreRender,
            1 => PipelineState::Render,
            2 => PipelineState::PostRender,
            3 => PipelineState::VerticalBlank,
            other => panic!("invalid pipeline state in state buffer: {other}"),
        }
    }
}

/// Rendering flavor, fixed at construction.
///
/// `Light` runs the same timing, scrolling and sprite-zero logic but never
/// resolves colors or writes the screen buffer.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum PipelineVariant {
    Full,
    Light,
}

impl PipelineVariant {
    pub fn from_headless(headless: bool) -> PipelineVariant {
        if headless {
            PipelineVariant::Light
        } else {
            PipelineVariant::Full
        }
    }
}

/// Picture processing unit, advanced one dot at a time.
///
/// The VRAM address registers hold the 15-bit scroll layout:
/// ```text
///  yyy NN YYYYY XXXXX
///  ||| || ||||| +++++-- coarse X scroll
///  ||| || +++++-------- coarse Y scroll
///  ||| ++-------------- nametable select
///  +++----------------- fine Y scroll
/// ```
/// and are masked down to 14 bits when used as picture bus addresses.
///
/// The screen buffer is allocated once. `clone_from` copies pixels into it
/// so a pointer from [`PPU::screen`] survives a state load.
#[derive(Debug)]
pub struct PPU {
    variant: PipelineVariant,
    pub(crate) screen: Vec<u32>,

    pipeline_state: PipelineState,
    cycles: u16,
    scanline: u16,
    is_even_frame: bool,

    data_address: u16,
    temp_address: u16,
    fine_x_scroll: u8,
    is_first_write: bool,
    data_buffer: u8,

    ctrl_register: ControlRegister,
    mask_register: MaskRegister,
    status_register: StatusRegister,

    sprite_memory: [u8; OAM_SIZE],
    sprite_data_address: u8,
    scanline_sprites: [u8; MAX_SPRITES_PER_LINE],
    sprite_count: usize,

    interrupt_pending: bool,
    total_dots: u64,
}

impl PPU {
    pub fn new(variant: PipelineVariant) -> PPU {
        let mut ppu = PPU {
            variant,
            screen: vec![0; SCREEN_WIDTH * SCREEN_HEIGHT],
            pipeline_state: PipelineState::PreRender,
            cycles: 0,
            scanline: 0,
            is_even_frame: true,
            data_address: 0,
            temp_address: 0,
            fine_x_scroll: 0,
            is_first_write: true,
            data_buffer: 0,
            ctrl_register: ControlRegister::default(),
            mask_register: MaskRegister::new(),
            status_register: StatusRegister::default(),
            sprite_memory: [0; OAM_SIZE],
            sprite_data_address: 0,
            scanline_sprites: [0; MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            interrupt_pending: false,
            total_dots: 0,
        };
        ppu.reset();
        ppu
    }

    /// Returns the pipeline to its power-on state. OAM and the screen buffer
    /// keep their contents.
    pub fn reset(&mut self) {
        self.ctrl_register = ControlRegister::default();
        self.mask_register = MaskRegister::new();
        self.status_register = StatusRegister::default();
        self.is_even_frame = true;
        self.is_first_write = true;
        self.data_address = 0;
        self.temp_address = 0;
        self.fine_x_scroll = 0;
        self.data_buffer = 0;
        self.cycles = 0;
        self.scanline = 0;
        self.sprite_data_address = 0;
        self.sprite_count = 0;
        self.interrupt_pending = false;
        self.total_dots = 0;
        self.pipeline_state = PipelineState::PreRender;
    }

    /// Advances the pipeline by one dot.
    pub fn cycle(&mut self, bus: &PictureBus, mapper: &Mapper) {
        match self.pipeline_state {
            PipelineState::PreRender => self.pre_render_dot(),
            PipelineState::Render => self.render_dot(bus, mapper),
            PipelineState::PostRender => self.post_render_dot(),
            PipelineState::VerticalBlank => self.vertical_blank_dot(),
        }
        self.total_dots += 1;
    }

    fn pre_render_dot(&mut self) {
        if self.cycles == 1 {
            self.status_register.set_vblank(false);
            self.status_register.set_sprite_zero_hit(false);
        } else if self.cycles == SCANLINE_VISIBLE_DOTS + 2 && self.mask_register.is_rendering() {
            self.copy_horizontal_bits();
        } else if self.cycles > 280 && self.cycles <= 304 && self.mask_register.is_rendering() {
            self.copy_vertical_bits();
        }

        // odd frames are one dot shorter while rendering
        let skip = (!self.is_even_frame && self.mask_register.is_rendering()) as u16;
        if self.cycles >= SCANLINE_END_CYCLE - skip {
            self.pipeline_state = PipelineState::Render;
            self.cycles = 0;
            self.scanline = 0;
        } else {
            self.cycles += 1;
        }
    }

    fn render_dot(&mut self, bus: &PictureBus, mapper: &Mapper) {
        if self.cycles > 0 && self.cycles <= SCANLINE_VISIBLE_DOTS {
            self.render_pixel(bus, mapper);
        } else if self.cycles == SCANLINE_VISIBLE_DOTS + 1 && self.mask_register.show_background() {
            self.increment_y();
        } else if self.cycles == SCANLINE_VISIBLE_DOTS + 2 && self.mask_register.is_rendering() {
            self.copy_horizontal_bits();
        }

        if self.cycles >= SCANLINE_END_CYCLE {
            self.evaluate_sprites();
            self.scanline += 1;
            self.cycles = 0;
            if self.scanline >= VISIBLE_SCANLINES {
                self.pipeline_state = PipelineState::PostRender;
            }
        } else {
            self.cycles += 1;
        }
    }

    fn post_render_dot(&mut self) {
        if self.cycles >= SCANLINE_END_CYCLE {
            self.scanline += 1;
            self.cycles = 0;
            self.pipeline_state = PipelineState::VerticalBlank;
        } else {
            self.cycles += 1;
        }
    }

    fn vertical_blank_dot(&mut self) {
        if self.cycles == 1 && self.scanline == VBLANK_START_SCANLINE {
            self.status_register.set_vblank(true);
            if self.ctrl_register.nmi_enabled() {
                trace!("[PPU] NMI raised");
                self.interrupt_pending = true;
            }
        }

        if self.cycles >= SCANLINE_END_CYCLE {
            self.scanline += 1;
            self.cycles = 0;
            if self.scanline >= FRAME_END_SCANLINE {
                self.pipeline_state = PipelineState::PreRender;
                self.scanline = 0;
                self.is_even_frame = !self.is_even_frame;
            }
        } else {
            self.cycles += 1;
        }
    }

    /// Takes the pending vertical-blank interrupt, if any.
    pub fn take_interrupt(&mut self) -> bool {
        std::mem::take(&mut self.interrupt_pending)
    }

    // Register access
    /////////////////////

    /// $2000 write
    pub fn control(&mut self, value: u8) {
        self.ctrl_register.update(value);
        // t: ...GH.. ........ <- d: ......GH
        self.temp_address =
            (self.temp_address & !0x0C00) | (self.ctrl_register.base_nametable() << 10);
    }

    /// $2001 write
    pub fn set_mask(&mut self, value: u8) {
        self.mask_register.update(value);
    }

    /// $2002 read. Clears the vblank flag and the write toggle.
    pub fn get_status(&mut self) -> u8 {
        let status = self.status_register.bits();
        self.status_register.set_vblank(false);
        self.is_first_write = true;
        status
    }

    /// $2003 write
    pub fn set_oam_address(&mut self, address: u8) {
        self.sprite_data_address = address;
    }

    /// $2004 read
    pub fn get_oam_data(&self) -> u8 {
        self.sprite_memory[self.sprite_data_address as usize]
    }

    /// $2004 write
    pub fn set_oam_data(&mut self, value: u8) {
        self.sprite_memory[self.sprite_data_address as usize] = value;
        self.sprite_data_address = self.sprite_data_address.wrapping_add(1);
    }

    /// $2005 write
    pub fn set_scroll(&mut self, value: u8) {
        if self.is_first_write {
            // t: ....... ...ABCDE <- d: ABCDE...
            // x:              FGH <- d: .....FGH
            self.temp_address = (self.temp_address & !0x001F) | ((value >> 3) as u16);
            self.fine_x_scroll = value & 0x7;
        } else {
            // t: FGH..AB CDE..... <- d: ABCDEFGH
            self.temp_address = (self.temp_address & !0x73E0)
                | (((value & 0x7) as u16) << 12)
                | (((value & 0xF8) as u16) << 2);
        }
        self.is_first_write = !self.is_first_write;
    }

    /// $2006 write
    pub fn set_data_address(&mut self, value: u8) {
        if self.is_first_write {
            // t: .CDEFGH ........ <- d: ..CDEFGH
            //        <unused>     <- d: AB......
            // t: Z...... ........ <- 0 (bit Z is cleared)
            self.temp_address = (self.temp_address & 0x00FF) | (((value & 0x3F) as u16) << 8);
        } else {
            // t: ....... ABCDEFGH <- d: ABCDEFGH
            // v: <...all bits...> <- t: <...all bits...>
            self.temp_address = (self.temp_address & 0xFF00) | value as u16;
            self.data_address = self.temp_address;
        }
        self.is_first_write = !self.is_first_write;
    }

    /// $2007 read. Reads below the palette go through the one-byte buffer.
    pub fn get_data(&mut self, bus: &PictureBus, mapper: &Mapper) -> u8 {
        let address = self.data_address & 0x3FFF;
        let mut data = bus.read(mapper, address);
        if address < 0x3F00 {
            std::mem::swap(&mut data, &mut self.data_buffer);
        }
        self.increment_data_address();
        data
    }

    /// $2007 write
    pub fn set_data(&mut self, bus: &mut PictureBus, mapper: &mut Mapper, value: u8) {
        bus.write(mapper, self.data_address & 0x3FFF, value);
        self.increment_data_address();
    }

    fn increment_data_address(&mut self) {
        self.data_address =
            self.data_address.wrapping_add(self.ctrl_register.vram_increment()) & 0x7FFF;
    }

    /// Copies one page of CPU memory into OAM, starting at the OAM address
    /// and wrapping around.
    pub fn do_dma(&mut self, page: &[u8]) {
        if page.len() != OAM_SIZE {
            error!("OAM DMA source page has {} bytes", page.len());
            return;
        }
        let start = self.sprite_data_address as usize;
        let (head, tail) = page.split_at(OAM_SIZE - start);
        self.sprite_memory[start..].copy_from_slice(head);
        self.sprite_memory[..start].copy_from_slice(tail);
    }

    // Accessors
    /////////////

    pub fn variant(&self) -> PipelineVariant {
        self.variant
    }

    /// Last rendered frame as 0x00RRGGBB pixels. Stays black for the light
    /// variant.
    pub fn screen(&self) -> &[u32] {
        &self.screen
    }

    pub fn pipeline_state(&self) -> PipelineState {
        self.pipeline_state
    }

    pub fn scanline(&self) -> u16 {
        self.scanline
    }

    pub fn dot(&self) -> u16 {
        self.cycles
    }

    pub fn is_even_frame(&self) -> bool {
        self.is_even_frame
    }

    pub fn is_in_vblank(&self) -> bool {
        self.status_register.in_vblank()
    }

    pub fn is_sprite_zero_hit(&self) -> bool {
        self.status_register.sprite_zero_hit()
    }

    pub fn data_address(&self) -> u16 {
        self.data_address
    }

    pub fn temp_address(&self) -> u16 {
        self.temp_address
    }

    pub fn fine_x_scroll(&self) -> u8 {
        self.fine_x_scroll
    }

    pub fn sprite_memory(&self) -> &[u8; OAM_SIZE] {
        &self.sprite_memory
    }

    pub fn scanline_sprites(&self) -> &[u8] {
        &self.scanline_sprites[..self.sprite_count]
    }

    /// Dots executed since the last reset
    pub fn total_dots(&self) -> u64 {
        self.total_dots
    }
}

impl Clone for PPU {
    fn clone(&self) -> Self {
        let mut ppu = PPU::new(self.variant);
        ppu.clone_from(self);
        ppu
    }

    /// Copies every field except the pipeline variant, which is fixed at
    /// construction.
    fn clone_from(&mut self, source: &Self) {
        let PPU {
            variant: _,
            screen,
            pipeline_state,
            cycles,
            scanline,
            is_even_frame,
            data_address,
            temp_address,
            fine_x_scroll,
            is_first_write,
            data_buffer,
            ctrl_register,
            mask_register,
            status_register,
            sprite_memory,
            sprite_data_address,
            scanline_sprites,
            sprite_count,
            interrupt_pending,
            total_dots,
        } = source;

        self.screen.copy_from_slice(screen);
        self.pipeline_state = *pipeline_state;
        self.cycles = *cycles;
        self.scanline = *scanline;
        self.is_even_frame = *is_even_frame;
        self.data_address = *data_address;
        self.temp_address = *temp_address;
        self.fine_x_scroll = *fine_x_scroll;
        self.is_first_write = *is_first_write;
        self.data_buffer = *data_buffer;
        self.ctrl_register = *ctrl_register;
        self.mask_register = *mask_register;
        self.status_register = *status_register;
        self.sprite_memory = *sprite_memory;
        self.sprite_data_address = *sprite_data_address;
        self.scanline_sprites = *scanline_sprites;
        self.sprite_count = *sprite_count;
        self.interrupt_pending = *interrupt_pending;
        self.total_dots = *total_dots;
    }
}

impl Serializable for PPU {
    fn serialize(&self, buffer: &mut Vec<u8>) {
        serialization::write_int(buffer, self.pipeline_state as u8);
        serialization::write_int(buffer, self.cycles);
        serialization::write_int(buffer, self.scanline);
        serialization::write_bool(buffer, self.is_even_frame);
        serialization::write_int(buffer, self.data_address);
        serialization::write_int(buffer, self.temp_address);
        serialization::write_int(buffer, self.fine_x_scroll);
        serialization::write_bool(buffer, self.is_first_write);
        serialization::write_int(buffer, self.data_buffer);
        serialization::write_int(buffer, self.ctrl_register.bits());
        serialization::write_int(buffer, self.mask_register.bits());
        serialization::write_int(buffer, self.status_register.bits());
        serialization::write_bytes(buffer, &self.sprite_memory);
        serialization::write_int(buffer, self.sprite_data_address);
        serialization::write_bytes(buffer, self.scanline_sprites());
        serialization::write_bool(buffer, self.interrupt_pending);
        serialization::write_int(buffer, self.total_dots);
    }

    fn deserialize<'a>(&mut self, mut buffer: &'a [u8]) -> &'a [u8] {
        self.pipeline_state = PipelineState::from_u8(serialization::read_int(&mut buffer));
        self.cycles = serialization::read_int(&mut buffer);
        self.scanline = serialization::read_int(&mut buffer);
        self.is_even_frame = serialization::read_bool(&mut buffer);
        self.data_address = serialization::read_int(&mut buffer);
        self.temp_address = serialization::read_int(&mut buffer);
        self.fine_x_scroll = serialization::read_int(&mut buffer);
        self.is_first_write = serialization::read_bool(&mut buffer);
        self.data_buffer = serialization::read_int(&mut buffer);
        self.ctrl_register = ControlRegister::from_bits_truncate(serialization::read_int(&mut buffer));
        self.mask_register = MaskRegister::from_bits_truncate(serialization::read_int(&mut buffer));
        self.status_register = StatusRegister::from_bits_truncate(serialization::read_int(&mut buffer));
        serialization::read_bytes_into(&mut buffer, &mut self.sprite_memory);
        self.sprite_data_address = serialization::read_int(&mut buffer);
        let sprites = serialization::read_bytes(&mut buffer);
        assert!(
            sprites.len() <= MAX_SPRITES_PER_LINE,
            "state buffer holds {} scanline sprites",
            sprites.len()
        );
        self.sprite_count = sprites.len();
        self.scanline_sprites[..sprites.len()].copy_from_slice(&sprites);
        self.interrupt_pending = serialization::read_bool(&mut buffer);
        self.total_dots = serialization::read_int(&mut buffer);
        buffer
    }
}
