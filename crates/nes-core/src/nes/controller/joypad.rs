// See: https://www.nesdev.org/wiki/Standard_controller

use super::NesController;
use bitflags::bitflags;

bitflags! {
    /// Bit order of the button byte, which is also the order they shift out
    #[derive(Copy, Clone, Debug, PartialEq, Eq)]
    pub struct JoypadButtons: u8 {
        const BUTTON_A = 0b0000_0001;
        const BUTTON_B = 0b0000_0010;
        const SELECT   = 0b0000_0100;
        const START    = 0b0000_1000;
        const UP       = 0b0001_0000;
        const DOWN     = 0b0010_0000;
        const LEFT     = 0b0100_0000;
        const RIGHT    = 0b1000_0000;
    }
}

/// Open-bus bits the controller port leaves set on every read
const OPEN_BUS: u8 = 0x40;

/// Standard controller with an externally writable button byte.
#[derive(Debug, Clone, Default)]
pub struct Joypad {
    buttons: u8,
    shift_register: u8,
    strobe: bool,
}

impl NesController for Joypad {
    fn read(&mut self) -> u8 {
        let bit = if self.strobe {
            self.buttons & 1
        } else {
            let bit = self.shift_register & 1;
            self.shift_register >>= 1;
            bit
        };
        bit | OPEN_BUS
    }

    fn write(&mut self, data: u8) {
        self.strobe = data & 1 == 1;
        if !self.strobe {
            self.shift_register = self.buttons;
        }
    }
}

impl Joypad {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_button_status(&mut self, button: JoypadButtons, state: bool) {
        let mut buttons = JoypadButtons::from_bits_truncate(self.buttons);
        buttons.set(button, state);
        self.buttons = buttons.bits();
    }

    pub fn buttons(&self) -> JoypadButtons {
        JoypadButtons::from_bits_truncate(self.buttons)
    }

    /// Raw button byte, written by the host between frames
    pub fn buttons_mut(&mut self) -> &mut u8 {
        &mut self.buttons
    }
}
