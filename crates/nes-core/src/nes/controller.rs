pub mod joypad;

/// A device plugged into one of the two controller ports ($4016/$4017).
pub trait NesController {
    fn read(&mut self) -> u8;
    fn write(&mut self, data: u8);
}
