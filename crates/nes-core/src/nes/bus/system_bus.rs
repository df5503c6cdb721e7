use super::main_bus::{IoRegister, MainBus, MainBusInterface, ReadCallback, WriteCallback};
use super::picture_bus::PictureBus;
use crate::nes::cartridge::Mapper;
use crate::nes::controller::NesController;
use crate::nes::controller::joypad::Joypad;
use crate::nes::cpu::CpuBusInterface;
use crate::nes::ppu::PPU;
use log::error;

/// Borrowed view of the devices behind the main bus for one CPU cycle.
pub struct IoPorts<'a> {
    pub picture_bus: &'a mut PictureBus,
    pub mapper: &'a mut Mapper,
    pub ppu: &'a mut PPU,
    pub controllers: &'a mut [Joypad; 2],
    pub dma_requested: bool,
}

impl MainBusInterface for IoPorts<'_> {
    fn read_prg(&mut self, address: u16) -> u8 {
        self.mapper.read_prg(address)
    }

    fn write_prg(&mut self, address: u16, value: u8) {
        self.mapper.write_prg(address, value);
    }

    fn read_register(&mut self, callback: ReadCallback) -> u8 {
        match callback {
            ReadCallback::PpuStatus => self.ppu.get_status(),
            ReadCallback::PpuData => self.ppu.get_data(self.picture_bus, self.mapper),
            ReadCallback::OamData => self.ppu.get_oam_data(),
            ReadCallback::Controller(port) => match self.controllers.get_mut(port) {
                Some(controller) => controller.read(),
                None => {
                    error!("Read from missing controller port {port}");
                    0
                }
            },
        }
    }

    fn write_register(&mut self, callback: WriteCallback, value: u8, bus: &MainBus) {
        match callback {
            WriteCallback::PpuControl => self.ppu.control(value),
            WriteCallback::PpuMask => self.ppu.set_mask(value),
            WriteCallback::OamAddress => self.ppu.set_oam_address(value),
            WriteCallback::OamData => self.ppu.set_oam_data(value),
            WriteCallback::PpuScroll => self.ppu.set_scroll(value),
            WriteCallback::PpuAddress => self.ppu.set_data_address(value),
            WriteCallback::PpuData => self.ppu.set_data(self.picture_bus, self.mapper, value),
            WriteCallback::OamDma => {
                if let Some(page) = bus.page(value) {
                    self.ppu.do_dma(page);
                }
                self.dma_requested = true;
            }
            WriteCallback::ControllerStrobe => {
                for controller in self.controllers.iter_mut() {
                    controller.write(value);
                }
            }
        }
    }
}

/// What the CPU sees: the main bus with its ports attached.
pub struct SystemBus<'a> {
    pub main_bus: &'a mut MainBus,
    pub ports: IoPorts<'a>,
}

impl CpuBusInterface for SystemBus<'_> {
    fn cpu_bus_read(&mut self, addr: u16) -> u8 {
        self.main_bus.read(addr, &mut self.ports)
    }

    fn cpu_bus_write(&mut self, addr: u16, value: u8) {
        self.main_bus.write(addr, value, &mut self.ports);
    }

    fn take_dma_request(&mut self) -> bool {
        std::mem::take(&mut self.ports.dma_requested)
    }
}

/// Binds every memory-mapped register to its picture unit or controller
/// handler, replacing whatever was bound before.
pub fn wire_callbacks(main_bus: &mut MainBus) {
    main_bus.clear_callbacks();

    main_bus.set_read_callback(IoRegister::PpuStatus, ReadCallback::PpuStatus);
    main_bus.set_read_callback(IoRegister::PpuData, ReadCallback::PpuData);
    main_bus.set_read_callback(IoRegister::OamData, ReadCallback::OamData);
    main_bus.set_read_callback(IoRegister::Joy1, ReadCallback::Controller(0));
    main_bus.set_read_callback(IoRegister::Joy2, ReadCallback::Controller(1));

    main_bus.set_write_callback(IoRegister::PpuCtrl, WriteCallback::PpuControl);
    main_bus.set_write_callback(IoRegister::PpuMask, WriteCallback::PpuMask);
    main_bus.set_write_callback(IoRegister::OamAddr, WriteCallback::OamAddress);
    main_bus.set_write_callback(IoRegister::OamData, WriteCallback::OamData);
    main_bus.set_write_callback(IoRegister::PpuScroll, WriteCallback::PpuScroll);
    main_bus.set_write_callback(IoRegister::PpuAddr, WriteCallback::PpuAddress);
    main_bus.set_write_callback(IoRegister::PpuData, WriteCallback::PpuData);
    main_bus.set_write_callback(IoRegister::OamDma, WriteCallback::OamDma);
    main_bus.set_write_callback(IoRegister::Joy1, WriteCallback::ControllerStrobe);
}
