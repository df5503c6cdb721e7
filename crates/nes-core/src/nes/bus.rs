pub mod consts;
pub mod main_bus;
pub mod picture_bus;
pub mod system_bus;
