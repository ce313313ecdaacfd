pub mod memory;
pub mod ports;
pub mod recorder;
