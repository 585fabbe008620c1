//! Hardware initialisation and output drivers.

pub mod hw_init;
pub mod indicator;
pub mod sh1107;
