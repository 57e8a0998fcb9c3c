pub mod config;
pub mod core;
pub mod display;
pub mod emulator;
pub mod input;
pub mod interface;
pub mod utils;
