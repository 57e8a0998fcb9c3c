pub mod address;
pub mod error;
pub mod fonts;
pub mod framestore;
pub mod graphics;
pub mod mode;
pub mod palette;
pub mod rotoscope;
