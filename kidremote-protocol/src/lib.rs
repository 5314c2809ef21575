pub mod govee;
pub mod roku;
