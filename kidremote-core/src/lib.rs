pub mod actor;
pub mod bridge;
pub mod config;
pub mod content;
pub mod controller;
pub mod discovery;
pub mod dispatch;
pub mod error;
pub mod gate;
pub mod handlers;
pub mod lights;
pub mod overlay;
pub mod registry;
pub mod render;
pub mod storage;
pub mod surface;
pub mod timers;
pub mod util;

pub use kidremote_protocol as protocol;
