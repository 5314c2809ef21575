//! Transient full-screen overlays.  Each one is a small start/stop state
//! machine; the controller owns the timer slots that drive them.

pub mod fireworks;
pub mod timer;

pub use self::{fireworks::FireworksOverlay, timer::TimerOverlay};
