pub mod hook;
pub mod region;

pub use hook::{CapturingSurface, TextSurface, TimerCapture, TimerReader};
pub use region::HudRegion;
