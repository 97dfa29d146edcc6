mod geometry;
mod settings;

pub use geometry::{Point, ScreenFrame, Size};
pub use settings::SettingsStore;
