pub mod controller;
pub mod state;
pub mod timing;

pub use controller::{PlaybackController, PlaybackSnapshot};
pub use state::{DisplayPreferences, LineAdvance, PlaybackStatus, PlayerMode, PlayerState};
