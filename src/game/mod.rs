//! Client-side game simulation: prediction, reconciliation and effects

pub mod coords;
pub mod dust;
pub mod input;
pub mod map;
pub mod pose;
pub mod prediction;
pub mod session;
pub mod state;

pub use coords::{PixelPoint, TileGrid, TilePoint};
pub use input::{Action, InputEvent, InputState};
pub use map::MapDescriptor;
pub use session::{RenderFrame, Session, SessionStats};
pub use state::PlayerStore;
