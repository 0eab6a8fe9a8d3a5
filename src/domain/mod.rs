pub mod game;
pub mod schedule;
pub mod stats;

pub use game::*;
pub use schedule::*;
pub use stats::*;
