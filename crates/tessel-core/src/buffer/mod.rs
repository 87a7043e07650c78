pub mod volume;

pub use volume::{PieceWriter, SharedOutput, Volume};
