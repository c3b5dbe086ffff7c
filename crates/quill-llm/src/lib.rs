pub mod mock;

pub use mock::{MockModel, MockTurn};
