pub mod bank;
pub mod order;
pub mod participant;

pub use bank::*;
pub use order::*;
pub use participant::*;
