pub mod commands;
pub mod coordinator;
pub mod projections;

pub use commands::{command_channel, CommandSender, CoordinatorCommand};
pub use coordinator::*;
pub use projections::*;
