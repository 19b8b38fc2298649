pub mod buffered_logger;
pub mod console_logger;
pub mod file_logger;
pub mod manual_clock;
pub mod memory_logger;
pub mod multi_logger;
pub mod noop_logger;
pub mod simulated_world;

pub use buffered_logger::*;
pub use console_logger::*;
pub use file_logger::*;
pub use manual_clock::*;
pub use memory_logger::*;
pub use multi_logger::*;
pub use noop_logger::*;
pub use simulated_world::*;
