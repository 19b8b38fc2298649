pub mod coordination;
pub mod logger;
pub mod obstacle_tracking;
pub mod requirements;
pub mod traversal;

pub use coordination::*;
pub use logger::*;
pub use obstacle_tracking::*;
pub use requirements::*;
pub use traversal::*;
