pub mod area;
pub mod area_run;
pub mod events;
pub mod navigator;
pub mod path;
pub mod ports;
pub mod settings;
pub mod waiter;

pub use area::*;
pub use area_run::*;
pub use events::*;
pub use navigator::*;
pub use path::*;
pub use ports::*;
pub use settings::*;
pub use waiter::*;
