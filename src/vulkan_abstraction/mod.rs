pub mod acceleration_structure;
pub mod backend;
pub mod buffer;
pub mod cmd_pool;
pub mod core;
pub mod queue;
pub mod synchronization;

pub use acceleration_structure::*;
pub use backend::*;
pub use buffer::*;
pub use cmd_pool::*;
pub use self::core::*;
pub use queue::*;
pub use synchronization::*;
