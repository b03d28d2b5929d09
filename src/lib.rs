pub mod buffer;
pub mod cli;
pub mod protocol;
pub mod session;
pub mod tablet;

pub use cli::{Command, prompt};
pub use session::{Session, SessionConfig, SessionError};
pub use tablet::{DataType, Tablet, Value};
