pub use error::{FrameError, ProtocolError};
pub use message::{Envelope, Event, Message, Notification};

pub mod connection;
mod error;
mod message;
