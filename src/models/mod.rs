pub mod alert;
pub mod event;
pub mod notification;
pub mod ticket;

pub use alert::*;
pub use event::*;
pub use notification::*;
pub use ticket::*;
