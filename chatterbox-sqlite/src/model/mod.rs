pub use self::message::*;

mod message;
