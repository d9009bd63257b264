#[macro_use]
extern crate tracing;

pub use self::{
    clock::{Clock, ManualClock, SystemClock},
    database::Database,
};

mod clock;
mod database;
mod impls;

pub mod model;
