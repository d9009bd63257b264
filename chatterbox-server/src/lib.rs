#[macro_use]
extern crate tracing;

mod middleware;
mod routes;
mod server;
mod state;

#[cfg(test)]
mod tests;

pub use self::{server::Server, state::AppState};
