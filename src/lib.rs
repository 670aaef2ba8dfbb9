pub mod app;
pub mod engine;
pub mod net;
pub mod proto;
pub mod queue;
pub mod scenario;
pub mod sim;

#[cfg(test)]
mod test;
