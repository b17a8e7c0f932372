pub mod config;
pub mod csv;
pub mod model_store;
pub mod object_store;
pub mod registry;
pub mod scheduler;
pub mod sensor;
pub mod storage;

#[cfg(test)]
pub(crate) mod test_server;
