pub mod error;
pub mod inference;
pub mod model;
pub mod promotion;
pub mod storage;

// CSV cleaning module
pub mod csv;
