pub mod csv_cleaner;
pub mod file_promotion;
pub mod model_loader;
pub mod prediction;
