pub mod use_cases;

pub use use_cases::csv_cleaner::CsvCleaner;
pub use use_cases::file_promotion::FilePromotionWorkflow;
pub use use_cases::model_loader::{LoadedModel, ModelLoader, ModelSource};
pub use use_cases::prediction::PredictionUseCase;
