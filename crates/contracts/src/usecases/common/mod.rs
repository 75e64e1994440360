//! Общие типы UseCase: метаданные и ошибки

pub mod usecase_metadata;
pub mod usecase_result;

pub use usecase_metadata::UseCaseMetadata;
pub use usecase_result::{codes, UseCaseError, UseCaseResult};
