pub mod mapping;
pub mod markup;
pub mod progress;
pub mod record;
pub mod request;
pub mod response;

pub use mapping::{AttributeFilter, FieldMapping, FieldMappingEntry, TargetField};
pub use markup::{MarkupCondition, MarkupConfig, MarkupOperator, MarkupType, MatchMode};
pub use progress::{ImportSession, ImportStatus};
pub use record::{MarkupAudit, ReconciliationRecord, VariantData};
pub use request::{ApiCredentials, DataSource, ImportRequest, PreviewRequest, PublishMode};
pub use response::{AttributeValueCount, ImportResponse, ImportStartStatus, PreviewResponse};

use crate::usecases::common::UseCaseMetadata;

pub struct BulkProductImport;

impl UseCaseMetadata for BulkProductImport {
    fn usecase_index() -> &'static str {
        "u501"
    }

    fn usecase_name() -> &'static str {
        "bulk_product_import"
    }

    fn display_name() -> &'static str {
        "Массовый импорт товаров"
    }

    fn description() -> &'static str {
        "Загрузка товаров поставщика (CSV или API) с наценкой и сверкой с каталогом магазина"
    }
}
