/// Метаданные UseCase для идентификации и документирования
pub trait UseCaseMetadata {
    /// Индекс UseCase (например, "u501")
    fn usecase_index() -> &'static str;

    /// Техническое имя (например, "bulk_product_import")
    fn usecase_name() -> &'static str;

    /// Отображаемое имя для UI
    fn display_name() -> &'static str;

    fn description() -> &'static str {
        ""
    }

    /// Полное имя вида "u501_bulk_product_import"
    fn full_name() -> String {
        format!("{}_{}", Self::usecase_index(), Self::usecase_name())
    }
}
