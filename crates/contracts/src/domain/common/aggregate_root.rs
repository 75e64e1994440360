use super::{EntityMetadata, Origin};

/// Трейт для корня агрегата
pub trait AggregateRoot {
    /// Тип идентификатора агрегата
    type Id;

    /// ID записи
    fn id(&self) -> Self::Id;

    /// Бизнес-код записи (для товаров каталога это SKU или название)
    fn code(&self) -> &str;

    /// Описание/название записи
    fn description(&self) -> &str;

    fn metadata(&self) -> &EntityMetadata;

    fn metadata_mut(&mut self) -> &mut EntityMetadata;

    /// Индекс агрегата в системе (например, "a002")
    fn aggregate_index() -> &'static str;

    /// Имя коллекции для БД (например, "catalog_entry")
    fn collection_name() -> &'static str;

    /// Имя элемента для UI
    fn element_name() -> &'static str;

    /// Источник данных агрегата
    fn origin() -> Origin;

    /// Полное имя агрегата, оно же имя таблицы (например, "a002_catalog_entry")
    fn full_name() -> String {
        format!("{}_{}", Self::aggregate_index(), Self::collection_name())
    }
}
