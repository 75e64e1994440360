use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use tokio::sync::{Mutex as AsyncMutex, OwnedMutexGuard};

/// Не более одного запуска импорта на магазин.
///
/// Блокировка держится задачей импорта до ее завершения.
#[derive(Clone, Default)]
pub struct RunLocks {
    shops: Arc<Mutex<HashMap<String, Arc<AsyncMutex<()>>>>>,
}

pub type RunGuard = OwnedMutexGuard<()>;

impl RunLocks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Занять магазин; None, если для него уже идет импорт
    pub fn try_acquire(&self, shop: &str) -> Option<RunGuard> {
        let lock = {
            let mut shops = self.shops.lock().unwrap_or_else(PoisonError::into_inner);
            // Свободный замок держит только карта; занятый удерживает и guard
            shops.retain(|_, lock| Arc::strong_count(lock) > 1);
            shops
                .entry(shop.trim().to_lowercase())
                .or_default()
                .clone()
        };
        lock.try_lock_owned().ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_second_run_for_same_shop_is_rejected() {
        let locks = RunLocks::new();
        let guard = locks.try_acquire("acme.myshopify.com").unwrap();
        assert!(locks.try_acquire(" ACME.myshopify.com").is_none());
        assert!(locks.try_acquire("other.myshopify.com").is_some());

        drop(guard);
        assert!(locks.try_acquire("acme.myshopify.com").is_some());
    }

    #[test]
    fn test_idle_shops_are_forgotten() {
        let locks = RunLocks::new();
        let a = locks.try_acquire("a.myshopify.com").unwrap();
        let b = locks.try_acquire("b.myshopify.com").unwrap();
        drop(a);
        drop(b);

        let busy = locks.try_acquire("c.myshopify.com").unwrap();
        assert_eq!(locks.shops.lock().unwrap().len(), 1);
        assert!(locks.try_acquire("c.myshopify.com").is_none());
        assert_eq!(locks.shops.lock().unwrap().len(), 1);

        drop(busy);
        assert!(locks.try_acquire("c.myshopify.com").is_some());
    }
}
