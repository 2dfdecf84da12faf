use std::collections::HashMap;
use std::sync::{RwLock, RwLockReadGuard, RwLockWriteGuard};

use crate::model::tick::PriceTick;

/// Latest observed tick per symbol, shared between the feed workers and the HTTP routes.
#[derive(Debug, Default)]
pub struct PriceStore {
    prices: RwLock<HashMap<String, PriceTick>>,
}

impl PriceStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&self, tick: &PriceTick) {
        self.write().insert(tick.symbol.clone(), tick.clone());
    }

    pub fn get(&self, symbol: &str) -> Option<PriceTick> {
        self.read().get(symbol).cloned()
    }

    pub fn snapshot(&self) -> HashMap<String, PriceTick> {
        self.read().clone()
    }

    // A panicking writer cannot leave a half-written tick behind, so poison is ignored.
    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, PriceTick>> {
        self.prices.read().unwrap_or_else(|e| e.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, PriceTick>> {
        self.prices.write().unwrap_or_else(|e| e.into_inner())
    }
}
