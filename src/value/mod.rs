//! Модель значений RSER.
//!
//! - [`types`] — закрытое перечисление [`Value`] и вспомогательные структуры;
//! - [`eq`] — сравнение графов и отладочный вывод с поддержкой циклов;
//! - [`json`] — конвертация из `serde_json::Value`.

pub mod eq;
pub mod json;
pub mod types;

pub use eq::deep_eq;
pub use types::*;
