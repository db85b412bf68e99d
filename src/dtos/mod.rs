use serde::{Deserialize, Deserializer};

/// For partial updates on nullable columns: an absent field stays `None`
/// via `#[serde(default)]`, while an explicit JSON null becomes `Some(None)`.
/// Plain `Option<Option<T>>` would collapse both to `None`.
pub(crate) fn double_option<'de, T, D>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod dashboard;
pub mod expense;
pub mod sale;
pub mod setting;
pub mod supplier;
pub mod user;
