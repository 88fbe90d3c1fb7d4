use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

/// Deterministic value in `[0, 1]` derived from `id`.
pub fn stable_unit(id: &str) -> f32 {
    let mut hasher = DefaultHasher::new();
    id.hash(&mut hasher);
    let hash = hasher.finish();
    ((hash & 0xffff_ffff) as f64 / u32::MAX as f64) as f32
}
