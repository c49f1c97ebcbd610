//! Tunables for constructing a [`crate::queue::DocumentCommandQueue`].

use std::num::NonZeroUsize;

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct QueueConfig {
    /// Most undo steps kept per document. None keeps every step, and is written as `0`.
    #[serde(with = "history_depth")]
    pub max_history: Option<NonZeroUsize>,
    /// How many change notifications a slow listener may fall behind before it starts skipping them.
    pub notify_capacity: usize,
}
impl QueueConfig {
    pub const DEFAULT_MAX_HISTORY: usize = 100;
    pub const DEFAULT_NOTIFY_CAPACITY: usize = 64;
}
impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            max_history: NonZeroUsize::new(Self::DEFAULT_MAX_HISTORY),
            notify_capacity: Self::DEFAULT_NOTIFY_CAPACITY,
        }
    }
}

/// `0` for no limit, otherwise the limit itself.
mod history_depth {
    use std::num::NonZeroUsize;

    #[allow(clippy::ref_option)]
    pub fn serialize<S: serde::Serializer>(
        depth: &Option<NonZeroUsize>,
        serializer: S,
    ) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(depth.map_or(0, NonZeroUsize::get) as u64)
    }
    pub fn deserialize<'de, D: serde::Deserializer<'de>>(
        deserializer: D,
    ) -> Result<Option<NonZeroUsize>, D::Error> {
        let depth = <usize as serde::Deserialize>::deserialize(deserializer)?;
        Ok(NonZeroUsize::new(depth))
    }
}

#[cfg(test)]
mod test {
    use super::{history_depth, QueueConfig};
    use serde::de::{value::Error, IntoDeserializer};

    #[test]
    fn zero_depth_is_unbounded() {
        let depth = history_depth::deserialize(IntoDeserializer::<Error>::into_deserializer(0usize));
        assert_eq!(depth, Ok(None));
        let depth = history_depth::deserialize(IntoDeserializer::<Error>::into_deserializer(7usize));
        assert_eq!(depth.unwrap().map(std::num::NonZeroUsize::get), Some(7));
    }
    #[test]
    fn default_is_bounded() {
        assert_eq!(
            QueueConfig::default().max_history.map(std::num::NonZeroUsize::get),
            Some(QueueConfig::DEFAULT_MAX_HISTORY)
        );
    }
}
