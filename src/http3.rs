//! HTTP/3 fingerprint settings.

use std::collections::BTreeMap;

use crate::util::fast_random;

/// `SETTINGS_QPACK_MAX_TABLE_CAPACITY`.
pub const SETTING_QPACK_MAX_TABLE_CAPACITY: u64 = 0x01;
/// `SETTINGS_MAX_FIELD_SECTION_SIZE`.
pub const SETTING_MAX_FIELD_SECTION_SIZE: u64 = 0x06;
/// `SETTINGS_QPACK_BLOCKED_STREAMS`.
pub const SETTING_QPACK_BLOCKED_STREAMS: u64 = 0x07;
/// `SETTINGS_ENABLE_CONNECT_PROTOCOL`.
pub const SETTING_ENABLE_CONNECT_PROTOCOL: u64 = 0x08;
/// `H3_DATAGRAM`.
pub const SETTING_H3_DATAGRAM: u64 = 0x33;

/// Settings carried in the HTTP/3 SETTINGS frame, plus an optional GREASE
/// entry.
///
/// The frame is an unordered id/value map on the wire; a stable map keeps the
/// emitted order deterministic for a given profile.
#[derive(Clone, Debug, Default)]
pub struct Http3Settings {
    settings: BTreeMap<u64, u64>,
    grease: bool,
}

impl Http3Settings {
    /// An empty settings set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets one id/value pair.
    pub fn set(mut self, id: u64, value: u64) -> Self {
        self.settings.insert(id, value);
        self
    }

    /// Appends one GREASE setting of the form `0x1f * n + 0x21` with a random
    /// value when the frame is built.
    pub fn grease(mut self, enabled: bool) -> Self {
        self.grease = enabled;
        self
    }

    /// The configured id/value pairs, without GREASE.
    pub fn entries(&self) -> impl Iterator<Item = (u64, u64)> + '_ {
        self.settings.iter().map(|(&id, &value)| (id, value))
    }

    /// Materializes the frame content, appending a GREASE entry when enabled.
    pub(crate) fn build(&self) -> Vec<(u64, u64)> {
        let mut entries: Vec<(u64, u64)> = self.entries().collect();
        if self.grease {
            entries.push((grease_setting_id(), fast_random() % 0xff));
        }
        entries
    }
}

/// A reserved HTTP/3 setting id: `0x1f * n + 0x21` (RFC 9114 §7.2.4.1).
fn grease_setting_id() -> u64 {
    0x1f * (fast_random() % 0x1000) + 0x21
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grease_id_shape() {
        for _ in 0..64 {
            let id = grease_setting_id();
            assert_eq!((id - 0x21) % 0x1f, 0);
        }
    }

    #[test]
    fn grease_appends_one_entry() {
        let settings = Http3Settings::new()
            .set(SETTING_QPACK_MAX_TABLE_CAPACITY, 65536)
            .set(SETTING_MAX_FIELD_SECTION_SIZE, 262144)
            .grease(true);

        let built = settings.build();
        assert_eq!(built.len(), 3);
        assert_eq!(built[0], (SETTING_QPACK_MAX_TABLE_CAPACITY, 65536));
        assert_eq!((built[2].0 - 0x21) % 0x1f, 0);
    }

    #[test]
    fn without_grease_only_configured_entries() {
        let settings = Http3Settings::new().set(SETTING_H3_DATAGRAM, 1);
        assert_eq!(settings.build(), vec![(SETTING_H3_DATAGRAM, 1)]);
    }
}
