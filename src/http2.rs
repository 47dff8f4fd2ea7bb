//! HTTP/2 fingerprint settings.
//!
//! Everything a browser reveals at the HTTP/2 layer: which SETTINGS it sends
//! and in what order, the connection flow-control delta, the PRIORITY frames
//! fired right after the preface, the pseudo-header order, and the first
//! client stream id. An unset field is omitted from the SETTINGS frame;
//! `enable_push` is only emitted when explicitly set.

use std::borrow::Cow;

use hyper2::{Priority, PseudoOrder, SettingsOrder};
use typed_builder::TypedBuilder;

/// Configuration settings for an HTTP/2 connection.
#[derive(TypedBuilder, Clone, Debug)]
pub struct Http2Settings {
    /// The first client-initiated stream id. Browsers other than Firefox use
    /// the protocol default of 1; Firefox starts at 15.
    #[builder(default, setter(into))]
    pub initial_stream_id: Option<u32>,

    /// The connection-level flow control window delta, emitted as a
    /// `WINDOW_UPDATE` on stream 0 right after the preface.
    #[builder(default, setter(into))]
    pub initial_connection_window_size: Option<u32>,

    /// `SETTINGS_HEADER_TABLE_SIZE`.
    #[builder(default, setter(into))]
    pub header_table_size: Option<u32>,

    /// `SETTINGS_ENABLE_PUSH`; emitted only when explicitly set.
    #[builder(default, setter(into))]
    pub enable_push: Option<bool>,

    /// `SETTINGS_MAX_CONCURRENT_STREAMS`.
    #[builder(default, setter(into))]
    pub max_concurrent_streams: Option<u32>,

    /// `SETTINGS_INITIAL_WINDOW_SIZE`.
    #[builder(default, setter(into))]
    pub initial_stream_window_size: Option<u32>,

    /// `SETTINGS_MAX_FRAME_SIZE`.
    #[builder(default, setter(into))]
    pub max_frame_size: Option<u32>,

    /// `SETTINGS_MAX_HEADER_LIST_SIZE`.
    #[builder(default, setter(into))]
    pub max_header_list_size: Option<u32>,

    /// Reserved setting with identifier `8`
    /// (`SETTINGS_ENABLE_CONNECT_PROTOCOL`).
    #[builder(default, setter(into))]
    pub unknown_setting8: Option<bool>,

    /// Reserved setting with identifier `9`
    /// (`SETTINGS_NO_RFC7540_PRIORITIES`).
    #[builder(default, setter(into))]
    pub unknown_setting9: Option<bool>,

    /// Order in which the set SETTINGS fields appear in the frame.
    #[builder(default, setter(strip_option))]
    pub settings_order: Option<[SettingsOrder; 8]>,

    /// Stream dependency carried on every HEADERS frame, as
    /// `(dependency stream id, weight, exclusive)`.
    #[builder(default, setter(into))]
    pub headers_priority: Option<(u32, u8, bool)>,

    /// Order of the `:method`/`:scheme`/`:authority`/`:path` pseudo headers.
    #[builder(default, setter(into))]
    pub headers_pseudo_order: Option<[PseudoOrder; 4]>,

    /// PRIORITY frames emitted once, immediately after SETTINGS, in list
    /// order.
    #[builder(default, setter(strip_option, into))]
    pub priority: Option<Cow<'static, [Priority]>>,
}

impl Default for Http2Settings {
    fn default() -> Self {
        Http2Settings::builder().build()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hyper2::PseudoOrder::*;
    use hyper2::SettingsOrder::*;

    #[test]
    fn unset_fields_stay_omitted() {
        let settings = Http2Settings::default();
        assert!(settings.header_table_size.is_none());
        assert!(settings.enable_push.is_none());
        assert!(settings.priority.is_none());
    }

    #[test]
    fn chrome_shaped_settings() {
        let settings = Http2Settings::builder()
            .initial_stream_window_size(6291456)
            .initial_connection_window_size(15728640)
            .max_header_list_size(262144)
            .header_table_size(65536)
            .enable_push(false)
            .headers_priority((0, 255, true))
            .headers_pseudo_order([Method, Authority, Scheme, Path])
            .settings_order([
                HeaderTableSize,
                EnablePush,
                MaxConcurrentStreams,
                InitialWindowSize,
                MaxFrameSize,
                MaxHeaderListSize,
                UnknownSetting8,
                UnknownSetting9,
            ])
            .build();

        assert_eq!(settings.initial_stream_window_size, Some(6291456));
        assert_eq!(settings.enable_push, Some(false));
        assert_eq!(settings.headers_priority, Some((0, 255, true)));
        // Fields the profile does not pin stay out of the frame.
        assert!(settings.max_frame_size.is_none());
        assert!(settings.max_concurrent_streams.is_none());
    }
}
