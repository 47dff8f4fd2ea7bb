//! HTTP/1.1 connection options.

use typed_builder::TypedBuilder;

/// Configuration for HTTP/1.1 connections.
#[derive(TypedBuilder, Clone, Debug, Default)]
pub struct Http1Settings {
    /// Send header names in `Title-Case` instead of lowercase.
    #[builder(default = false)]
    pub title_case_headers: bool,

    /// Preserve the exact case of header names as set on the request.
    #[builder(default = true)]
    pub preserve_header_case: bool,

    /// Accept HTTP/0.9 responses.
    #[builder(default = false)]
    pub http09_responses: bool,

    /// Maximum number of response headers accepted.
    #[builder(default, setter(into))]
    pub max_headers: Option<usize>,
}
