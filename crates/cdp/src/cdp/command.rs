//! Typed schema seam
//!
//! The engine only moves `Value`s. A protocol definition plugs in here by
//! naming the method and the param/result types for each command and event.

use serde::de::DeserializeOwned;
use serde::Serialize;

/// A command: its params are `Self`, its result is `Response`.
///
/// ```ignore
/// #[derive(Serialize)]
/// struct Navigate { url: String }
///
/// #[derive(Deserialize)]
/// #[serde(rename_all = "camelCase")]
/// struct NavigateResult { frame_id: String }
///
/// impl Command for Navigate {
///     const METHOD: &'static str = "Page.navigate";
///     type Response = NavigateResult;
/// }
/// ```
pub trait Command: Serialize + Send + Sync {
    const METHOD: &'static str;
    type Response: DeserializeOwned + Send;
}

/// Params of an event identified by `METHOD`
pub trait EventParams: DeserializeOwned {
    const METHOD: &'static str;
}
