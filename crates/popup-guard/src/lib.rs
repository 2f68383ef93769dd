//! Popup interception
//!
//! Promotional and tutorial overlays show up at unpredictable points and
//! block whatever step comes next. The catalog lists the known overlays in
//! priority order; the interceptor detects whichever one is visible and
//! works through its dismissal tactics. Dismissal failures are soft: they
//! are logged and the caller carries on.

pub mod catalog;
pub mod errors;
mod interceptor;

pub use catalog::{PopupCatalog, PopupDefinition, PopupKind, PROMO_POPUP, TUTORIAL_POPUP};
pub use errors::PopupError;
pub use interceptor::{DismissTactic, PopupInterceptor, PopupSettings};
