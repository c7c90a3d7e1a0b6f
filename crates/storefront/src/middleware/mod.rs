//! HTTP middleware stack for storefront.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (hub per request, HTTP transaction)
//! 2. `TraceLayer` (request span)
//! 3. Timeout (whole request)
//! 4. Request ID (record in span, Sentry scope and response)
//! 5. Session layer (tower-sessions, store chosen by the caller of `app`)

pub mod customer;
pub mod request_id;
pub mod session;

pub use customer::{OptionalCustomer, set_current_customer};
pub use request_id::{REQUEST_ID_HEADER, request_id_middleware};
pub use session::configure_session_layer;
