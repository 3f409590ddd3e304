//! HTTP middleware stack.
//!
//! # Middleware Order (outermost first)
//!
//! 1. Sentry layers (capture errors and transactions)
//! 2. `TraceLayer` (request spans)
//! 3. Request ID (record and echo `x-request-id`)
//! 4. Security headers (CSP, frame options, etc.)
//! 5. Session layer (tower-sessions with `PostgreSQL` store)
//! 6. Rate limiting (governor), on the auth and API routes only
//!
//! Route handlers read the user and flashes through the extractors in
//! `auth` and the helpers in `flash`.

pub mod auth;
pub mod flash;
pub mod rate_limit;
pub mod request_id;
pub mod security_headers;
pub mod session;

pub use auth::{OptionalAuth, RequireAuth, clear_current_user, set_current_user};
pub use flash::{Flash, FlashKind, push_flash, push_flashes, take_flashes};
pub use rate_limit::{api_rate_limiter, auth_rate_limiter};
pub use request_id::request_id_middleware;
pub use security_headers::security_headers_middleware;
pub use session::create_session_layer;
