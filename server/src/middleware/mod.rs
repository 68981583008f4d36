pub mod chain;
pub mod csrf;
pub mod method;
pub mod session;

pub use chain::{compose, from_fn, handler_fn, mount, Handler, Middleware};
pub use csrf::{require_csrf, CsrfScope};
pub use method::allow_method;
pub use session::{require_session, Identity};
