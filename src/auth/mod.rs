//! Identity context and the role gate.

pub mod db;
pub mod middleware;
pub mod policy;

pub use middleware::{AuthContext, SESSION_COOKIE_NAME};
pub use policy::{authorize, Action, Forbidden};
