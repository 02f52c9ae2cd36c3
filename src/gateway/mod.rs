//! Clients for the application backend
//!
//! Two collaborators: the token endpoint that mints realtime credentials
//! (and creates the session record), and the session store that receives
//! the transcript at end-of-session and generates post-session analysis.

pub mod credentials;
pub mod store;

pub use credentials::{CredentialClient, TokenGrant};
pub use store::{SessionFinalization, SessionStore, StoredSession};
