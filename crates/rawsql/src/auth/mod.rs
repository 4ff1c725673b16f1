//! Operator authentication: credential store, password verifiers, sessions.

pub mod credentials;
pub mod device;
pub mod password;
pub mod service;
pub mod session;

pub use credentials::{CredentialStore, InMemoryCredentialStore, Role, User};
pub use device::{local_device_id, AllowAllDevices, DeviceAllowList, DeviceAuthorizer};
pub use service::{AuthenticatedUser, AuthenticationService};
pub use session::{Clock, Session, SessionRegistry, SystemClock};

#[cfg(test)]
pub(crate) use session::ManualClock;
