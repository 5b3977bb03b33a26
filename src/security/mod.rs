pub mod credentials;
pub mod renewal;

pub use credentials::{
    CredentialStore, FileCredentialStore, MemoryCredentialStore, ACCESS_TOKEN_KEY,
    REFRESH_TOKEN_KEY,
};
pub use renewal::{RenewalCoordinator, RenewalError};
