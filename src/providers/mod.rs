mod ncconnect;
mod provider;

pub use ncconnect::{NcConnectProvider, PRODUCTION_BASE_URL, TEST_BASE_URL};
pub use provider::{ClientAuthMethod, OAuthProvider};
