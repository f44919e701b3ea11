pub mod config;
pub mod error;

pub use config::{KeyStoreBackend, KeyStoreConfig, LogConfig, OtpConfig, OtpSealConfig};
pub use error::{OtpError, OtpResult};
