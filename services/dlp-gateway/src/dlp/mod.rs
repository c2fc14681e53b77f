mod client;
pub mod credentials;
mod error;
pub mod model;
mod request;
mod service;

pub use client::DlpClient;
pub use credentials::{ServiceAccountKey, TokenSource};
pub use error::{CredentialsError, DlpError};
pub use request::{CommonAlphabet, FpeParams, MaskParams, TransformRequest, WrappedKey};
pub use service::DeidentifyService;
