//! HTTP client and the official account facade

mod api_client;
mod builder;
mod official_account;

pub use api_client::{ApiClient, ApiClientBuilder};
pub use builder::OfficialAccountBuilder;
pub use official_account::OfficialAccount;
