//! Type definitions for WeChat Official Account entities

mod ids;

pub use ids::{AccessToken, AppId, AppSecret, VerifyToken};
