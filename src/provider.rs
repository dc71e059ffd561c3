//! Identity-provider descriptors (data) and strategies (behavior).
//!
//! `descriptor` holds validated endpoint metadata plus the grants and client
//! authentication style a provider accepts. `strategy` defines [`ProviderStrategy`], the
//! hook that maps token-endpoint rejections onto [`CredentialExchangeError`](crate::error::CredentialExchangeError).

pub mod descriptor;
pub mod strategy;

pub use descriptor::*;
pub use strategy::*;
