//! # folio-identity
//!
//! Identity provider integrations for the folio platform.
//!
//! ## Providers
//!
//! - **GoTrue** (default): managed auth service exposing `/auth/v1/user`
//!
//! ## Usage
//!
//! ```rust,ignore
//! use folio_identity::GoTrueProvider;
//!
//! let provider = GoTrueProvider::from_env()?;
//! let user = provider.resolve(bearer_token).await?;
//! ```

pub mod gotrue;

pub use gotrue::{GoTrueConfig, GoTrueProvider};

// Re-export core types for convenience
pub use folio_core::{CoreError, IdentityProvider, Result, UserId};
