//! Jetons d'accès : cache et client OAuth2 TDX

pub mod cache;
pub mod tdx;

pub use cache::{FileTokenCache, MemoryTokenCache, Token, TokenCache};
pub use tdx::TdxAuth;
