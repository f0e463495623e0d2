//! OpenID Connect: ID-token claims and strategy, and the implicit and hybrid
//! authorize flows.

pub mod claims;
pub mod strategy_jwt;
pub mod helper;
pub mod flow_implicit;
pub mod flow_hybrid;

pub use claims::IdTokenClaims;
pub use strategy_jwt::{DefaultIdTokenStrategy, IdTokenStrategy, SigningKeys};
pub use helper::IdTokenHandleHelper;
pub use flow_implicit::OpenIdConnectImplicitHandler;
pub use flow_hybrid::OpenIdConnectHybridHandler;
