//! 认证模块
//!
//! 校验外部身份服务签发的 JWT：
//! - [`JwtService`] - JWT 令牌服务
//! - [`CurrentUser`] - 当前用户上下文（axum 提取器）
//! - [`MaybeUser`] - 可选身份（游客下单）

pub mod extractor;
pub mod jwt;

pub use extractor::MaybeUser;
pub use jwt::{Claims, CurrentUser, JwtConfig, JwtError, JwtService, Role};
