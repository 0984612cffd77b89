//! JWT 令牌校验
//!
//! 令牌由外部身份服务签发；本服务只负责校验并解析出 [`CurrentUser`]。
//! `generate_token` 仅用于开发环境和测试。

use chrono::{Duration, Utc};
use jsonwebtoken::errors::ErrorKind;
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};
use ring::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// 开发环境密钥长度
const DEV_SECRET_LEN: usize = 64;

/// JWT 配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JwtConfig {
    /// JWT 密钥 (应至少 32 字节)
    pub secret: String,
    /// 令牌过期时间 (分钟)，仅 `generate_token` 使用
    pub expiration_minutes: i64,
    /// 令牌签发者
    pub issuer: String,
    /// 令牌受众
    pub audience: String,
}

impl JwtConfig {
    /// 从环境变量加载
    ///
    /// 开发环境缺少 `JWT_SECRET` 时生成临时密钥；生产环境必须配置。
    pub fn from_env(is_production: bool) -> Result<Self, JwtError> {
        let secret = match std::env::var("JWT_SECRET") {
            Ok(secret) => {
                if secret.len() < 32 {
                    return Err(JwtError::ConfigError(
                        "JWT_SECRET must be at least 32 characters long".to_string(),
                    ));
                }
                secret
            }
            Err(_) if is_production => {
                return Err(JwtError::ConfigError(
                    "JWT_SECRET environment variable must be set in production!".to_string(),
                ));
            }
            Err(_) => {
                tracing::warn!(
                    "⚠️  JWT_SECRET not set! Generating secure temporary key for development."
                );
                generate_secure_printable_jwt_secret()?
            }
        };

        Ok(Self {
            secret,
            expiration_minutes: std::env::var("JWT_EXPIRATION_MINUTES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(1440), // 默认 24 小时
            issuer: std::env::var("JWT_ISSUER").unwrap_or_else(|_| "storefront-identity".to_string()),
            audience: std::env::var("JWT_AUDIENCE").unwrap_or_else(|_| "order-engine".to_string()),
        })
    }
}

/// 存储在令牌中的 JWT Claims
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    /// 用户 ID (Subject)
    pub sub: String,
    /// 邮箱
    #[serde(default)]
    pub email: Option<String>,
    /// 邮箱是否已验证
    #[serde(default)]
    pub email_verified: bool,
    /// 角色名称 ("admin" | "customer")
    pub role: String,
    /// 过期时间戳
    pub exp: i64,
    /// 签发时间戳
    pub iat: i64,
    /// 签发者
    pub iss: String,
    /// 受众
    pub aud: String,
}

/// JWT 错误
#[derive(Error, Debug)]
pub enum JwtError {
    #[error("无效令牌: {0}")]
    InvalidToken(String),

    #[error("令牌已过期")]
    ExpiredToken,

    #[error("无效签名")]
    InvalidSignature,

    #[error("令牌生成失败: {0}")]
    GenerationFailed(String),

    #[error("密钥生成失败: {0}")]
    KeyGenerationFailed(String),

    #[error("配置错误: {0}")]
    ConfigError(String),
}

/// 生成可打印的安全 JWT 密钥 (用于开发环境)
pub fn generate_secure_printable_jwt_secret() -> Result<String, JwtError> {
    const ALLOWED: &[u8] =
        b"ABCDEFGHIJKLMNOPQRSTUVWXYZabcdefghijklmnopqrstuvwxyz0123456789!@#$%^&*()-_=+";

    let rng = SystemRandom::new();
    let mut bytes = [0u8; DEV_SECRET_LEN];
    rng.fill(&mut bytes).map_err(|_| {
        JwtError::KeyGenerationFailed("Failed to generate secure random key".to_string())
    })?;

    Ok(bytes
        .iter()
        .map(|b| ALLOWED[*b as usize % ALLOWED.len()] as char)
        .collect())
}

/// JWT 令牌服务
#[derive(Clone)]
pub struct JwtService {
    pub config: JwtConfig,
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
}

impl std::fmt::Debug for JwtService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("JwtService")
            .field("issuer", &self.config.issuer)
            .field("audience", &self.config.audience)
            .finish_non_exhaustive()
    }
}

impl JwtService {
    /// 使用指定配置创建新的 JWT 服务
    pub fn with_config(config: JwtConfig) -> Self {
        let encoding_key = EncodingKey::from_secret(config.secret.as_bytes());
        let decoding_key = DecodingKey::from_secret(config.secret.as_bytes());

        Self {
            config,
            encoding_key,
            decoding_key,
        }
    }

    /// 签发令牌（开发/测试用）
    pub fn generate_token(
        &self,
        user_id: &str,
        email: Option<&str>,
        email_verified: bool,
        role: Role,
    ) -> Result<String, JwtError> {
        let now = Utc::now();
        let expiration = now + Duration::minutes(self.config.expiration_minutes);

        let claims = Claims {
            sub: user_id.to_string(),
            email: email.map(str::to_string),
            email_verified,
            role: role.as_str().to_string(),
            exp: expiration.timestamp(),
            iat: now.timestamp(),
            iss: self.config.issuer.clone(),
            aud: self.config.audience.clone(),
        };

        encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|e| JwtError::GenerationFailed(e.to_string()))
    }

    /// 验证并解码令牌
    pub fn validate_token(&self, token: &str) -> Result<Claims, JwtError> {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.set_audience(&[&self.config.audience]);
        validation.set_issuer(&[&self.config.issuer]);
        validation.set_required_spec_claims(&["sub", "exp", "iat", "iss", "aud"]);

        let token_data = decode::<Claims>(token, &self.decoding_key, &validation).map_err(|e| {
            match e.kind() {
                ErrorKind::ExpiredSignature => JwtError::ExpiredToken,
                ErrorKind::InvalidSignature => JwtError::InvalidSignature,
                ErrorKind::InvalidToken => JwtError::InvalidToken(e.to_string()),
                _ => JwtError::InvalidToken(format!("Token validation failed: {}", e)),
            }
        })?;

        Ok(token_data.claims)
    }

    /// 从 Authorization 头提取令牌
    pub fn extract_from_header(header: &str) -> Option<&str> {
        header.strip_prefix("Bearer ")
    }
}

/// 角色
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Customer,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Customer => "customer",
        }
    }
}

impl std::str::FromStr for Role {
    type Err = JwtError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "customer" => Ok(Role::Customer),
            other => Err(JwtError::InvalidToken(format!("unknown role: {}", other))),
        }
    }
}

/// 当前用户上下文 (从 JWT Claims 解析)
///
/// # 示例
///
/// ```ignore
/// async fn handler(user: CurrentUser) -> Json<()> {
///     if user.is_admin() {
///         // ...
///     }
/// }
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CurrentUser {
    /// 用户 ID
    pub id: String,
    pub email: Option<String>,
    pub email_verified: bool,
    pub role: Role,
}

impl TryFrom<Claims> for CurrentUser {
    type Error = JwtError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        if claims.sub.trim().is_empty() {
            return Err(JwtError::InvalidToken("empty subject".to_string()));
        }
        Ok(Self {
            id: claims.sub,
            email: claims.email,
            email_verified: claims.email_verified,
            role: claims.role.parse()?,
        })
    }
}

impl CurrentUser {
    pub fn customer(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            email_verified: false,
            role: Role::Customer,
        }
    }

    pub fn admin(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            email: None,
            email_verified: false,
            role: Role::Admin,
        }
    }

    /// 附带已验证邮箱
    pub fn with_verified_email(mut self, email: impl Into<String>) -> Self {
        self.email = Some(email.into());
        self.email_verified = true;
        self
    }

    /// 是否管理员
    pub fn is_admin(&self) -> bool {
        self.role == Role::Admin
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn service() -> JwtService {
        JwtService::with_config(JwtConfig {
            secret: "a-test-secret-that-is-long-enough-000".to_string(),
            expiration_minutes: 5,
            issuer: "test-issuer".to_string(),
            audience: "test-audience".to_string(),
        })
    }

    #[test]
    fn test_jwt_generation_and_validation() {
        let service = service();
        let token = service
            .generate_token("user123", Some("ann@example.com"), true, Role::Customer)
            .expect("Failed to generate test token");

        let claims = service
            .validate_token(&token)
            .expect("Failed to validate test token");
        assert_eq!(claims.sub, "user123");
        assert_eq!(claims.email.as_deref(), Some("ann@example.com"));
        assert!(claims.email_verified);

        let user = CurrentUser::try_from(claims).unwrap();
        assert_eq!(user.role, Role::Customer);
        assert!(!user.is_admin());
    }

    #[test]
    fn test_wrong_audience_rejected() {
        let token = service()
            .generate_token("user123", None, false, Role::Admin)
            .unwrap();

        let other = JwtService::with_config(JwtConfig {
            audience: "someone-else".to_string(),
            ..service().config
        });
        assert!(other.validate_token(&token).is_err());
    }

    #[test]
    fn test_unknown_role_is_malformed() {
        let claims = Claims {
            sub: "u".to_string(),
            email: None,
            email_verified: false,
            role: "superuser".to_string(),
            exp: 0,
            iat: 0,
            iss: String::new(),
            aud: String::new(),
        };
        assert!(CurrentUser::try_from(claims).is_err());
    }

    #[test]
    fn test_extract_from_header() {
        assert_eq!(JwtService::extract_from_header("Bearer abc"), Some("abc"));
        assert_eq!(JwtService::extract_from_header("Basic abc"), None);
    }

    #[test]
    fn test_printable_secret() {
        let a = generate_secure_printable_jwt_secret().unwrap();
        let b = generate_secure_printable_jwt_secret().unwrap();
        assert_eq!(a.len(), DEV_SECRET_LEN);
        assert_ne!(a, b);
    }
}
