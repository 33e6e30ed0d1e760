use crate::{
    auth::{jwt::verify_token, policy::AdminPolicy},
    config::Config,
    error::ApiError,
    model::role::Role,
    models::TokenType,
};
use actix_web::{FromRequest, HttpMessage, HttpRequest, dev::Payload, web::Data};
use futures::future::{Ready, ready};

#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user_id: u64,
    pub email: String,
    pub role: Role,
    /// Resolved once through `AdminPolicy` when the token is checked
    pub is_admin: bool,
}

/// Validates a bearer access token and resolves the caller.
pub fn authenticate(
    token: &str,
    config: &Config,
    policy: &AdminPolicy,
) -> Result<AuthUser, ApiError> {
    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::Unauthorized("Invalid or expired token".into()))?;

    if claims.token_type != TokenType::Access {
        return Err(ApiError::Unauthorized("Access token required".into()));
    }

    let role = Role::from_id(claims.role)
        .ok_or_else(|| ApiError::Unauthorized("Invalid role".into()))?;

    Ok(AuthUser {
        user_id: claims.user_id,
        is_admin: policy.is_admin(&claims.sub, role),
        email: claims.sub,
        role,
    })
}

pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

impl FromRequest for AuthUser {
    type Error = ApiError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        // Already resolved by the auth middleware on protected scopes.
        if let Some(user) = req.extensions().get::<AuthUser>() {
            return ready(Ok(user.clone()));
        }

        let token = match bearer_token(req) {
            Some(t) => t,
            None => return ready(Err(ApiError::Unauthorized("Missing token".into()))),
        };

        let (config, policy) = match (
            req.app_data::<Data<Config>>(),
            req.app_data::<Data<AdminPolicy>>(),
        ) {
            (Some(c), Some(p)) => (c, p),
            _ => {
                tracing::error!("Config or admin policy missing from app data");
                return ready(Err(ApiError::Internal));
            }
        };

        ready(authenticate(token, config, policy))
    }
}

impl AuthUser {
    pub fn require_admin(&self) -> Result<(), ApiError> {
        if self.is_admin {
            Ok(())
        } else {
            Err(ApiError::forbidden("Admin only"))
        }
    }

    /// Members may only touch their own data; admins may touch anyone's.
    pub fn require_self_or_admin(&self, owner_id: u64) -> Result<(), ApiError> {
        if self.is_admin || self.user_id == owner_id {
            Ok(())
        } else {
            Err(ApiError::forbidden("Not allowed"))
        }
    }

    /// The member an admin asked about, or the caller when none was named.
    pub fn resolve_target(&self, requested: Option<u64>) -> Result<u64, ApiError> {
        match requested {
            Some(id) if id != self.user_id => {
                self.require_admin()?;
                Ok(id)
            }
            _ => Ok(self.user_id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::{generate_access_token, generate_refresh_token};
    use crate::config::Config;

    fn config() -> Config {
        Config::from_vars(&|key: &str| match key {
            "SERVER_ADDR" => Some("127.0.0.1:0".into()),
            "DATABASE_URL" => Some("mysql://localhost/messmates".into()),
            "JWT_SECRET" => Some("test-secret".into()),
            _ => None,
        })
        .unwrap()
    }

    fn member() -> AuthUser {
        AuthUser {
            user_id: 7,
            email: "asha@hostel.in".into(),
            role: Role::Member,
            is_admin: false,
        }
    }

    #[test]
    fn access_token_resolves_caller() {
        let config = config();
        let policy = AdminPolicy::new(["warden@mess.in"]);
        let token = generate_access_token(3, "warden@mess.in", Role::Member.id(), "test-secret", 60)
            .unwrap();

        let user = authenticate(&token, &config, &policy).unwrap();
        assert_eq!(user.user_id, 3);
        assert_eq!(user.role, Role::Member);
        assert!(user.is_admin);
    }

    #[test]
    fn refresh_token_is_not_an_access_token() {
        let config = config();
        let (token, _) =
            generate_refresh_token(3, "asha@hostel.in", Role::Member.id(), "test-secret", 60)
                .unwrap();
        assert!(matches!(
            authenticate(&token, &config, &AdminPolicy::default()),
            Err(ApiError::Unauthorized(_))
        ));
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let token =
            generate_access_token(3, "asha@hostel.in", Role::Member.id(), "other", 60).unwrap();
        assert!(authenticate(&token, &config(), &AdminPolicy::default()).is_err());
    }

    #[test]
    fn members_are_confined_to_their_own_rows() {
        let user = member();
        assert!(user.require_admin().is_err());
        assert!(user.require_self_or_admin(7).is_ok());
        assert!(user.require_self_or_admin(8).is_err());
        assert_eq!(user.resolve_target(None).unwrap(), 7);
        assert_eq!(user.resolve_target(Some(7)).unwrap(), 7);
        assert!(user.resolve_target(Some(8)).is_err());
    }

    #[test]
    fn admins_may_target_anyone() {
        let admin = AuthUser {
            is_admin: true,
            ..member()
        };
        assert_eq!(admin.resolve_target(Some(8)).unwrap(), 8);
        assert!(admin.require_self_or_admin(8).is_ok());
    }
}
