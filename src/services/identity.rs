use std::sync::Arc;

use axum::http::HeaderMap;

use crate::{
    dao::{
        content_store::ContentStore,
        models::{Role, UserEntity},
    },
    error::ServiceError,
};

/// Header carrying the caller's external identity.
pub const USER_ID_HEADER: &str = "x-user-id";

/// Read the caller id from the request headers. Blank values count as absent.
pub fn caller_id(headers: &HeaderMap) -> Option<String> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
}

/// Resolve an optional caller id to its user record.
///
/// Anonymous callers resolve to `None`; an id naming no stored user is unauthorized.
pub async fn resolve_caller(
    store: &Arc<dyn ContentStore>,
    caller: Option<String>,
) -> Result<Option<UserEntity>, ServiceError> {
    let Some(id) = caller else {
        return Ok(None);
    };

    match store.find_user(id.clone()).await? {
        Some(user) => Ok(Some(user)),
        None => Err(ServiceError::Unauthorized(format!("unknown user `{id}`"))),
    }
}

/// Resolve a caller that must exist.
pub async fn require_user(
    store: &Arc<dyn ContentStore>,
    caller: Option<String>,
) -> Result<UserEntity, ServiceError> {
    resolve_caller(store, caller)
        .await?
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))
}

/// Resolve a caller that must hold the admin role.
pub async fn require_admin(
    store: &Arc<dyn ContentStore>,
    caller: Option<String>,
) -> Result<UserEntity, ServiceError> {
    let user = require_user(store, caller).await?;
    if user.role == Role::Admin {
        Ok(user)
    } else {
        Err(ServiceError::Forbidden("admin role required".into()))
    }
}

#[cfg(test)]
mod tests {
    use std::time::SystemTime;

    use axum::http::HeaderValue;

    use super::*;
    use crate::dao::content_store::memory::MemoryContentStore;

    fn user(id: &str, role: Role) -> UserEntity {
        UserEntity {
            id: id.into(),
            display_name: id.into(),
            role,
            total_games: 0,
            average_score: 0.0,
            created_at: SystemTime::now(),
        }
    }

    #[test]
    fn reads_trimmed_header() {
        let mut headers = HeaderMap::new();
        assert_eq!(caller_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static("  "));
        assert_eq!(caller_id(&headers), None);
        headers.insert(USER_ID_HEADER, HeaderValue::from_static(" ada "));
        assert_eq!(caller_id(&headers).as_deref(), Some("ada"));
    }

    #[tokio::test]
    async fn admin_checks_distinguish_unknown_and_forbidden() {
        let store: Arc<dyn ContentStore> = Arc::new(MemoryContentStore::new());
        store.save_user(user("root", Role::Admin)).await.unwrap();
        store.save_user(user("ada", Role::User)).await.unwrap();

        assert!(resolve_caller(&store, None).await.unwrap().is_none());
        assert!(matches!(
            require_admin(&store, None).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            require_admin(&store, Some("ghost".into())).await,
            Err(ServiceError::Unauthorized(_))
        ));
        assert!(matches!(
            require_admin(&store, Some("ada".into())).await,
            Err(ServiceError::Forbidden(_))
        ));
        assert_eq!(
            require_admin(&store, Some("root".into())).await.unwrap().id,
            "root"
        );
    }
}
