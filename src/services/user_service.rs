use std::{sync::Arc, time::SystemTime};

use tracing::info;

use crate::{
    config::BootstrapAdmin,
    dao::{
        content_store::ContentStore,
        models::{Role, UserEntity},
        storage::StorageResult,
    },
    dto::public::{RegisterUserRequest, UserProfileResponse, UserSummary},
    error::ServiceError,
    services::identity::{self, USER_ID_HEADER},
    state::SharedState,
};

/// Create the caller's user record, or rename it when it already exists.
pub async fn register(
    state: &SharedState,
    caller: Option<String>,
    request: RegisterUserRequest,
) -> Result<UserSummary, ServiceError> {
    let id = caller
        .ok_or_else(|| ServiceError::Unauthorized(format!("missing `{USER_ID_HEADER}` header")))?;
    let store = state.require_store().await?;

    let user = match store.find_user(id.clone()).await? {
        Some(mut existing) => {
            existing.display_name = request.display_name;
            existing
        }
        None => {
            info!(user_id = %id, "registering user");
            UserEntity {
                id,
                display_name: request.display_name,
                role: Role::User,
                total_games: 0,
                average_score: 0.0,
                created_at: SystemTime::now(),
            }
        }
    };
    store.save_user(user.clone()).await?;
    Ok(user.into())
}

/// The caller's profile with per-language statistics.
pub async fn profile(
    state: &SharedState,
    caller: Option<String>,
) -> Result<UserProfileResponse, ServiceError> {
    let store = state.require_store().await?;
    let user = identity::require_user(&store, caller).await?;

    let mut stats = store.list_user_stats_for_user(user.id.clone()).await?;
    stats.sort_by(|a, b| a.language.cmp(&b.language));

    Ok(UserProfileResponse {
        user: user.into(),
        stats: stats.into_iter().map(Into::into).collect(),
    })
}

/// Upsert the configured bootstrap administrators with the admin role.
pub async fn seed_bootstrap_admins(
    store: &Arc<dyn ContentStore>,
    admins: &[BootstrapAdmin],
) -> StorageResult<()> {
    for admin in admins {
        match store.find_user(admin.id.clone()).await? {
            Some(existing) if existing.role == Role::Admin => continue,
            Some(mut existing) => {
                existing.role = Role::Admin;
                store.save_user(existing).await?;
            }
            None => {
                store
                    .save_user(UserEntity {
                        id: admin.id.clone(),
                        display_name: admin.display_name.clone(),
                        role: Role::Admin,
                        total_games: 0,
                        average_score: 0.0,
                        created_at: SystemTime::now(),
                    })
                    .await?;
            }
        }
        info!(user_id = %admin.id, "seeded bootstrap admin");
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::test_support::{add_user, state_with};

    #[tokio::test]
    async fn register_creates_then_renames() {
        let (state, store) = state_with(None).await;
        let created = register(
            &state,
            Some("ada".into()),
            RegisterUserRequest {
                display_name: "Ada".into(),
            },
        )
        .await
        .unwrap();
        assert_eq!(created.role, Role::User);

        register(
            &state,
            Some("ada".into()),
            RegisterUserRequest {
                display_name: "Countess".into(),
            },
        )
        .await
        .unwrap();
        let stored = store.find_user("ada".into()).await.unwrap().unwrap();
        assert_eq!(stored.display_name, "Countess");

        let anonymous = register(
            &state,
            None,
            RegisterUserRequest {
                display_name: "x".into(),
            },
        )
        .await;
        assert!(matches!(anonymous, Err(ServiceError::Unauthorized(_))));
    }

    #[tokio::test]
    async fn profile_requires_a_known_caller() {
        let (state, store) = state_with(None).await;
        add_user(&store, "ada", Role::User).await;

        let profile_view = profile(&state, Some("ada".into())).await.unwrap();
        assert_eq!(profile_view.user.id, "ada");
        assert!(profile_view.stats.is_empty());

        assert!(matches!(
            profile(&state, Some("ghost".into())).await,
            Err(ServiceError::Unauthorized(_))
        ));
    }

    #[tokio::test]
    async fn bootstrap_admins_are_promoted() {
        let (_state, store) = state_with(None).await;
        add_user(&store, "ada", Role::User).await;
        let store: Arc<dyn ContentStore> = Arc::new(store);

        let admins = [
            BootstrapAdmin {
                id: "ada".into(),
                display_name: "Ada".into(),
            },
            BootstrapAdmin {
                id: "root".into(),
                display_name: "Root".into(),
            },
        ];
        seed_bootstrap_admins(&store, &admins).await.unwrap();

        for id in ["ada", "root"] {
            let user = store.find_user(id.into()).await.unwrap().unwrap();
            assert_eq!(user.role, Role::Admin);
        }
        let ada = store.find_user("ada".into()).await.unwrap().unwrap();
        assert_eq!(ada.display_name, "ADA");
    }
}
