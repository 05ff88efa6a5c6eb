//! User administration for the admin panel.

use std::sync::Arc;

use tracing::instrument;

use emporium_core::{Role, UserId};

use crate::db::{RepositoryError, UserStore};
use crate::models::{CurrentUser, Page, User, UserFilter, UserSummary};

use super::ShopError;

/// Users per page on the admin listing.
pub const USERS_PER_PAGE: u32 = 10;

/// Lists users and changes their roles.
#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserStore>,
}

impl AccountService {
    #[must_use]
    pub fn new(users: Arc<dyn UserStore>) -> Self {
        Self { users }
    }

    /// One page of users with their order counts, newest first.
    ///
    /// # Errors
    ///
    /// Returns `Repository` if the store fails.
    #[instrument(skip(self))]
    pub async fn list_users(&self, filter: &UserFilter) -> Result<Page<UserSummary>, ShopError> {
        Ok(self.users.list_users(filter, USERS_PER_PAGE).await?)
    }

    /// Change the role of `target`. Admins cannot change their own role.
    ///
    /// # Errors
    ///
    /// - `Validation` if `actor` targets themselves
    /// - `NotFound` if the user does not exist
    #[instrument(skip(self, actor), fields(actor_id = %actor.id))]
    pub async fn change_role(
        &self,
        actor: &CurrentUser,
        target: UserId,
        role: Role,
    ) -> Result<User, ShopError> {
        if actor.id == target {
            return Err(ShopError::Validation(
                "You cannot change your own role".to_string(),
            ));
        }
        let user = self
            .users
            .set_role(target, role)
            .await
            .map_err(|e| match e {
                RepositoryError::NotFound => ShopError::NotFound("user"),
                other => other.into(),
            })?;
        tracing::info!(user_id = %user.id, role = %user.role, "Role changed");
        Ok(user)
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use emporium_core::Email;

    use super::*;
    use crate::db::MemoryStore;
    use crate::models::NewUser;

    async fn user(store: &Arc<MemoryStore>, email: &str, role: Role) -> User {
        store
            .create_with_password(
                &NewUser {
                    email: Email::parse(email).unwrap(),
                    name: String::new(),
                    role,
                },
                "hash",
            )
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_admin_cannot_demote_themselves() {
        let store = Arc::new(MemoryStore::new());
        let admin = user(&store, "admin@example.com", Role::Admin).await;
        let accounts = AccountService::new(store.clone());

        let err = accounts
            .change_role(&CurrentUser::from(&admin), admin.id, Role::Customer)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::Validation(_)));
    }

    #[tokio::test]
    async fn test_change_role() {
        let store = Arc::new(MemoryStore::new());
        let admin = user(&store, "admin@example.com", Role::Admin).await;
        let clerk = user(&store, "clerk@example.com", Role::Customer).await;
        let accounts = AccountService::new(store.clone());
        let actor = CurrentUser::from(&admin);

        let updated = accounts
            .change_role(&actor, clerk.id, Role::Employee)
            .await
            .unwrap();
        assert_eq!(updated.role, Role::Employee);

        let err = accounts
            .change_role(&actor, UserId::new(999), Role::Employee)
            .await
            .unwrap_err();
        assert!(matches!(err, ShopError::NotFound("user")));
    }

    #[tokio::test]
    async fn test_list_users_filters_by_role() {
        let store = Arc::new(MemoryStore::new());
        user(&store, "admin@example.com", Role::Admin).await;
        user(&store, "a@example.com", Role::Customer).await;
        user(&store, "b@example.com", Role::Customer).await;
        let accounts = AccountService::new(store.clone());

        let page = accounts
            .list_users(&UserFilter {
                role: Some(Role::Customer),
                ..UserFilter::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 2);
        assert!(page.items.iter().all(|s| s.user.role == Role::Customer));
    }
}
