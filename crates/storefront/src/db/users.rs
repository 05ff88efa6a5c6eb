//! User queries.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use emporium_core::{Email, Role, UserId};

use super::{PgStore, RepositoryError, UserStore, conflict_on_unique};
use crate::models::{NewUser, Page, User, UserFilter, UserSummary};

#[derive(sqlx::FromRow)]
struct UserRow {
    id: UserId,
    email: String,
    name: String,
    role: Role,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<UserRow> for User {
    type Error = RepositoryError;

    fn try_from(row: UserRow) -> Result<Self, Self::Error> {
        let email = Email::parse(&row.email).map_err(|e| {
            RepositoryError::DataCorruption(format!("invalid email in database: {e}"))
        })?;

        Ok(Self {
            id: row.id,
            email,
            name: row.name,
            role: row.role,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(sqlx::FromRow)]
struct UserWithHashRow {
    #[sqlx(flatten)]
    user: UserRow,
    password_hash: String,
}

#[derive(sqlx::FromRow)]
struct UserSummaryRow {
    #[sqlx(flatten)]
    user: UserRow,
    order_count: i64,
}

#[async_trait]
impl UserStore for PgStore {
    async fn get_by_id(&self, id: UserId) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name, role, created_at, updated_at
            FROM storefront.user
            WHERE id = $1
            ",
        )
        .bind(id)
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn get_by_email(&self, email: &Email) -> Result<Option<User>, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            SELECT id, email, name, role, created_at, updated_at
            FROM storefront.user
            WHERE email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        row.map(User::try_from).transpose()
    }

    async fn create_with_password(
        &self,
        user: &NewUser,
        password_hash: &str,
    ) -> Result<User, RepositoryError> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, UserRow>(
            r"
            INSERT INTO storefront.user (email, name, role)
            VALUES ($1, $2, $3)
            RETURNING id, email, name, role, created_at, updated_at
            ",
        )
        .bind(user.email.as_str())
        .bind(&user.name)
        .bind(user.role)
        .fetch_one(&mut *tx)
        .await
        .map_err(|e| conflict_on_unique(e, "email"))?;

        sqlx::query(
            r"
            INSERT INTO storefront.user_password (user_id, password_hash)
            VALUES ($1, $2)
            ",
        )
        .bind(row.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;

        User::try_from(row)
    }

    async fn get_password_hash(
        &self,
        email: &Email,
    ) -> Result<Option<(User, String)>, RepositoryError> {
        let row = sqlx::query_as::<_, UserWithHashRow>(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at, u.updated_at, p.password_hash
            FROM storefront.user u
            JOIN storefront.user_password p ON p.user_id = u.id
            WHERE u.email = $1
            ",
        )
        .bind(email.as_str())
        .fetch_optional(&self.pool)
        .await?;

        match row {
            Some(r) => Ok(Some((User::try_from(r.user)?, r.password_hash))),
            None => Ok(None),
        }
    }

    async fn list_users(
        &self,
        filter: &UserFilter,
        per_page: u32,
    ) -> Result<Page<UserSummary>, RepositoryError> {
        let page = filter.page.max(1);
        let offset = i64::try_from(Page::<UserSummary>::offset(page, per_page)).unwrap_or(i64::MAX);
        let search = filter.search.as_deref().map(str::trim).filter(|s| !s.is_empty());

        let total: i64 = sqlx::query_scalar(
            r"
            SELECT COUNT(*)
            FROM storefront.user u
            WHERE ($1::TEXT IS NULL OR u.name ILIKE '%' || $1 || '%' OR u.email ILIKE '%' || $1 || '%')
              AND ($2::storefront.user_role IS NULL OR u.role = $2)
            ",
        )
        .bind(search)
        .bind(filter.role)
        .fetch_one(&self.pool)
        .await?;

        let rows = sqlx::query_as::<_, UserSummaryRow>(
            r"
            SELECT u.id, u.email, u.name, u.role, u.created_at, u.updated_at,
                   (SELECT COUNT(*) FROM storefront.order o WHERE o.user_id = u.id) AS order_count
            FROM storefront.user u
            WHERE ($1::TEXT IS NULL OR u.name ILIKE '%' || $1 || '%' OR u.email ILIKE '%' || $1 || '%')
              AND ($2::storefront.user_role IS NULL OR u.role = $2)
            ORDER BY u.created_at DESC, u.id DESC
            LIMIT $3 OFFSET $4
            ",
        )
        .bind(search)
        .bind(filter.role)
        .bind(i64::from(per_page))
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let items = rows
            .into_iter()
            .map(|r| {
                Ok(UserSummary {
                    user: User::try_from(r.user)?,
                    order_count: r.order_count,
                })
            })
            .collect::<Result<Vec<_>, RepositoryError>>()?;

        Ok(Page {
            items,
            page,
            per_page,
            total: u64::try_from(total).unwrap_or(0),
        })
    }

    async fn set_role(&self, id: UserId, role: Role) -> Result<User, RepositoryError> {
        let row = sqlx::query_as::<_, UserRow>(
            r"
            UPDATE storefront.user
            SET role = $2, updated_at = NOW()
            WHERE id = $1
            RETURNING id, email, name, role, created_at, updated_at
            ",
        )
        .bind(id)
        .bind(role)
        .fetch_optional(&self.pool)
        .await?
        .ok_or(RepositoryError::NotFound)?;

        User::try_from(row)
    }
}
