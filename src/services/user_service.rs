use crate::dto::admin_dto::UpdateUserPayload;
use crate::dto::auth_dto::{LoginPayload, RegisterPayload, UpdateProfilePayload};
use crate::error::{Error, Result};
use crate::models::user::User;
use crate::utils::crypto::{hash_password, verify_password};
use sqlx::PgPool;
use uuid::Uuid;

#[derive(Clone)]
pub struct UserService {
    pool: PgPool,
}

impl UserService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub async fn register(&self, payload: RegisterPayload) -> Result<User> {
        let role = normalize_role(payload.role.as_deref())?;
        let password_hash = hash_password(&payload.password)?;

        let user = sqlx::query_as::<_, User>(
            r#"
            INSERT INTO users (username, email, password_hash, role)
            VALUES ($1, $2, $3, $4)
            RETURNING *
            "#,
        )
        .bind(&payload.username)
        .bind(payload.email.to_lowercase())
        .bind(password_hash)
        .bind(role)
        .fetch_one(&self.pool)
        .await
        .map_err(into_conflict_on_duplicate_email)?;

        tracing::info!(user_id = %user.id, "Registered new user");
        Ok(user)
    }

    /// Resolves credentials to a user. Unknown email, wrong password and a
    /// deactivated account all come back as `Unauthorized`.
    pub async fn login(&self, payload: LoginPayload) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE email = $1"#)
            .bind(payload.email.to_lowercase())
            .fetch_optional(&self.pool)
            .await?;

        let user = match user {
            Some(user) => user,
            None => return Err(Error::Unauthorized("Invalid credentials".to_string())),
        };

        if !verify_password(&payload.password, &user.password_hash)? {
            return Err(Error::Unauthorized("Invalid credentials".to_string()));
        }
        if !user.is_active {
            return Err(Error::Unauthorized("Account is deactivated".to_string()));
        }

        Ok(user)
    }

    pub async fn get_by_id(&self, user_id: Uuid) -> Result<User> {
        let user = sqlx::query_as::<_, User>(r#"SELECT * FROM users WHERE id = $1"#)
            .bind(user_id)
            .fetch_one(&self.pool)
            .await?;
        Ok(user)
    }

    pub async fn update_profile(
        &self,
        user_id: Uuid,
        payload: UpdateProfilePayload,
    ) -> Result<User> {
        let password_hash = match payload.password.as_deref() {
            Some(plain) => Some(hash_password(plain)?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                username = COALESCE($1, username),
                email = COALESCE($2, email),
                password_hash = COALESCE($3, password_hash),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(payload.username)
        .bind(payload.email.map(|e| e.to_lowercase()))
        .bind(password_hash)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(into_conflict_on_duplicate_email)?;

        Ok(user)
    }

    pub async fn list_users(&self, page: i64, per_page: i64) -> Result<(Vec<User>, i64)> {
        let offset = (page - 1) * per_page;

        let total: i64 = sqlx::query_scalar(r#"SELECT COUNT(*) FROM users"#)
            .fetch_one(&self.pool)
            .await?;

        let users = sqlx::query_as::<_, User>(
            r#"SELECT * FROM users ORDER BY created_at DESC LIMIT $1 OFFSET $2"#,
        )
        .bind(per_page)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok((users, total))
    }

    pub async fn update_user(&self, user_id: Uuid, payload: UpdateUserPayload) -> Result<User> {
        let role = match payload.role.as_deref() {
            Some(role) => Some(normalize_role(Some(role))?),
            None => None,
        };

        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET
                username = COALESCE($1, username),
                email = COALESCE($2, email),
                role = COALESCE($3, role),
                updated_at = NOW()
            WHERE id = $4
            RETURNING *
            "#,
        )
        .bind(payload.username)
        .bind(payload.email.map(|e| e.to_lowercase()))
        .bind(role)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await
        .map_err(into_conflict_on_duplicate_email)?;

        Ok(user)
    }

    pub async fn set_active(&self, user_id: Uuid, is_active: bool) -> Result<User> {
        let user = sqlx::query_as::<_, User>(
            r#"
            UPDATE users
            SET is_active = $1, updated_at = NOW()
            WHERE id = $2
            RETURNING *
            "#,
        )
        .bind(is_active)
        .bind(user_id)
        .fetch_one(&self.pool)
        .await?;

        tracing::info!(user_id = %user.id, is_active, "Updated user active flag");
        Ok(user)
    }

    /// Admin accounts are never hard-deleted; the request is rejected
    /// before any write.
    pub async fn delete_user(&self, user_id: Uuid) -> Result<()> {
        let user = self.get_by_id(user_id).await?;
        if user.is_admin() {
            return Err(Error::BadRequest(
                "Admin accounts cannot be deleted".to_string(),
            ));
        }

        sqlx::query(r#"DELETE FROM users WHERE id = $1 AND role <> 'admin'"#)
            .bind(user_id)
            .execute(&self.pool)
            .await?;

        tracing::info!(%user_id, "Deleted user");
        Ok(())
    }
}

fn normalize_role(role: Option<&str>) -> Result<String> {
    match role {
        None => Ok("user".to_string()),
        Some(raw) => {
            let lowered = raw.trim().to_lowercase();
            match lowered.as_str() {
                "user" | "admin" => Ok(lowered),
                _ => Err(Error::BadRequest(format!("Unknown role: {}", raw))),
            }
        }
    }
}

// Postgres unique_violation is SQLSTATE 23505; the only unique key on
// users is the email address.
fn into_conflict_on_duplicate_email(err: sqlx::Error) -> Error {
    match &err {
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            Error::Conflict("Email is already registered".to_string())
        }
        _ => Error::from(err),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_defaults_to_user() {
        assert_eq!(normalize_role(None).unwrap(), "user");
    }

    #[test]
    fn role_is_case_insensitive() {
        assert_eq!(normalize_role(Some("Admin")).unwrap(), "admin");
        assert_eq!(normalize_role(Some(" USER ")).unwrap(), "user");
    }

    #[test]
    fn unknown_roles_are_rejected() {
        assert!(matches!(
            normalize_role(Some("superuser")).unwrap_err(),
            Error::BadRequest(_)
        ));
    }
}
