use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, DatabaseConnection, EntityTrait,
    PaginatorTrait, QueryFilter, QueryOrder, QuerySelect, Set, TransactionTrait,
};

use super::{db_err, unique_or_db_err};
use crate::domain::{
    CreateUserDto, DomainError, DomainResult, GetUserDto, UpdateUserDto, User,
    UserRepositoryInterface,
};
use crate::infrastructure::database::entities::{user, user_role};
use crate::shared::{validate_pagination, PaginatedResult};

pub struct UserRepository {
    db: DatabaseConnection,
}

impl UserRepository {
    pub fn new(db: DatabaseConnection) -> Self {
        Self { db }
    }
}

pub(crate) fn user_model_to_domain(model: user::Model) -> User {
    User {
        id: model.id,
        username: model.username,
        first_name: model.first_name,
        last_name: model.last_name,
        email: model.email,
        password_hash: model.password_hash,
        user_type: model.user_type.into(),
        email_verified: model.email_verified,
        active: model.active,
        deletion_requested: model.deletion_requested,
        verification_token: model.verification_token,
        reset_token: model.reset_token,
        reset_expires_at: model.reset_expires_at,
        created_at: model.created_at,
        updated_at: model.updated_at,
    }
}

pub(crate) async fn insert_user<C: ConnectionTrait>(
    conn: &C,
    dto: CreateUserDto,
) -> DomainResult<user::Model> {
    let now = Utc::now();
    let new_user = user::ActiveModel {
        id: Set(uuid::Uuid::new_v4().to_string()),
        username: Set(dto.username),
        first_name: Set(dto.first_name),
        last_name: Set(dto.last_name),
        email: Set(dto.email),
        password_hash: Set(dto.password_hash),
        user_type: Set(dto.user_type.into()),
        email_verified: Set(dto.email_verified),
        active: Set(true),
        deletion_requested: Set(false),
        verification_token: Set(None),
        reset_token: Set(None),
        reset_expires_at: Set(None),
        created_at: Set(now),
        updated_at: Set(now),
    };

    new_user
        .insert(conn)
        .await
        .map_err(|e| unique_or_db_err(e, "Username or email already exists"))
}

impl UserRepository {
    async fn find_model(&self, id: &str) -> DomainResult<user::Model> {
        user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?
            .ok_or_else(|| DomainError::not_found("User", "id", id))
    }
}

#[async_trait]
impl UserRepositoryInterface for UserRepository {
    async fn create_user(&self, dto: CreateUserDto) -> DomainResult<User> {
        let model = insert_user(&self.db, dto).await?;
        Ok(user_model_to_domain(model))
    }

    async fn list_users(&self, dto: GetUserDto) -> DomainResult<PaginatedResult<User>> {
        let (page, page_size) = validate_pagination(dto.page, dto.page_size);

        let mut query = user::Entity::find();

        if let Some(ref search) = dto.search {
            query = query.filter(
                user::Column::Username
                    .contains(search)
                    .or(user::Column::Email.contains(search)),
            );
        }

        if let Some(user_type) = dto.user_type {
            query = query.filter(user::Column::UserType.eq(user::UserType::from(user_type)));
        }

        query = match dto.sort_by.as_deref() {
            Some("username") => query.order_by_asc(user::Column::Username),
            Some("email") => query.order_by_asc(user::Column::Email),
            Some("user_type") => query.order_by_asc(user::Column::UserType),
            _ => query.order_by_desc(user::Column::CreatedAt),
        };

        let total = query.clone().count(&self.db).await.map_err(db_err)?;

        let offset = u64::from(page - 1) * u64::from(page_size);
        let models = query
            .offset(offset)
            .limit(u64::from(page_size))
            .all(&self.db)
            .await
            .map_err(db_err)?;

        let items: Vec<User> = models.into_iter().map(user_model_to_domain).collect();

        Ok(PaginatedResult::new(items, total, page, page_size))
    }

    async fn get_user_by_username(&self, username: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Username.eq(username))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_email(&self, email: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find()
            .filter(user::Column::Email.eq(email))
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn get_user_by_id(&self, id: &str) -> DomainResult<Option<User>> {
        let model = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        Ok(model.map(user_model_to_domain))
    }

    async fn update_user(&self, id: &str, dto: UpdateUserDto) -> DomainResult<Option<User>> {
        let existing = user::Entity::find_by_id(id)
            .one(&self.db)
            .await
            .map_err(db_err)?;

        let Some(existing) = existing else {
            return Ok(None);
        };

        let mut active: user::ActiveModel = existing.into();

        if let Some(username) = dto.username {
            active.username = Set(username);
        }
        if let Some(first_name) = dto.first_name {
            active.first_name = Set(Some(first_name));
        }
        if let Some(last_name) = dto.last_name {
            active.last_name = Set(Some(last_name));
        }
        active.updated_at = Set(Utc::now());

        let updated = active
            .update(&self.db)
            .await
            .map_err(|e| unique_or_db_err(e, "Username already exists"))?;

        Ok(Some(user_model_to_domain(updated)))
    }

    async fn set_verification_token(&self, id: &str, token: Option<&str>) -> DomainResult<()> {
        let mut active: user::ActiveModel = self.find_model(id).await?.into();
        active.verification_token = Set(token.map(str::to_string));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn set_reset_token(
        &self,
        id: &str,
        code: &str,
        expires_at: DateTime<Utc>,
    ) -> DomainResult<()> {
        let mut active: user::ActiveModel = self.find_model(id).await?.into();
        active.reset_token = Set(Some(code.to_string()));
        active.reset_expires_at = Set(Some(expires_at));
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn update_user_password(&self, id: &str, new_password_hash: &str) -> DomainResult<()> {
        let mut active: user::ActiveModel = self.find_model(id).await?.into();
        active.password_hash = Set(new_password_hash.to_string());
        active.reset_token = Set(None);
        active.reset_expires_at = Set(None);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn set_deletion_requested(&self, id: &str, requested: bool) -> DomainResult<()> {
        let mut active: user::ActiveModel = self.find_model(id).await?.into();
        active.deletion_requested = Set(requested);
        active.updated_at = Set(Utc::now());
        active.update(&self.db).await.map_err(db_err)?;
        Ok(())
    }

    async fn delete_user(&self, id: &str) -> DomainResult<()> {
        let txn = self.db.begin().await.map_err(db_err)?;

        // Assignments this user made outlive the account.
        user_role::Entity::update_many()
            .col_expr(
                user_role::Column::AssignedBy,
                sea_orm::sea_query::Expr::value(Option::<String>::None),
            )
            .filter(user_role::Column::AssignedBy.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        user_role::Entity::delete_many()
            .filter(user_role::Column::UserId.eq(id))
            .exec(&txn)
            .await
            .map_err(db_err)?;

        let result = user::Entity::delete_by_id(id)
            .exec(&txn)
            .await
            .map_err(db_err)?;

        if result.rows_affected == 0 {
            return Err(DomainError::not_found("User", "id", id));
        }

        txn.commit().await.map_err(db_err)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::RoleName;
    use crate::infrastructure::database::migrator::{Migrator, MigratorTrait};
    use sea_orm::Database;

    async fn setup() -> UserRepository {
        let db = Database::connect("sqlite::memory:").await.unwrap();
        Migrator::up(&db, None).await.unwrap();
        UserRepository::new(db)
    }

    fn dto(username: &str, email: &str) -> CreateUserDto {
        CreateUserDto {
            username: username.to_string(),
            email: email.to_string(),
            first_name: None,
            last_name: None,
            password_hash: "hash".to_string(),
            user_type: RoleName::User,
            email_verified: false,
        }
    }

    #[tokio::test]
    async fn create_and_fetch() {
        let repo = setup().await;
        let created = repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let by_email = repo.get_user_by_email("alice@example.com").await.unwrap().unwrap();
        assert_eq!(by_email.id, created.id);
        assert_eq!(by_email.user_type, RoleName::User);
        assert!(!by_email.email_verified);
        assert!(by_email.active);

        let by_name = repo.get_user_by_username("alice").await.unwrap().unwrap();
        assert_eq!(by_name.id, created.id);
    }

    #[tokio::test]
    async fn duplicate_email_is_conflict() {
        let repo = setup().await;
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();
        let err = repo
            .create_user(dto("alice2", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, DomainError::Conflict(_)));
    }

    #[tokio::test]
    async fn password_update_clears_reset_token() {
        let repo = setup().await;
        let user = repo.create_user(dto("bob", "bob@example.com")).await.unwrap();
        repo.set_reset_token(&user.id, "code", Utc::now() + chrono::Duration::minutes(15))
            .await
            .unwrap();

        repo.update_user_password(&user.id, "new-hash").await.unwrap();

        let stored = repo.get_user_by_id(&user.id).await.unwrap().unwrap();
        assert_eq!(stored.password_hash, "new-hash");
        assert!(stored.reset_token.is_none());
        assert!(stored.reset_expires_at.is_none());
    }

    #[tokio::test]
    async fn list_filters_and_paginates() {
        let repo = setup().await;
        for i in 0..5 {
            repo.create_user(dto(&format!("user{}", i), &format!("u{}@example.com", i)))
                .await
                .unwrap();
        }

        let page = repo
            .list_users(GetUserDto {
                page: Some(2),
                page_size: Some(2),
                sort_by: Some("username".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 5);
        assert_eq!(page.total_pages, 3);
        assert_eq!(page.items[0].username, "user2");

        let found = repo
            .list_users(GetUserDto {
                search: Some("user3".to_string()),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(found.total, 1);
    }

    #[tokio::test]
    async fn last_page_number_returns_an_empty_page() {
        let repo = setup().await;
        repo.create_user(dto("alice", "alice@example.com")).await.unwrap();

        let page = repo
            .list_users(GetUserDto {
                page: Some(u32::MAX),
                page_size: Some(100),
                ..Default::default()
            })
            .await
            .unwrap();
        assert_eq!(page.total, 1);
        assert_eq!(page.page, u32::MAX);
        assert!(page.items.is_empty());
    }

    #[tokio::test]
    async fn delete_missing_user_is_not_found() {
        let repo = setup().await;
        let err = repo.delete_user("nope").await.unwrap_err();
        assert!(matches!(err, DomainError::NotFound { .. }));
    }
}
