//! Account administration used by the CLI.

use sea_orm::{
    ActiveModelTrait, ColumnTrait, Condition, DatabaseConnection, EntityTrait, PaginatorTrait,
    QueryFilter, QueryOrder, Set,
};

use crate::database::entities::{countries, groups, user_groups, users};
use crate::errors::{CoreError, CoreResult};
use crate::serializers::UserRead;
use crate::services::auth_service::AuthService;

pub const DUMMY_EMAIL_DOMAIN: &str = "@btsf.eu";
pub const DUMMY_USERNAME_PREFIX: &str = "user";
pub const TRAINING_GROUP: &str = "Team";

#[derive(Debug, Default, PartialEq, Eq)]
pub struct PopulateReport {
    pub created: Vec<String>,
    pub existing: Vec<String>,
    pub group_created: bool,
}

#[derive(Clone)]
pub struct UserService {
    db: DatabaseConnection,
    bcrypt_cost: u32,
}

impl UserService {
    pub fn new(db: DatabaseConnection, bcrypt_cost: u32) -> Self {
        Self { db, bcrypt_cost }
    }

    pub async fn profile(&self, user: users::Model) -> CoreResult<UserRead> {
        let country = match user.country_id {
            Some(id) => countries::Entity::find_by_id(id)
                .one(&self.db)
                .await
                .map_err(|e| CoreError::db("find country", e))?,
            None => None,
        };
        Ok(UserRead::new(user, country))
    }

    /// Creates `user1..=userN` training accounts in the `Team` group.
    /// Existing usernames are left untouched.
    pub async fn populate(&self, count: u32, password: &str) -> CoreResult<PopulateReport> {
        let country = countries::Entity::find()
            .order_by_asc(countries::Column::Id)
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find country", e))?
            .ok_or_else(|| {
                CoreError::validation("No country found in database. Please add countries first.")
            })?;

        let (team, group_created) = self.get_or_create_group(TRAINING_GROUP).await?;
        let password_hash = AuthService::hash_password(password, self.bcrypt_cost)?;
        let mut report = PopulateReport {
            group_created,
            ..Default::default()
        };

        for i in 1..=count {
            let username = format!("{}{}", DUMMY_USERNAME_PREFIX, i);
            let exists = users::Entity::find()
                .filter(users::Column::Username.eq(username.as_str()))
                .one(&self.db)
                .await
                .map_err(|e| CoreError::db("find user", e))?;
            if exists.is_some() {
                report.existing.push(username);
                continue;
            }

            let mut user = users::ActiveModel::new();
            user.email = Set(format!("{}{}{}", DUMMY_USERNAME_PREFIX, i, DUMMY_EMAIL_DOMAIN));
            user.username = Set(username.clone());
            user.name = Set(format!("User {}", i));
            user.password = Set(password_hash.clone());
            user.occupation = Set("Developer".to_string());
            user.language = Set("English".to_string());
            user.country_id = Set(Some(country.id));
            user.is_staff = Set(true);
            let user = user
                .insert(&self.db)
                .await
                .map_err(|e| CoreError::db("create user", e))?;

            user_groups::ActiveModel {
                user_id: Set(user.id),
                group_id: Set(team.id),
                ..Default::default()
            }
            .insert(&self.db)
            .await
            .map_err(|e| CoreError::db("add user to group", e))?;

            report.created.push(username);
        }

        Ok(report)
    }

    fn dummy_condition() -> Condition {
        Condition::any()
            .add(users::Column::Email.ends_with(DUMMY_EMAIL_DOMAIN))
            .add(users::Column::Username.starts_with(DUMMY_USERNAME_PREFIX))
    }

    pub async fn count_dummy(&self) -> CoreResult<u64> {
        users::Entity::find()
            .filter(Self::dummy_condition())
            .count(&self.db)
            .await
            .map_err(|e| CoreError::db("count dummy users", e))
    }

    /// Deletes accounts with a `@btsf.eu` email or a `user` username prefix.
    pub async fn delete_dummy(&self) -> CoreResult<u64> {
        let result = users::Entity::delete_many()
            .filter(Self::dummy_condition())
            .exec(&self.db)
            .await
            .map_err(|e| CoreError::db("delete dummy users", e))?;
        Ok(result.rows_affected)
    }

    pub async fn create_superuser(
        &self,
        email: &str,
        username: &str,
        name: &str,
        password: &str,
    ) -> CoreResult<users::Model> {
        AuthService::validate_email(email)?;
        let password_hash = AuthService::hash_password(password, self.bcrypt_cost)?;

        let mut user = users::ActiveModel::new();
        user.email = Set(email.to_string());
        user.username = Set(username.to_string());
        user.name = Set(name.to_string());
        user.password = Set(password_hash);
        user.is_staff = Set(true);
        user.is_superuser = Set(true);
        user.insert(&self.db)
            .await
            .map_err(|e| CoreError::db("create superuser", e))
    }

    async fn get_or_create_group(&self, name: &str) -> CoreResult<(groups::Model, bool)> {
        let existing = groups::Entity::find()
            .filter(groups::Column::Name.eq(name))
            .one(&self.db)
            .await
            .map_err(|e| CoreError::db("find group", e))?;
        if let Some(group) = existing {
            return Ok((group, false));
        }

        let group = groups::ActiveModel {
            name: Set(name.to_string()),
            ..Default::default()
        }
        .insert(&self.db)
        .await
        .map_err(|e| CoreError::db("create group", e))?;
        Ok((group, true))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::test_utils::*;

    async fn add_country(db: &DatabaseConnection) -> countries::Model {
        countries::ActiveModel {
            name: Set("Italy".to_string()),
            code: Set("IT".to_string()),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn populate_needs_a_country() {
        let (db, _file) = setup_test_db().await;
        let service = UserService::new(db, 4);
        assert!(service.populate(2, "PASSWORD").await.is_err());
    }

    #[tokio::test]
    async fn populate_creates_team_members_once() {
        let (db, _file) = setup_test_db().await;
        let country = add_country(&db).await;
        let service = UserService::new(db.clone(), 4);

        let report = service.populate(3, "PASSWORD").await.unwrap();
        assert!(report.group_created);
        assert_eq!(report.created, vec!["user1", "user2", "user3"]);

        let again = service.populate(4, "PASSWORD").await.unwrap();
        assert!(!again.group_created);
        assert_eq!(again.created, vec!["user4"]);
        assert_eq!(again.existing.len(), 3);

        let user = users::Entity::find()
            .filter(users::Column::Username.eq("user2"))
            .one(&db)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(user.email, "user2@btsf.eu");
        assert_eq!(user.country_id, Some(country.id));
        assert!(user.is_staff);
        assert!(AuthService::verify_password("PASSWORD", &user.password));
        assert_eq!(user_groups::Entity::find().count(&db).await.unwrap(), 4);
    }

    #[tokio::test]
    async fn delete_dummy_spares_real_accounts() {
        let (db, _file) = setup_test_db().await;
        add_country(&db).await;
        let service = UserService::new(db.clone(), 4);
        service.populate(2, "PASSWORD").await.unwrap();
        let real = create_user(&db, "ana").await;

        assert_eq!(service.count_dummy().await.unwrap(), 2);
        assert_eq!(service.delete_dummy().await.unwrap(), 2);

        let remaining: Vec<i32> = users::Entity::find()
            .all(&db)
            .await
            .unwrap()
            .into_iter()
            .map(|u| u.id)
            .collect();
        assert_eq!(remaining, vec![real.id]);
    }

    #[tokio::test]
    async fn superusers_are_staff() {
        let (db, _file) = setup_test_db().await;
        let service = UserService::new(db, 4);
        let admin = service
            .create_superuser("admin@example.org", "admin", "Admin", "supersecret")
            .await
            .unwrap();
        assert!(admin.is_superuser && admin.is_staff);

        assert!(service
            .create_superuser("not-an-email", "x", "X", "supersecret")
            .await
            .is_err());
    }
}
