//! Login account storage. Password hashing happens before this layer.

use crate::model::user::{NewUser, User};
use crate::model::UserId;
use crate::repo::user_repo::UserRepository;
use crate::repo::{Entity, RepoError, RepoResult};
use log::info;

pub struct UserService<R: UserRepository> {
    repo: R,
}

impl<R: UserRepository> UserService<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn create_user(
        &self,
        email: &str,
        password_hash: &str,
        is_admin: bool,
    ) -> RepoResult<User> {
        let user = self
            .repo
            .create_user(&NewUser::new(email, password_hash, is_admin))?;
        info!(
            "event=user_create module=service status=ok user_id={} is_admin={}",
            user.id, user.is_admin
        );
        Ok(user)
    }

    pub fn get_user(&self, id: UserId) -> RepoResult<User> {
        self.repo.get_user(id)?.ok_or_else(|| RepoError::NotFound {
            entity: Entity::User,
            key: id.to_string(),
        })
    }

    pub fn get_user_by_email(&self, email: &str) -> RepoResult<User> {
        self.repo
            .get_user_by_email(email)?
            .ok_or_else(|| RepoError::NotFound {
                entity: Entity::User,
                key: email.trim().to_lowercase(),
            })
    }
}
