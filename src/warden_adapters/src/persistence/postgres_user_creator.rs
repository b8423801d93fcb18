use std::sync::Arc;

use async_trait::async_trait;
use uuid::Uuid;
use warden_core::{ImageService, ImageUpload, NewUser, Result, UserCreator};

use super::{PgUnitOfWork, storage_fault::storage_error};
use crate::images::upload_profile_images;

/// Creates the `users` row inside the registration transaction, after
/// uploading the profile images.
pub struct PostgresUserCreator {
    images: Arc<dyn ImageService>,
}

impl PostgresUserCreator {
    pub fn new(images: Arc<dyn ImageService>) -> Self {
        Self { images }
    }
}

#[async_trait]
impl UserCreator for PostgresUserCreator {
    type Tx = PgUnitOfWork;

    #[tracing::instrument(name = "Creating user profile in PostgreSQL", skip_all, fields(user_id = %user.id))]
    async fn create_user(
        &self,
        tx: &mut PgUnitOfWork,
        user: &NewUser,
        profile_image: Option<ImageUpload>,
        background_image: Option<ImageUpload>,
    ) -> Result<()> {
        let urls =
            upload_profile_images(self.images.as_ref(), user.id, profile_image, background_image)
                .await?;

        let inserted = sqlx::query(
            r#"
                INSERT INTO users (id, display_name, bio, profile_image_url, background_image_url)
                VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::from(user.id))
        .bind(&user.display_name)
        .bind(user.bio.as_deref())
        .bind(urls.profile.as_deref())
        .bind(urls.background.as_deref())
        .execute(tx.connection())
        .await;

        if let Err(error) = inserted {
            if urls.any() && !self.images.delete_all_images(user.id).await {
                tracing::warn!(user_id = %user.id, "Failed to clean up images of rejected profile");
            }
            return Err(storage_error(error));
        }

        Ok(())
    }
}
