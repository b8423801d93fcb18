use std::{collections::HashMap, sync::Arc};

use async_trait::async_trait;
use tokio::sync::RwLock;
use warden_core::{IdentityId, ImageKind, ImageService, ImageUpload, Result};

#[derive(Default, Clone)]
pub struct InMemoryImageService {
    images: Arc<RwLock<HashMap<IdentityId, Vec<(ImageKind, ImageUpload)>>>>,
}

impl InMemoryImageService {
    pub async fn image_count(&self, user_id: IdentityId) -> usize {
        self.images
            .read()
            .await
            .get(&user_id)
            .map_or(0, |images| images.len())
    }

    /// Images stored across every user.
    pub async fn total_count(&self) -> usize {
        self.images.read().await.values().map(Vec::len).sum()
    }
}

#[async_trait]
impl ImageService for InMemoryImageService {
    async fn upload_image(
        &self,
        user_id: IdentityId,
        kind: ImageKind,
        image: ImageUpload,
    ) -> Result<String> {
        let mut images = self.images.write().await;
        let stored = images.entry(user_id).or_default();
        stored.retain(|(existing, _)| *existing != kind);
        stored.push((kind, image));

        Ok(format!("memory://images/{user_id}/{}", kind.as_str()))
    }

    async fn delete_all_images(&self, user_id: IdentityId) -> bool {
        self.images.write().await.remove(&user_id);
        true
    }
}
