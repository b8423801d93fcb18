pub mod http_image_service;
pub mod in_memory_image_service;

pub use http_image_service::HttpImageService;
pub use in_memory_image_service::InMemoryImageService;

use warden_core::{Error, IdentityId, ImageKind, ImageService, ImageUpload, Result};

/// Public URLs of the images uploaded for a new profile.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ProfileImageUrls {
    pub profile: Option<String>,
    pub background: Option<String>,
}

impl ProfileImageUrls {
    pub fn any(&self) -> bool {
        self.profile.is_some() || self.background.is_some()
    }
}

/// Validate and upload the optional registration images.
pub async fn upload_profile_images(
    images: &dyn ImageService,
    user_id: IdentityId,
    profile_image: Option<ImageUpload>,
    background_image: Option<ImageUpload>,
) -> Result<ProfileImageUrls> {
    let mut urls = ProfileImageUrls::default();

    if let Some(image) = profile_image {
        validate(ImageKind::Profile, &image)?;
        urls.profile = Some(images.upload_image(user_id, ImageKind::Profile, image).await?);
    }
    if let Some(image) = background_image {
        let uploaded = match validate(ImageKind::Background, &image) {
            Ok(()) => images.upload_image(user_id, ImageKind::Background, image).await,
            Err(error) => Err(error),
        };
        match uploaded {
            Ok(url) => urls.background = Some(url),
            Err(error) => {
                if urls.profile.is_some() && !images.delete_all_images(user_id).await {
                    tracing::warn!(%user_id, "Failed to delete profile image after background upload failed");
                }
                return Err(error);
            }
        }
    }

    Ok(urls)
}

fn validate(kind: ImageKind, image: &ImageUpload) -> Result<()> {
    if image.bytes.is_empty() || !image.content_type.starts_with("image/") {
        let label = match kind {
            ImageKind::Profile => "Profile",
            ImageKind::Background => "Background",
        };
        return Err(Error::bad_request(format!("{label} image is not a valid image")));
    }
    Ok(())
}
