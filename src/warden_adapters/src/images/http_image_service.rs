use async_trait::async_trait;
use reqwest::{Client, Url, header::CONTENT_TYPE};
use serde::Deserialize;
use warden_core::{Error, IdentityId, ImageKind, ImageService, ImageUpload, Result};

/// Client for the image storage service.
///
/// `POST {base}/images/{user_id}/{kind}` stores one image and answers with
/// its public URL; `DELETE {base}/images/{user_id}` drops all of them. Any
/// path on the base URL is kept as a prefix.
pub struct HttpImageService {
    http_client: Client,
    base_url: Url,
}

impl HttpImageService {
    pub fn new(base_url: &str, http_client: Client) -> Result<Self> {
        let mut base_url =
            Url::parse(base_url).map_err(|e| Error::unexpected("parse image service url", e))?;
        // Relative joins replace the last segment unless the path ends in '/'.
        if !base_url.path().ends_with('/') {
            let path = format!("{}/", base_url.path());
            base_url.set_path(&path);
        }

        Ok(Self {
            http_client,
            base_url,
        })
    }

    fn images_url(&self, path: &str) -> Result<Url> {
        self.base_url
            .join(path)
            .map_err(|e| Error::unexpected("build image service url", e))
    }
}

#[derive(Deserialize)]
struct UploadResponse {
    url: String,
}

#[async_trait]
impl ImageService for HttpImageService {
    #[tracing::instrument(name = "Uploading image", skip(self, image), fields(kind = kind.as_str()))]
    async fn upload_image(
        &self,
        user_id: IdentityId,
        kind: ImageKind,
        image: ImageUpload,
    ) -> Result<String> {
        let url = self.images_url(&format!("images/{user_id}/{}", kind.as_str()))?;

        let response = self
            .http_client
            .post(url)
            .header(CONTENT_TYPE, image.content_type)
            .body(image.bytes)
            .send()
            .await
            .map_err(|e| Error::unexpected("upload image", e))?
            .error_for_status()
            .map_err(|e| Error::unexpected("upload image", e))?;

        let body: UploadResponse = response
            .json()
            .await
            .map_err(|e| Error::unexpected("decode image upload response", e))?;

        Ok(body.url)
    }

    #[tracing::instrument(name = "Deleting user images", skip(self))]
    async fn delete_all_images(&self, user_id: IdentityId) -> bool {
        let url = match self.images_url(&format!("images/{user_id}")) {
            Ok(url) => url,
            Err(error) => {
                tracing::warn!(error = ?error, "Invalid image service url");
                return false;
            }
        };

        match self
            .http_client
            .delete(url)
            .send()
            .await
            .and_then(|response| response.error_for_status())
        {
            Ok(_) => true,
            Err(error) => {
                tracing::warn!(error = %error, "Image service refused to delete images");
                false
            }
        }
    }
}
