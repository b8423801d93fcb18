use std::fmt;

use super::{identity_id::IdentityId, username::Username};

/// Profile fields handed to the user collaborator during registration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewUser {
    pub id: IdentityId,
    pub username: Username,
    pub display_name: String,
    pub bio: Option<String>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct ImageUpload {
    pub content_type: String,
    pub bytes: Vec<u8>,
}

impl fmt::Debug for ImageUpload {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ImageUpload")
            .field("content_type", &self.content_type)
            .field("len", &self.bytes.len())
            .finish()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImageKind {
    Profile,
    Background,
}

impl ImageKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            ImageKind::Profile => "profile",
            ImageKind::Background => "background",
        }
    }
}
