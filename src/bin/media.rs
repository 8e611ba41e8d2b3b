use std::{
    fs, io,
    path::{Path, PathBuf},
};

use base64::{engine::general_purpose::STANDARD, Engine};
use thiserror::Error;
use tracing::{debug, trace_span, warn};
use uuid::Uuid;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ImageError {
    #[error("No file was submitted.")]
    Empty,

    #[error("Upload a valid image. The file you uploaded was either not an image or a corrupted image.")]
    InvalidImage,
}

/// Image as it arrives in a write request.
#[derive(Debug, Clone)]
pub enum ImagePayload {
    /// Multipart upload
    Binary(Vec<u8>),
    /// `data:image/png;base64,<data>` or bare base64
    Text(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedImage {
    pub file_name: String,
    pub bytes: Vec<u8>,
}

impl DecodedImage {
    pub fn extension(&self) -> Option<&str> {
        Path::new(&self.file_name)
            .extension()
            .and_then(|extension| extension.to_str())
    }
}

pub fn decode_image(payload: ImagePayload) -> Result<DecodedImage, ImageError> {
    let bytes = match payload {
        ImagePayload::Binary(bytes) => bytes,
        ImagePayload::Text(text) => {
            let data = match text.split_once(";base64,") {
                Some((header, data)) if header.contains("data:") => data,
                _ => text.as_str(),
            };
            // line-wrapped base64 is common in data URIs
            let data: String = data
                .chars()
                .filter(|c| !c.is_ascii_whitespace())
                .collect();

            if data.is_empty() {
                return Err(ImageError::Empty);
            }

            STANDARD
                .decode(data)
                .map_err(|_| ImageError::InvalidImage)?
        }
    };

    if bytes.is_empty() {
        return Err(ImageError::Empty);
    }

    let extension = image::guess_format(&bytes)
        .ok()
        .and_then(|format| format.extensions_str().first().copied())
        .ok_or(ImageError::InvalidImage)?;

    let name = Uuid::new_v4().simple().to_string();
    let file_name = format!("{}.{extension}", &name[..12]);

    Ok(DecodedImage { file_name, bytes })
}

/// Filesystem storage for uploaded recipe images.
#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
    url: String,
}

impl MediaStorage {
    const UPLOAD_DIR: &'static str = "recipes/images";

    pub fn new(root: impl Into<PathBuf>, url: &str) -> Self {
        let url = if url.ends_with('/') {
            url.to_owned()
        } else {
            format!("{url}/")
        };

        Self {
            root: root.into(),
            url,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Writes the image and returns its path relative to the media root.
    pub fn save(&self, image: &DecodedImage) -> io::Result<String> {
        let span = trace_span!("saving image", file_name = %image.file_name);
        let _guard = span.enter();

        let directory = self.root.join(Self::UPLOAD_DIR);
        fs::create_dir_all(&directory)?;
        fs::write(directory.join(&image.file_name), &image.bytes)?;

        debug!("Stored {} bytes", image.bytes.len());
        Ok(format!("{}/{}", Self::UPLOAD_DIR, image.file_name))
    }

    /// Deletes a stored file. Failures are logged, the file is left behind.
    pub fn discard(&self, relative_path: &str) {
        match fs::remove_file(self.root.join(relative_path)) {
            Ok(()) => debug!("Removed {relative_path}"),
            Err(err) => warn!("Could not remove {relative_path}: {err}"),
        }
    }

    pub fn url_for(&self, relative_path: &str) -> String {
        format!("{}{relative_path}", self.url)
    }
}
