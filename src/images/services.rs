use bytes::Bytes;
use tracing::{error, info};
use uuid::Uuid;

use crate::{error::AppError, products::repo_types::ImageDescriptor, storage::StorageClient};

/// Storage folder for product images.
pub const PRODUCT_IMAGE_FOLDER: &str = "Pinvent";

/// Decimal places used for product image sizes.
pub const SIZE_PRECISION: usize = 2;

/// A file received from a multipart upload.
#[derive(Debug, Clone)]
pub struct UploadItem {
    pub file_name: String,
    pub content_type: String,
    pub body: Bytes,
}

impl UploadItem {
    pub fn size(&self) -> u64 {
        self.body.len() as u64
    }
}

pub async fn upload_image(
    storage: &dyn StorageClient,
    folder: &str,
    item: UploadItem,
) -> Result<ImageDescriptor, AppError> {
    let ext = ext_from_mime(&item.content_type).ok_or_else(|| {
        error!(content_type = %item.content_type, "upload is not an image");
        AppError::Upload("Image could not be uploaded".into())
    })?;
    let key = format!("{}/{}.{}", folder, Uuid::new_v4(), ext);
    let size = item.size();

    let url = storage
        .put_object(&key, item.body, &item.content_type)
        .await
        .map_err(|e| {
            error!(error = ?e, key = %key, "image upload failed");
            AppError::Upload("Image could not be uploaded".into())
        })?;

    info!(key = %key, size, "image uploaded");
    Ok(ImageDescriptor {
        file_name: item.file_name,
        file_path: url,
        file_type: item.content_type,
        file_size: format_file_size(size, SIZE_PRECISION),
    })
}

/// Object key extension for an `image/*` type; `None` for anything else.
fn ext_from_mime(ct: &str) -> Option<String> {
    let essence = ct.split(';').next().unwrap_or_default().trim().to_ascii_lowercase();
    let subtype = essence.strip_prefix("image/")?;
    let ext = match subtype.split('+').next().unwrap_or_default() {
        "jpeg" | "jpg" | "pjpeg" => "jpg",
        other if !other.is_empty() && other.chars().all(|c| c.is_ascii_alphanumeric()) => other,
        _ => "bin",
    };
    Some(ext.to_string())
}

/// Human readable size in powers of 1024, trailing zeros removed.
pub fn format_file_size(bytes: u64, decimals: usize) -> String {
    const UNITS: [&str; 7] = ["Bytes", "KB", "MB", "GB", "TB", "PB", "EB"];
    if bytes == 0 {
        return "0 Bytes".into();
    }

    let mut value = bytes as f64;
    let mut unit = 0;
    while value >= 1024.0 && unit < UNITS.len() - 1 {
        value /= 1024.0;
        unit += 1;
    }

    let mut text = format!("{value:.decimals$}");
    if text.contains('.') {
        text = text.trim_end_matches('0').trim_end_matches('.').to_string();
    }
    format!("{} {}", text, UNITS[unit])
}
