use std::collections::BTreeMap;

use axum::extract::Multipart;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};

use crate::portal::Upload;

use super::error::ApiError;

/// A parsed `multipart/form-data` body: at most one file plus text fields.
///
/// Metadata may arrive as a JSON string in a `metadata` field or as plain
/// text fields; [`UploadForm::metadata`] accepts both.
#[derive(Debug, Default)]
pub struct UploadForm {
    fields: BTreeMap<String, String>,
    file: Option<Upload>,
}

impl UploadForm {
    pub async fn read(mut multipart: Multipart) -> Result<Self, ApiError> {
        let mut form = Self::default();
        while let Some(field) = multipart.next_field().await? {
            let name = field.name().unwrap_or_default().to_string();
            if let Some(file_name) = field.file_name().map(str::to_string) {
                let content_type = field.content_type().map(str::to_string);
                let bytes = field.bytes().await?;
                if form.file.is_some() {
                    log::debug!("Ignoring extra file field {:?}", name);
                    continue;
                }
                form.file = Some(Upload {
                    file_name: if file_name.is_empty() {
                        "upload".to_string()
                    } else {
                        file_name
                    },
                    content_type,
                    bytes: bytes.to_vec(),
                });
            } else {
                let text = field.text().await?;
                form.fields.insert(name, text);
            }
        }
        Ok(form)
    }

    /// Deserializes the `metadata` JSON field, or the text fields when
    /// there is none.
    pub fn metadata<T: DeserializeOwned>(&self) -> Result<T, ApiError> {
        let value = match self.fields.get("metadata") {
            Some(raw) if !raw.trim().is_empty() => serde_json::from_str::<Value>(raw)
                .map_err(|e| ApiError::bad_request(format!("Invalid metadata JSON: {}", e)))?,
            _ => Value::Object(
                self.fields
                    .iter()
                    .filter(|(k, _)| k.as_str() != "metadata")
                    .map(|(k, v)| (k.clone(), Value::String(v.clone())))
                    .collect::<Map<_, _>>(),
            ),
        };
        serde_json::from_value(value)
            .map_err(|e| ApiError::bad_request(format!("Invalid metadata: {}", e)))
    }

    /// A text field, falling back to the same key inside `metadata`.
    pub fn text(&self, name: &str) -> Option<String> {
        if let Some(value) = self.fields.get(name).filter(|v| !v.is_empty()) {
            return Some(value.clone());
        }
        let raw = self.fields.get("metadata")?;
        match serde_json::from_str::<Value>(raw).ok()?.get(name)? {
            Value::String(s) if !s.is_empty() => Some(s.clone()),
            _ => None,
        }
    }

    pub fn take_file(&mut self) -> Option<Upload> {
        self.file.take()
    }
}
