use axum::{
    async_trait,
    extract::{multipart::MultipartError, FromRequest, Multipart, Request},
    http::header::CONTENT_TYPE,
    Json,
};
use serde::{Deserialize, Deserializer};
use tracing::debug;

use crate::{
    error::AppError,
    media::{decode_image, ImagePayload},
    recipes::editor::{IngredientRequest, RecipeDraft},
};

/// Recipe write payload, sent either as JSON (base64 image) or as
/// `multipart/form-data` (file upload, `ingredients` as a JSON string).
#[derive(Deserialize, Debug, Default)]
pub struct RecipeForm {
    pub name: Option<String>,
    pub text: Option<String>,
    pub cooking_time: Option<i32>,
    #[serde(default, deserialize_with = "text_image")]
    pub image: Option<ImagePayload>,
    pub ingredients: Option<Vec<IngredientRequest>>,
    pub tags: Option<Vec<i32>>,
}

fn text_image<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Option<ImagePayload>, D::Error> {
    Ok(Option::<String>::deserialize(deserializer)?.map(ImagePayload::Text))
}

fn required<T>(value: Option<T>, field: &str) -> Result<T, AppError> {
    value.ok_or_else(|| AppError::validation(field, "This field is required."))
}

impl RecipeForm {
    pub fn into_draft(self) -> Result<RecipeDraft, AppError> {
        Ok(RecipeDraft {
            name: required(self.name, "name")?,
            text: required(self.text, "text")?,
            cooking_time: required(self.cooking_time, "cooking_time")?,
            image: self.image.map(decode_image).transpose()?,
            ingredients: required(self.ingredients, "ingredients")?,
            tags: required(self.tags, "tags")?,
        })
    }
}

#[async_trait]
impl<S: Send + Sync> FromRequest<S> for RecipeForm {
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let is_multipart = req
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .is_some_and(|value| value.starts_with("multipart/form-data"));

        if is_multipart {
            let multipart = Multipart::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation("non_field_errors", rejection.body_text()))?;
            read_multipart(multipart).await
        } else {
            let Json(form) = Json::<RecipeForm>::from_request(req, state)
                .await
                .map_err(|rejection| AppError::validation("non_field_errors", rejection.body_text()))?;
            Ok(form)
        }
    }
}

fn malformed(err: MultipartError) -> AppError {
    AppError::validation("non_field_errors", err.body_text())
}

fn parse_number(field: &str, value: &str) -> Result<i32, AppError> {
    value
        .trim()
        .parse()
        .map_err(|_| AppError::validation(field, "A valid integer is required."))
}

async fn read_multipart(mut multipart: Multipart) -> Result<RecipeForm, AppError> {
    let mut form = RecipeForm::default();

    while let Some(field) = multipart.next_field().await.map_err(malformed)? {
        let Some(name) = field.name().map(str::to_owned) else {
            continue;
        };

        match name.as_str() {
            "image" if field.file_name().is_some() => {
                let bytes = field.bytes().await.map_err(malformed)?;
                form.image = Some(ImagePayload::Binary(bytes.to_vec()));
            }
            "image" => form.image = Some(ImagePayload::Text(field.text().await.map_err(malformed)?)),
            "name" => form.name = Some(field.text().await.map_err(malformed)?),
            "text" => form.text = Some(field.text().await.map_err(malformed)?),
            "cooking_time" => {
                let value = field.text().await.map_err(malformed)?;
                form.cooking_time = Some(parse_number("cooking_time", &value)?);
            }
            "ingredients" => {
                let value = field.text().await.map_err(malformed)?;
                let ingredients = serde_json::from_str(&value)
                    .map_err(|e| AppError::validation("ingredients", e.to_string()))?;
                form.ingredients = Some(ingredients);
            }
            // either repeated `tags=<id>` fields or one JSON array
            "tags" => {
                let value = field.text().await.map_err(malformed)?;
                let tags = form.tags.get_or_insert_with(Vec::new);
                if value.trim_start().starts_with('[') {
                    let ids: Vec<i32> = serde_json::from_str(&value)
                        .map_err(|e| AppError::validation("tags", e.to_string()))?;
                    tags.extend(ids);
                } else {
                    tags.push(parse_number("tags", &value)?);
                }
            }
            _ => debug!("Ignoring multipart field {name}"),
        }
    }

    Ok(form)
}
