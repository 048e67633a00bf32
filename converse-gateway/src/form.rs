//! Form-field extractor shared by the conversation and synthesis routes.
//!
//! Browsers post either `application/x-www-form-urlencoded` or
//! `multipart/form-data` bodies; GET requests carry the fields in the query
//! string. A body that cannot be read falls back to the default fields.

use axum::{
    async_trait,
    extract::{FromRequest, Multipart, Request},
    http::{header, Method},
    Form,
};
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use std::convert::Infallible;

/// Text fields of a form, from the query, a urlencoded body or a multipart body.
#[derive(Debug, Clone, Default)]
pub struct FormFields<T>(pub T);

#[async_trait]
impl<T, S> FromRequest<S> for FormFields<T>
where
    T: DeserializeOwned + Default + Send,
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let content_type = req
            .headers()
            .get(header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .map(str::to_ascii_lowercase);

        let fields = match content_type.as_deref() {
            Some(ct) if ct.starts_with("multipart/form-data") => {
                match Multipart::from_request(req, state).await {
                    Ok(multipart) => read_multipart(multipart).await.unwrap_or_else(|e| {
                        tracing::warn!(error = %e, "Unreadable multipart form, using defaults");
                        T::default()
                    }),
                    Err(rejection) => {
                        tracing::warn!(error = %rejection, "Multipart form rejected, using defaults");
                        T::default()
                    }
                }
            }
            None if req.method() != Method::GET && req.method() != Method::HEAD => {
                tracing::debug!("Form body without content type, using defaults");
                T::default()
            }
            _ => match Form::<T>::from_request(req, state).await {
                Ok(Form(fields)) => fields,
                Err(rejection) => {
                    tracing::warn!(error = %rejection, "Form rejected, using defaults");
                    T::default()
                }
            },
        };

        Ok(Self(fields))
    }
}

/// Collect the named text parts of a multipart body. File parts are skipped.
async fn read_multipart<T: DeserializeOwned>(mut multipart: Multipart) -> anyhow::Result<T> {
    let mut fields = Map::new();
    while let Some(field) = multipart.next_field().await? {
        if field.file_name().is_some() {
            continue;
        }
        let Some(name) = field.name().map(str::to_string) else {
            continue;
        };
        let value = field.text().await?;
        fields.insert(name, Value::String(value));
    }
    Ok(serde_json::from_value(Value::Object(fields))?)
}
