//! Typed endpoint surface over the authenticated pipeline.
//!
//! One module per backend router: `auth` (`/api/user`), `catalog`
//! (`/api/category`, `/api/subcategory`, `/api/product`), `cart`
//! (`/api/cart`) and `orders` (`/api/address`, `/api/order`). All of them
//! are thin plumbing: build a descriptor, `send` it, unwrap the common
//! response envelope.

pub mod auth;
pub mod cart;
pub mod catalog;
pub mod orders;

use std::sync::Arc;

use anyhow::Result;
use serde::de::DeserializeOwned;

use crate::config::ClientConfig;
use crate::errors::ClientError;
use crate::security::credentials::CredentialStore;
use crate::transport::{ApiResponse, Envelope, HttpPipeline};

/// Storefront backend client.
///
/// Owns the authenticated pipeline and the injected credential store;
/// endpoint methods live in the router modules.
pub struct StorefrontClient {
    pipeline: HttpPipeline,
    storage: Arc<dyn CredentialStore>,
}

impl StorefrontClient {
    pub fn new(config: &ClientConfig, storage: Arc<dyn CredentialStore>) -> Result<Self> {
        let pipeline = HttpPipeline::new(config, storage.clone())?;
        Ok(Self { pipeline, storage })
    }

    pub fn pipeline(&self) -> &HttpPipeline {
        &self.pipeline
    }

    pub(crate) fn storage(&self) -> &Arc<dyn CredentialStore> {
        &self.storage
    }
}

/// Unwrap an envelope into its `data` payload.
///
/// A `success: false` envelope inside a 2xx response is still a failed
/// operation and maps to [`ClientError::RequestFailed`] carrying the
/// envelope's message.
pub(crate) fn unwrap_data<T: DeserializeOwned>(response: ApiResponse) -> Result<T, ClientError> {
    let status = response.status().as_u16();
    let envelope: Envelope<T> = response.json()?;
    if !envelope.success || envelope.error {
        return Err(ClientError::RequestFailed {
            status,
            payload: envelope.message,
        });
    }
    envelope
        .data
        .ok_or_else(|| ClientError::InvalidResponse("envelope carries no data".to_string()))
}

/// Unwrap an envelope that carries no payload, returning its message.
pub(crate) fn unwrap_message(response: ApiResponse) -> Result<String, ClientError> {
    let status = response.status().as_u16();
    let envelope: Envelope<serde_json::Value> = response.json()?;
    if !envelope.success || envelope.error {
        return Err(ClientError::RequestFailed {
            status,
            payload: envelope.message,
        });
    }
    Ok(envelope.message)
}
