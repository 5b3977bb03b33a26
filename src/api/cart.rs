//! Cart endpoints. All of them require an authenticated session.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::catalog::Product;
use crate::api::{unwrap_data, StorefrontClient};
use crate::errors::ClientError;
use crate::transport::RequestDescriptor;

/// One cart line with its product populated.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CartItem {
    #[serde(rename = "_id")]
    pub id: String,
    pub quantity: u32,
    #[serde(rename = "productId", default)]
    pub product: Option<Product>,
}

impl StorefrontClient {
    /// Put one unit of a product into the cart.
    pub async fn add_to_cart(&self, product_id: &str) -> Result<(), ClientError> {
        let request =
            RequestDescriptor::post("/api/cart/create").json(json!({"productId": product_id}));
        let _: serde_json::Value = unwrap_data(self.pipeline().send(request).await?)?;
        info!(product_id = %product_id, "product added to cart");
        Ok(())
    }

    /// All cart lines for the logged-in user.
    pub async fn cart_items(&self) -> Result<Vec<CartItem>, ClientError> {
        let request = RequestDescriptor::get("/api/cart/get");
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// Change the quantity of one cart line.
    pub async fn update_quantity(
        &self,
        cart_item_id: &str,
        quantity: u32,
    ) -> Result<(), ClientError> {
        let request = RequestDescriptor::put("/api/cart/update-qty").json(json!({
            "_id": cart_item_id,
            "qty": quantity,
        }));
        let _: serde_json::Value = unwrap_data(self.pipeline().send(request).await?)?;
        Ok(())
    }

    /// Remove one cart line entirely.
    pub async fn remove_cart_item(&self, cart_item_id: &str) -> Result<(), ClientError> {
        let request = RequestDescriptor::delete("/api/cart/delete-cart-item")
            .json(json!({"_id": cart_item_id}));
        let _: serde_json::Value = unwrap_data(self.pipeline().send(request).await?)?;
        info!(cart_item_id = %cart_item_id, "cart item removed");
        Ok(())
    }
}
