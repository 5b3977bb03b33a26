//! Address book and order endpoints.

use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::info;

use crate::api::cart::CartItem;
use crate::api::{unwrap_data, StorefrontClient};
use crate::errors::ClientError;
use crate::transport::RequestDescriptor;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Address {
    #[serde(rename = "_id", default)]
    pub id: Option<String>,
    pub address_line: String,
    pub city: String,
    pub state: String,
    pub pincode: String,
    pub country: String,
    #[serde(default)]
    pub mobile: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct OrderProduct {
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub image: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Order {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(rename = "orderId", default)]
    pub order_id: String,
    #[serde(default)]
    pub product_details: Option<OrderProduct>,
    #[serde(default)]
    pub payment_status: Option<String>,
    #[serde(rename = "totalAmt", default)]
    pub total_amount: f64,
}

impl StorefrontClient {
    /// Add a delivery address to the user's address book.
    pub async fn add_address(&self, address: &Address) -> Result<(), ClientError> {
        let body = serde_json::to_value(address)
            .map_err(|err| ClientError::InvalidRequest(err.to_string()))?;
        let request = RequestDescriptor::post("/api/address/create").json(body);
        let _: serde_json::Value = unwrap_data(self.pipeline().send(request).await?)?;
        info!(city = %address.city, "address saved");
        Ok(())
    }

    /// The user's saved delivery addresses.
    pub async fn addresses(&self) -> Result<Vec<Address>, ClientError> {
        let request = RequestDescriptor::get("/api/address/get");
        unwrap_data(self.pipeline().send(request).await?)
    }

    /// Place a cash-on-delivery order for the given cart lines.
    pub async fn cash_on_delivery(
        &self,
        items: &[CartItem],
        address_id: &str,
        sub_total: f64,
        total: f64,
    ) -> Result<(), ClientError> {
        let list_items = serde_json::to_value(items)
            .map_err(|err| ClientError::InvalidRequest(err.to_string()))?;
        let request = RequestDescriptor::post("/api/order/cash-on-delivery").json(json!({
            "list_items": list_items,
            "addressId": address_id,
            "subTotalAmt": sub_total,
            "totalAmt": total,
        }));
        let _: serde_json::Value = unwrap_data(self.pipeline().send(request).await?)?;
        info!(address_id = %address_id, total, "order placed");
        Ok(())
    }

    /// Order history, newest first.
    pub async fn order_list(&self) -> Result<Vec<Order>, ClientError> {
        let request = RequestDescriptor::get("/api/order/order-list");
        unwrap_data(self.pipeline().send(request).await?)
    }
}
