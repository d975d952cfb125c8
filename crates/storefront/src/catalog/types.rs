//! Wire types for the catalog backend's REST collections.
//!
//! The backend exposes Strapi-style collections. Responses wrap entries
//! in a `{ "data": ... }` envelope, with one exception: the `users`
//! collection returns a bare array and also takes bare (un-enveloped)
//! update bodies. Field names on the wire are the collection's own
//! (camelCase plus the `sub_category`/`order_items` relation names), so
//! most fields carry a rename.

use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use paperstack_core::{
    CategoryId, FileId, OrderId, OrderItemId, OrderStatus, ProductId, SubCategoryId, UserId,
};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The `{ "data": ... }` response envelope.
#[derive(Debug, Deserialize)]
pub struct Document<T> {
    pub data: T,
}

/// A top-level catalog category (mirrors a root-level storage folder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Category {
    pub id: CategoryId,
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    pub name: String,
    /// Storage folder id this category mirrors.
    #[serde(rename = "categoryId")]
    pub folder_id: FileId,
    #[serde(default)]
    pub sub_categories: Option<Vec<SubCategory>>,
}

/// A sub-category (mirrors a second-level storage folder).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubCategory {
    pub id: SubCategoryId,
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    pub name: String,
    /// Storage folder id this sub-category mirrors.
    #[serde(rename = "subCategoryId")]
    pub folder_id: FileId,
}

/// A catalog product.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    pub name: String,
    /// Canonical price; display currencies are derived client-side.
    #[serde(default)]
    pub price: Decimal,
    /// File-storage id, stable across the catalog and storage provider.
    #[serde(rename = "productId")]
    pub file_id: FileId,
    #[serde(rename = "isDigital", default)]
    pub is_digital: bool,
    #[serde(default)]
    pub thumbnail: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
}

/// A catalog order record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Order {
    pub id: OrderId,
    #[serde(rename = "documentId", default)]
    pub document_id: Option<String>,
    /// Correlation key at creation; replaced by the provider payment id
    /// once the invoice settles.
    #[serde(rename = "transactionId")]
    pub transaction_id: String,
    #[serde(rename = "orderStatus", default)]
    pub status: OrderStatus,
    #[serde(rename = "orderAmount", default)]
    pub amount: Decimal,
    #[serde(rename = "paymentMethod", default)]
    pub payment_method: Option<String>,
    /// Settlement time as reported by the invoicing provider.
    #[serde(rename = "paidAt", default)]
    pub paid_at: Option<String>,
    #[serde(rename = "createdAt", default)]
    pub created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub order_items: Option<Vec<OrderItem>>,
}

impl Order {
    /// The id segment used in update paths: the document id when the
    /// backend supplies one, otherwise the numeric id.
    #[must_use]
    pub fn path_id(&self) -> String {
        self.document_id
            .clone()
            .unwrap_or_else(|| self.id.to_string())
    }
}

/// One line of an order, with the price snapshot taken at purchase.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrderItem {
    pub id: OrderItemId,
    #[serde(default)]
    pub quantity: u32,
    /// Never recomputed after creation.
    #[serde(rename = "priceAtPurchase", default)]
    pub price_at_purchase: Decimal,
    #[serde(default)]
    pub product: Option<Product>,
}

/// A catalog user record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CatalogUser {
    pub id: UserId,
    pub email: String,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(rename = "identityId", default)]
    pub identity_id: Option<String>,
    #[serde(default)]
    pub blocked: bool,
    /// Populated on request; each entry is a full product record.
    #[serde(default)]
    pub purchased: Option<Vec<Product>>,
}

impl CatalogUser {
    /// Numeric ids of the purchased products (for relation updates).
    #[must_use]
    pub fn purchased_product_ids(&self) -> Vec<ProductId> {
        self.purchased
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|product| product.id)
            .collect()
    }

    /// File ids of the purchased products (what unlocks downloads).
    #[must_use]
    pub fn purchased_file_ids(&self) -> BTreeSet<FileId> {
        self.purchased
            .as_deref()
            .unwrap_or_default()
            .iter()
            .map(|product| product.file_id.clone())
            .collect()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_order_envelope_deserializes() {
        let body = r#"{
            "data": [{
                "id": 12,
                "documentId": "abc123",
                "transactionId": "order-1700000000123",
                "orderStatus": "pending",
                "orderAmount": 2320,
                "createdAt": "2026-01-05T10:00:00.000Z"
            }],
            "meta": {}
        }"#;
        let doc: Document<Vec<Order>> = serde_json::from_str(body).unwrap();
        let order = doc.data.into_iter().next().unwrap();
        assert_eq!(order.status, OrderStatus::Pending);
        assert_eq!(order.path_id(), "abc123");
        assert_eq!(order.transaction_id, "order-1700000000123");
    }

    #[test]
    fn test_order_path_id_falls_back_to_numeric() {
        let order: Order = serde_json::from_str(
            r#"{"id": 7, "transactionId": "order-1"}"#,
        )
        .unwrap();
        assert_eq!(order.path_id(), "7");
    }

    #[test]
    fn test_users_collection_is_a_bare_array() {
        let body = r#"[{
            "id": 3,
            "email": "buyer@example.com",
            "identityId": "idp_9",
            "blocked": false,
            "purchased": [
                {"id": 1, "name": "Atlas", "price": 20, "productId": "file-a", "isDigital": true},
                {"id": 2, "name": "Poster", "price": 10, "productId": "file-b", "isDigital": false}
            ]
        }]"#;
        let users: Vec<CatalogUser> = serde_json::from_str(body).unwrap();
        let user = users.into_iter().next().unwrap();
        assert_eq!(
            user.purchased_product_ids(),
            vec![ProductId::new(1), ProductId::new(2)]
        );
        assert!(user.purchased_file_ids().contains(&FileId::from("file-a")));
    }
}
