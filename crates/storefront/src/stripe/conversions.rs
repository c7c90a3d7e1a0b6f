//! Conversions from Stripe wire types to domain line items.

use modern_shop_core::{LineItem, LineItemId, LineItemPrice};

use super::types::{List, StripeLineItem};
use crate::orders::LineItemError;

/// Validate a line item list page and convert its items, keeping Stripe's
/// order.
///
/// # Errors
///
/// Returns [`LineItemError::InvalidPayload`] if the page is not a list of
/// line items.
pub fn convert_line_item_list(list: List<StripeLineItem>) -> Result<Vec<LineItem>, LineItemError> {
    if list.object != "list" {
        return Err(LineItemError::InvalidPayload(format!(
            "expected object 'list', got '{}'",
            list.object
        )));
    }

    list.data.into_iter().map(convert_line_item).collect()
}

fn convert_line_item(item: StripeLineItem) -> Result<LineItem, LineItemError> {
    if item.object != "item" {
        return Err(LineItemError::InvalidPayload(format!(
            "{}: expected object 'item', got '{}'",
            item.id, item.object
        )));
    }

    Ok(LineItem {
        id: LineItemId::new(item.id),
        description: item.description.unwrap_or_default(),
        quantity: item.quantity,
        amount_subtotal: item.amount_subtotal,
        amount_total: item.amount_total,
        currency: item.currency,
        price: item.price.map(|price| LineItemPrice {
            id: price.id,
            unit_amount: price.unit_amount,
            product: price.product.map(|product| product.id().to_string()),
        }),
    })
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use serde_json::json;

    use super::*;

    fn page(data: serde_json::Value) -> List<StripeLineItem> {
        serde_json::from_value(json!({
            "object": "list",
            "data": data,
            "has_more": false,
            "url": "/v1/checkout/sessions/cs_test_1/line_items"
        }))
        .unwrap()
    }

    #[test]
    fn test_converts_items_in_order() {
        let items = convert_line_item_list(page(json!([
            {
                "id": "li_1",
                "object": "item",
                "amount_discount": 0,
                "amount_subtotal": 2000,
                "amount_tax": 0,
                "amount_total": 2000,
                "currency": "usd",
                "description": "Backpack",
                "price": { "id": "price_1", "object": "price", "unit_amount": 1000, "product": "prod_1" },
                "quantity": 2
            },
            {
                "id": "li_2",
                "object": "item",
                "amount_subtotal": 500,
                "amount_total": 500,
                "currency": "usd",
                "description": null,
                "price": { "id": "price_2", "product": { "id": "prod_2", "object": "product" } },
                "quantity": null
            }
        ])))
        .unwrap();

        assert_eq!(items.len(), 2);
        assert_eq!(items[0].id.as_str(), "li_1");
        assert_eq!(items[0].description, "Backpack");
        assert_eq!(items[0].quantity, Some(2));
        assert_eq!(
            items[0].price.as_ref().unwrap().product.as_deref(),
            Some("prod_1")
        );
        assert_eq!(items[1].description, "");
        assert_eq!(items[1].quantity, None);
        assert_eq!(
            items[1].price.as_ref().unwrap().product.as_deref(),
            Some("prod_2")
        );
    }

    #[test]
    fn test_empty_list_is_empty() {
        assert!(convert_line_item_list(page(json!([]))).unwrap().is_empty());
    }

    #[test]
    fn test_wrong_list_object_is_rejected() {
        let list: List<StripeLineItem> = serde_json::from_value(json!({
            "object": "search_result",
            "data": []
        }))
        .unwrap();
        assert!(matches!(
            convert_line_item_list(list),
            Err(LineItemError::InvalidPayload(_))
        ));
    }

    #[test]
    fn test_wrong_item_object_is_rejected() {
        let err = convert_line_item_list(page(json!([{
            "id": "price_1",
            "object": "price",
            "amount_subtotal": 0,
            "amount_total": 0,
            "currency": "usd"
        }])))
        .unwrap_err();
        assert!(matches!(err, LineItemError::InvalidPayload(ref m) if m.contains("price_1")));
    }
}
