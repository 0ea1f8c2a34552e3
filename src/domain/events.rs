use serde_json::{json, Value};
use uuid::Uuid;

use super::order::{Order, OrderStatus};

pub const ORDER_AGGREGATE: &str = "Order";

/// Events published through the outbox when an order changes.
#[derive(Debug, Clone)]
pub enum OrderEvent {
    Placed(Order),
    StatusChanged {
        order_id: Uuid,
        user_id: Uuid,
        from: OrderStatus,
        to: OrderStatus,
    },
}

impl OrderEvent {
    pub fn event_type(&self) -> &'static str {
        match self {
            OrderEvent::Placed(_) => "OrderPlaced",
            OrderEvent::StatusChanged { .. } => "OrderStatusChanged",
        }
    }

    pub fn aggregate_id(&self) -> Uuid {
        match self {
            OrderEvent::Placed(order) => order.id,
            OrderEvent::StatusChanged { order_id, .. } => *order_id,
        }
    }

    pub fn payload(&self) -> Value {
        match self {
            OrderEvent::Placed(order) => {
                let lines: Vec<Value> = order
                    .lines
                    .iter()
                    .map(|l| {
                        json!({
                            "product_id": l.product_id,
                            "variant_id": l.variant_id,
                            "sku": l.sku,
                            "quantity": l.quantity,
                            "unit_price": l.unit_price.to_string(),
                            "total_price": l.total_price.to_string()
                        })
                    })
                    .collect();
                json!({
                    "order_id": order.id,
                    "user_id": order.user_id,
                    "status": order.status.as_str(),
                    "total_amount": order.total_amount.to_string(),
                    "lines": lines
                })
            }
            OrderEvent::StatusChanged {
                order_id,
                user_id,
                from,
                to,
            } => json!({
                "order_id": order_id,
                "user_id": user_id,
                "from": from.as_str(),
                "status": to.as_str()
            }),
        }
    }
}
