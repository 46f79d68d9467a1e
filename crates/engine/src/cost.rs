use tracing::{debug, warn};

use crate::marketplace::Marketplace;

/// Shown when no price can be determined.
pub const UNKNOWN_COST: &str = "Unknown";

const NRLC_PER_RLC: f64 = 1e9;

/// Estimate what one run of `app` costs, in RLC with four decimals.
///
/// Uses the cheapest published app order. Errors and an empty order book are
/// reported as [`UNKNOWN_COST`].
pub async fn estimate_task_cost<M: Marketplace + ?Sized>(marketplace: &M, app: &str) -> String {
    match marketplace.app_orderbook(app).await {
        Ok(orders) => match orders.first() {
            Some(order) => {
                debug!(app = %app, app_price = order.app_price, "app order found");
                format_rlc(order.app_price)
            }
            None => {
                warn!(app = %app, "no app orders published");
                UNKNOWN_COST.to_string()
            }
        },
        Err(error) => {
            warn!(app = %app, error = %error, "could not read the app order book");
            UNKNOWN_COST.to_string()
        }
    }
}

fn format_rlc(nrlc: u64) -> String {
    format!("{:.4}", nrlc as f64 / NRLC_PER_RLC)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::marketplace::{AppOrder, InMemoryMarketplace};

    #[tokio::test]
    async fn cheapest_order_is_converted_to_rlc() {
        let marketplace = InMemoryMarketplace::new().with_app_orders(vec![
            AppOrder { app_price: 1_250_000_000 },
            AppOrder { app_price: 9_000_000_000 },
        ]);
        assert_eq!(estimate_task_cost(&marketplace, "0xapp").await, "1.2500");
    }

    #[tokio::test]
    async fn empty_book_is_unknown() {
        let marketplace = InMemoryMarketplace::new();
        assert_eq!(estimate_task_cost(&marketplace, "0xapp").await, UNKNOWN_COST);
    }

    #[test]
    fn formatting_keeps_four_decimals() {
        assert_eq!(format_rlc(0), "0.0000");
        assert_eq!(format_rlc(100_000), "0.0001");
    }
}
