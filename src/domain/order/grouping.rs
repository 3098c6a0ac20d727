use super::model::{Order, OrderContext, OrderVariant};

// ============================================================================
// Active Order Filter/Grouper
// ============================================================================

/// One rendered table row
#[derive(Debug, Clone, PartialEq)]
pub struct OrderRow {
    pub order: Order,
    /// Human-readable active-dates range, empty when the store sent none
    pub active_dates: String,
    pub orderer: String,
    /// A discontinuation for this row is waiting on the store
    pub discontinue_pending: bool,
}

/// Active orders split by variant, each group in store order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GroupedOrders {
    pub drug_orders: Vec<OrderRow>,
    pub test_orders: Vec<OrderRow>,
}

impl GroupedOrders {
    pub fn is_empty(&self) -> bool {
        self.drug_orders.is_empty() && self.test_orders.is_empty()
    }

    pub fn len(&self) -> usize {
        self.drug_orders.len() + self.test_orders.len()
    }

    pub fn group(&self, variant: OrderVariant) -> &[OrderRow] {
        match variant {
            OrderVariant::Drug => &self.drug_orders,
            OrderVariant::Test => &self.test_orders,
        }
    }

    pub(crate) fn rows_mut(&mut self) -> impl Iterator<Item = &mut OrderRow> {
        self.drug_orders.iter_mut().chain(self.test_orders.iter_mut())
    }
}

/// Keep the `Active` orders of `context`, decorated for display and
/// partitioned into drug and test groups.
pub fn group_active_orders(context: &OrderContext, date_format: &str) -> GroupedOrders {
    let mut grouped = GroupedOrders::default();

    for order in context.orders.iter().filter(|o| o.is_active()) {
        let row = OrderRow {
            active_dates: order
                .active_dates
                .as_ref()
                .map(|d| d.render(date_format))
                .unwrap_or_default(),
            orderer: order.orderer_display().to_string(),
            order: order.clone(),
            discontinue_pending: false,
        };

        match order.variant() {
            OrderVariant::Drug => grouped.drug_orders.push(row),
            OrderVariant::Test => grouped.test_orders.push(row),
        }
    }

    tracing::debug!(
        patient = %context.patient.uuid,
        session_location = ?context.session_location,
        total = context.orders.len(),
        drug_orders = grouped.drug_orders.len(),
        test_orders = grouped.test_orders.len(),
        "Grouped active orders"
    );

    grouped
}
