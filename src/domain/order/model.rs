use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::errors::{OrderEntryError, OrderEntryResult};
use super::value_objects::{
    ActiveDates, CareSetting, ConceptUuid, EncounterType, OrderNumber, OrderStatus, OrderUuid,
    Orderer,
};

// ============================================================================
// Order Variant Model
// ============================================================================
//
// An order is one record with a common header and exactly one variant body.
// The `type` discriminant on the wire selects the body; orchestration code
// matches on `OrderKind` instead of probing for optional fields.
//
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Order {
    pub uuid: OrderUuid,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub order_number: Option<OrderNumber>,
    pub display: String,
    pub status: OrderStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub active_dates: Option<ActiveDates>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderer: Option<Orderer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub previous_order_uuid: Option<OrderUuid>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub urgency: Option<String>,
    #[serde(flatten)]
    pub kind: OrderKind,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum OrderKind {
    #[serde(rename = "drugorder")]
    Drug(DrugDetails),
    #[serde(rename = "testorder")]
    Test(TestDetails),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DrugDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dosing_instructions: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dispense: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub drug: Option<ConceptRef>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TestDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_setting: Option<CareSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_type: Option<EncounterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptRef>,
}

/// Reference to a drug or concept as embedded in an order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConceptRef {
    pub uuid: ConceptUuid,
    pub display: String,
}

/// Variant tag without the body, for grouping and labelling
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum OrderVariant {
    Drug,
    Test,
}

impl OrderVariant {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderVariant::Drug => "drugorder",
            OrderVariant::Test => "testorder",
        }
    }
}

impl fmt::Display for OrderVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of an order row: uuids are only unique within a variant
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct OrderKey {
    pub variant: OrderVariant,
    pub uuid: OrderUuid,
}

impl fmt::Display for OrderKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.variant, self.uuid)
    }
}

impl Order {
    pub fn key(&self) -> OrderKey {
        OrderKey {
            variant: self.variant(),
            uuid: self.uuid.clone(),
        }
    }

    pub fn variant(&self) -> OrderVariant {
        match self.kind {
            OrderKind::Drug(_) => OrderVariant::Drug,
            OrderKind::Test(_) => OrderVariant::Test,
        }
    }

    pub fn is_active(&self) -> bool {
        self.status == OrderStatus::Active
    }

    /// Identifier of the drug or concept this order already carries, if any
    pub fn concept_uuid(&self) -> Option<&ConceptUuid> {
        match &self.kind {
            OrderKind::Drug(drug) => drug.drug.as_ref().map(|d| &d.uuid),
            OrderKind::Test(test) => test.concept.as_ref().map(|c| &c.uuid),
        }
    }

    pub fn orderer_display(&self) -> &str {
        self.orderer.as_ref().map(|o| o.display.as_str()).unwrap_or("")
    }
}

/// Check that every `previousOrderUuid` pointing into `orders` targets an
/// order of the same variant.
///
/// Links to orders outside the slice are not checked; history older than the
/// current snapshot is owned by the store.
pub fn validate_lineage(orders: &[Order]) -> OrderEntryResult<()> {
    let keys: HashSet<OrderKey> = orders.iter().map(Order::key).collect();

    for order in orders {
        let Some(previous) = &order.previous_order_uuid else {
            continue;
        };

        if previous == &order.uuid {
            return Err(OrderEntryError::InvalidLineage {
                order_uuid: order.uuid.clone(),
                previous_order_uuid: previous.clone(),
            });
        }

        let same_variant = OrderKey {
            variant: order.variant(),
            uuid: previous.clone(),
        };
        if keys.contains(&same_variant) {
            continue;
        }

        if orders.iter().any(|o| &o.uuid == previous) {
            return Err(OrderEntryError::InvalidLineage {
                order_uuid: order.uuid.clone(),
                previous_order_uuid: previous.clone(),
            });
        }
    }

    Ok(())
}

// ============================================================================
// Encounter Context - store read contract
// ============================================================================

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientRef {
    pub uuid: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display: Option<String>,
}

/// Everything the order table reads from the store: who the patient is, the
/// encounter the table is operating in, and the raw order list.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderContext {
    pub patient: PatientRef,
    #[serde(default)]
    pub encounter_type: Option<EncounterType>,
    #[serde(default)]
    pub care_setting: Option<CareSetting>,
    #[serde(default)]
    pub session_location: Option<String>,
    #[serde(default)]
    pub orders: Vec<Order>,
}

impl OrderContext {
    pub fn find(&self, key: &OrderKey) -> Option<&Order> {
        self.orders
            .iter()
            .find(|o| o.variant() == key.variant && o.uuid == key.uuid)
    }
}

// ============================================================================
// Unit Tests
// ============================================================================
