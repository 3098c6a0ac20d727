use serde::{Deserialize, Serialize};

use super::errors::{OrderEntryError, OrderEntryResult};
use super::model::{Order, OrderContext, OrderKind, OrderVariant};
use super::value_objects::{CareSetting, ConceptUuid, EncounterType, OrderUuid, Orderer};

// ============================================================================
// Order Commands - what the table hands to the order-history store
// ============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "payload", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderCommand {
    DiscontinueOrder(DiscontinuePayload),
    EditOrder(Order),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum OrderAction {
    Discontinue,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscontinuePayload {
    pub previous_order_uuid: OrderUuid,
    pub action: OrderAction,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub care_setting: Option<CareSetting>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encounter_type: Option<EncounterType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub orderer: Option<Orderer>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub concept: Option<ConceptUuid>,
}

impl OrderCommand {
    /// Build the discontinue command for `order`.
    ///
    /// Test orders must end up with a care setting, an encounter type and an
    /// orderer; the first two fall back to the encounter `context` when the
    /// order does not carry them.
    pub fn discontinue(
        order: &Order,
        context: &OrderContext,
        concept: Option<ConceptUuid>,
    ) -> OrderEntryResult<Self> {
        if !order.is_active() {
            return Err(OrderEntryError::NotActive {
                order_uuid: order.uuid.clone(),
                status: order.status,
            });
        }

        let payload = match &order.kind {
            OrderKind::Drug(_) => DiscontinuePayload {
                previous_order_uuid: order.uuid.clone(),
                action: OrderAction::Discontinue,
                care_setting: None,
                encounter_type: None,
                orderer: order.orderer.clone(),
                concept,
            },
            OrderKind::Test(test) => {
                let missing = |field| OrderEntryError::MissingField {
                    order_uuid: order.uuid.clone(),
                    variant: OrderVariant::Test,
                    field,
                };

                let care_setting = test
                    .care_setting
                    .clone()
                    .or_else(|| context.care_setting.clone())
                    .ok_or_else(|| missing("careSetting"))?;
                let encounter_type = test
                    .encounter_type
                    .clone()
                    .or_else(|| context.encounter_type.clone())
                    .ok_or_else(|| missing("encounterType"))?;
                let orderer = order
                    .orderer
                    .clone()
                    .filter(|o| !o.display.trim().is_empty())
                    .ok_or_else(|| missing("orderer"))?;

                DiscontinuePayload {
                    previous_order_uuid: order.uuid.clone(),
                    action: OrderAction::Discontinue,
                    care_setting: Some(care_setting),
                    encounter_type: Some(encounter_type),
                    orderer: Some(orderer),
                    concept,
                }
            }
        };

        Ok(OrderCommand::DiscontinueOrder(payload))
    }

    /// Wire name of the command (`DISCONTINUE_ORDER` / `EDIT_ORDER`)
    pub fn command_type(&self) -> &'static str {
        match self {
            OrderCommand::DiscontinueOrder(_) => "DISCONTINUE_ORDER",
            OrderCommand::EditOrder(_) => "EDIT_ORDER",
        }
    }

    /// JSON wire form, as the store receives it
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string(self)
    }

    /// The order this command refers back to
    pub fn target(&self) -> &OrderUuid {
        match self {
            OrderCommand::DiscontinueOrder(p) => &p.previous_order_uuid,
            OrderCommand::EditOrder(order) => &order.uuid,
        }
    }
}
