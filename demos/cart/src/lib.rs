//! A shopping cart aggregate, plus [`CartsProjection`], a read model that
//! folds every cart's events into a per-cart item count.

use std::collections::HashMap;

use esrun_core::aggregate::Aggregate;
use esrun_core::event::Record;
use esrun_core::projection::Projection;
use esrun_core::version::ALL;

/// A cart's state: quantity on hand per SKU.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartState {
    /// Quantity currently in the cart, keyed by SKU.
    pub items: HashMap<String, u32>,
}

/// Operations available on a [`Cart`].
#[derive(Debug, Clone)]
pub enum CartCommand {
    /// Adds `quantity` units of `sku` to the cart.
    AddItem {
        /// The item's SKU.
        sku: String,
        /// Units to add.
        quantity: u32,
    },
    /// Removes `quantity` units of `sku` from the cart.
    RemoveItem {
        /// The item's SKU.
        sku: String,
        /// Units to remove.
        quantity: u32,
    },
}

/// Facts recorded by a [`Cart`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CartEvent {
    /// Units of `sku` were added to the cart.
    ItemAdded {
        /// The item's SKU.
        sku: String,
        /// Units added.
        quantity: u32,
    },
    /// Units of `sku` were removed from the cart.
    ItemRemoved {
        /// The item's SKU.
        sku: String,
        /// Units removed.
        quantity: u32,
    },
}

/// Rejections a [`Cart`] may return from `handle_command`.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum CartError {
    /// Tried to remove more units of a SKU than the cart holds.
    #[error("cannot remove {requested} units of {sku}, only {available} available")]
    InsufficientQuantity {
        /// The item's SKU.
        sku: String,
        /// Units requested for removal.
        requested: u32,
        /// Units actually in the cart.
        available: u32,
    },
}

/// The cart aggregate module.
#[derive(Debug, Clone, Copy, Default)]
pub struct Cart;

impl Aggregate for Cart {
    const TYPE_NAME: &'static str = "cart";

    type Id = String;
    type State = CartState;
    type Command = CartCommand;
    type Event = CartEvent;
    type Error = CartError;

    fn handle_command(&self, state: &Self::State, command: Self::Command) -> Result<Vec<Self::Event>, Self::Error> {
        match command {
            CartCommand::AddItem { sku, quantity } => Ok(vec![CartEvent::ItemAdded { sku, quantity }]),
            CartCommand::RemoveItem { sku, quantity } => {
                let available = state.items.get(&sku).copied().unwrap_or(0);
                if quantity > available {
                    return Err(CartError::InsufficientQuantity {
                        sku,
                        requested: quantity,
                        available,
                    });
                }
                Ok(vec![CartEvent::ItemRemoved { sku, quantity }])
            }
        }
    }

    fn handle_event(mut state: Self::State, event: Self::Event) -> Self::State {
        match event {
            CartEvent::ItemAdded { sku, quantity } => {
                *state.items.entry(sku).or_insert(0) += quantity;
            }
            CartEvent::ItemRemoved { sku, quantity } => {
                if let Some(held) = state.items.get_mut(&sku) {
                    *held = held.saturating_sub(quantity);
                }
            }
        }
        state
    }
}

/// A read model tracking per-SKU quantity across every live cart.
#[derive(Debug, Clone, Copy, Default)]
pub struct CartsProjection;

impl Projection for CartsProjection {
    type State = CartsState;
    type Event = CartEvent;

    fn init(&self) -> (Self::State, esrun_core::version::Version) {
        (CartsState::default(), ALL)
    }

    fn handle_event(mut state: Self::State, record: &Record<Self::Event>) -> Self::State {
        let cart = state.totals.entry(record.aggregate_ref.id.clone()).or_default();
        match &record.event {
            CartEvent::ItemAdded { sku, quantity } => {
                *cart.entry(sku.clone()).or_insert(0) += quantity;
            }
            CartEvent::ItemRemoved { sku, quantity } => {
                if let Some(held) = cart.get_mut(sku) {
                    *held = held.saturating_sub(*quantity);
                }
            }
        }
        state
    }
}

/// Materialized state of [`CartsProjection`]: per-SKU quantity, keyed by
/// cart id then SKU (`SPEC_FULL.md` §8 S3).
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CartsState {
    /// Quantity held per SKU, keyed by cart id.
    pub totals: HashMap<String, HashMap<String, u32>>,
}
