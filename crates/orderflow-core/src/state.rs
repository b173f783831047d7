//! Order status state machine.
//!
//! Pure decision functions: the engine asks them what a transition means and
//! then performs the returned effect inside its session. Nothing here touches
//! storage or collaborators.

use crate::OrderError;
use orderflow_types::{Order, OrderStatus, PaymentType, ShipmentStatus};

/// Inventory/carrier effect the engine must perform for a manual transition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionEffect {
	/// No collaborator effect.
	None,
	/// Create a carrier shipment document and stamp it onto the order.
	CreateShipment,
	/// Release the inventory reservations held by the order.
	ReleaseReservations,
	/// Put the ordered quantities back on the shelf.
	ReturnToStock,
}

/// An order can be canceled unless the parcel already shipped or the order
/// reached a terminal status.
fn cancelable(current: OrderStatus) -> bool {
	!current.is_final() && current != OrderStatus::Shipped
}

/// Validates a manual status transition.
///
/// Returns the effect the engine must apply, or the error naming the
/// attempted and required states. The order is not modified.
pub fn validate_manual_transition(
	order: &Order,
	target: OrderStatus,
) -> Result<TransitionEffect, OrderError> {
	let current = order.status;
	match target {
		OrderStatus::Processing => require(current, OrderStatus::New, target, "NEW")
			.map(|_| TransitionEffect::None),
		OrderStatus::ReadyToPack => {
			require(current, OrderStatus::Processing, target, "PROCESSING")
				.map(|_| TransitionEffect::None)
		},
		OrderStatus::Packed => require(current, OrderStatus::ReadyToPack, target, "READY_TO_PACK")
			.map(|_| TransitionEffect::CreateShipment),
		OrderStatus::ReadyToShip => {
			require(current, OrderStatus::Packed, target, "PACKED")?;
			if !order.is_order_paid && order.payment_type != PaymentType::CashOnDelivery {
				return Err(OrderError::NotPaid);
			}
			Ok(TransitionEffect::None)
		},
		OrderStatus::Returning | OrderStatus::RefusedToReturn => {
			require(current, OrderStatus::RecipientDenied, target, "RECIPIENT_DENIED")
				.map(|_| TransitionEffect::None)
		},
		// Reachable from anywhere: parcels come back regardless of what the
		// order record says.
		OrderStatus::Returned => Ok(TransitionEffect::ReturnToStock),
		OrderStatus::Canceled => {
			if !cancelable(current) {
				return Err(OrderError::CannotCancel(current));
			}
			Ok(TransitionEffect::ReleaseReservations)
		},
		// NEW, SHIPPED, RECIPIENT_DENIED and FINISHED are assigned by the
		// creation workflow or derived from carrier data, never manually.
		other => Err(OrderError::UnsupportedTransition(other)),
	}
}

fn require(
	current: OrderStatus,
	expected: OrderStatus,
	target: OrderStatus,
	required: &'static str,
) -> Result<(), OrderError> {
	if current == expected {
		Ok(())
	} else {
		Err(OrderError::InvalidTransition {
			current,
			target,
			required,
		})
	}
}

/// Derives the order status implied by the carrier-reported shipment status.
///
/// Returns `None` when the shipment data implies no change. Checks run in a
/// fixed precedence: finished, then recipient denied, then just-sent, since
/// several conditions can hold at once after a carrier status jump.
pub fn derive_status_from_shipment(order: &Order) -> Option<OrderStatus> {
	let shipment_status = order.shipment.status?;
	if order.status.is_final() {
		return None;
	}

	let finished = match order.payment_type {
		PaymentType::CashOnDelivery => shipment_status == ShipmentStatus::CashPickedUp,
		_ => shipment_status == ShipmentStatus::Received,
	};
	if finished {
		return (order.status != OrderStatus::Finished).then_some(OrderStatus::Finished);
	}

	if shipment_status == ShipmentStatus::RecipientDenied {
		return (order.status != OrderStatus::RecipientDenied)
			.then_some(OrderStatus::RecipientDenied);
	}

	// The parcel left the pickup point while we still think it is waiting.
	if shipment_status != ShipmentStatus::AwaitingPickup
		&& order.status == OrderStatus::ReadyToShip
	{
		return Some(OrderStatus::Shipped);
	}

	None
}
