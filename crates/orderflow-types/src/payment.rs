//! Payment method types.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Payment type of a payment method.
///
/// Exchanged as stable snake_case tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PaymentType {
	/// The recipient pays the carrier on receipt.
	CashOnDelivery,
	/// Online card payment confirmed before shipping.
	OnlinePayment,
	/// Direct bank transfer confirmed manually.
	BankTransfer,
}

impl fmt::Display for PaymentType {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		let token = match self {
			PaymentType::CashOnDelivery => "cash_on_delivery",
			PaymentType::OnlinePayment => "online_payment",
			PaymentType::BankTransfer => "bank_transfer",
		};
		f.write_str(token)
	}
}

/// A configured payment method with its display names.
///
/// Orders snapshot these fields at creation time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PaymentMethod {
	pub id: String,
	pub payment_type: PaymentType,
	pub admin_name: String,
	pub client_name: String,
}
