//! Utility functions shared across crates.

/// Formats an order id into its zero-padded customer-facing form.
///
/// Ids longer than the pad width are rendered as-is.
pub fn format_order_number(id: u64) -> String {
	format!("{:05}", id)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn pads_short_ids() {
		assert_eq!(format_order_number(7), "00007");
		assert_eq!(format_order_number(12345), "12345");
	}

	#[test]
	fn keeps_long_ids() {
		assert_eq!(format_order_number(1234567), "1234567");
	}
}
