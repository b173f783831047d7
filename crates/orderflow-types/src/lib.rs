//! Common types module for the orderflow system.
//!
//! This module defines the core data types and structures used throughout
//! the order workflow. It provides a centralized location for shared types
//! to ensure consistency across all workflow components.

/// Order entity, line items, prices, statuses and audit log entries.
pub mod order;
/// Payment method types.
pub mod payment;
/// Request DTOs for order creation and mutation.
pub mod request;
/// Shipment, address and carrier tracking types.
pub mod shipment;
/// Utility functions shared across crates.
pub mod utils;
/// Configuration validation types for ensuring type-safe configurations.
pub mod validation;

// Re-export all types for convenient access
pub use order::*;
pub use payment::*;
pub use request::*;
pub use shipment::*;
pub use utils::format_order_number;
pub use validation::*;
