//! End-to-end engine tests over the in-memory backends.
//!
//! The harness keeps clones of every backend so tests can drive carrier
//! statuses and inspect inventory and customer state next to the engine.

use super::*;
use orderflow_carrier::implementations::mock::MockCarrier;
use orderflow_carrier::CarrierService;
use orderflow_customer::implementations::memory::MemoryCustomerDirectory;
use orderflow_customer::{CustomerInterface, CustomerService};
use orderflow_inventory::implementations::memory::MemoryInventory;
use orderflow_inventory::{InventoryInterface, InventoryService, VariantRecord};
use orderflow_search::implementations::memory::MemorySearch;
use orderflow_search::SearchService;
use orderflow_storage::implementations::memory::{MemoryCounter, MemoryOrderStore};
use orderflow_storage::{CounterService, OrderStoreInterface, OrderStoreService};
use orderflow_types::{
	Address, AddressType, ClientCreateOrder, ShipmentStatus,
};
use rust_decimal::Decimal;
use tokio::sync::mpsc;

struct Harness {
	engine: Arc<OrderEngine>,
	store: MemoryOrderStore,
	inventory: MemoryInventory,
	customers: MemoryCustomerDirectory,
	carrier: MockCarrier,
	// Kept alive so enqueued notifications are not dropped with a warning.
	_notifications: mpsc::UnboundedReceiver<Notification>,
}

fn variant(sku: &str, price: u32, qty: u32) -> VariantRecord {
	VariantRecord {
		sku: sku.into(),
		product_id: 1,
		variant_id: format!("v-{sku}"),
		name: format!("Variant {sku}"),
		price: Decimal::from(price),
		image_url: None,
		slug: sku.to_lowercase(),
		qty_in_stock: qty,
		qty_reserved: 0,
		sales_count: 0,
	}
}

fn sender() -> ShipmentSender {
	ShipmentSender {
		first_name: "Shop".into(),
		last_name: "Sender".into(),
		phone: "+380440000000".into(),
		settlement: "Lviv".into(),
		address: "Warehouse 1".into(),
		address_type: AddressType::Warehouse,
	}
}

fn recipient() -> Address {
	Address {
		first_name: "Anna".into(),
		last_name: "Koval".into(),
		phone: "+380501112233".into(),
		settlement: "Kyiv".into(),
		address: "Warehouse 12".into(),
		address_type: AddressType::Warehouse,
	}
}

fn harness() -> Harness {
	let store = MemoryOrderStore::new();
	let counter = MemoryCounter::new();
	let inventory = MemoryInventory::with_variants(vec![
		variant("SKU-A", 100, 10),
		variant("SKU-B", 50, 5),
	]);
	let customers = MemoryCustomerDirectory::new();
	let carrier = MockCarrier::new();
	let search = MemorySearch::new();
	let (queue, receiver) = NotificationQueue::new();

	let engine = OrderEngine::new(
		Arc::new(OrderStoreService::new(Box::new(store.clone()))),
		Arc::new(CounterService::new(Box::new(counter))),
		Arc::new(InventoryService::new(Box::new(inventory.clone()))),
		Arc::new(CustomerService::new(Box::new(customers.clone()))),
		Arc::new(CarrierService::new(Box::new(carrier.clone()))),
		Arc::new(SearchService::new(Box::new(search))),
		queue,
		vec![
			PaymentMethod {
				id: "cod".into(),
				payment_type: PaymentType::CashOnDelivery,
				admin_name: "COD".into(),
				client_name: "Cash on delivery".into(),
			},
			PaymentMethod {
				id: "card".into(),
				payment_type: PaymentType::OnlinePayment,
				admin_name: "Card online".into(),
				client_name: "Pay by card".into(),
			},
		],
		sender(),
		"orders".into(),
	);

	Harness {
		engine: Arc::new(engine),
		store,
		inventory,
		customers,
		carrier,
		_notifications: receiver,
	}
}

fn line(sku: &str, qty: u32, discount: u32) -> NewOrderItem {
	NewOrderItem {
		sku: sku.into(),
		qty,
		discount_value: Decimal::from(discount),
		additional_services: vec![],
	}
}

fn admin_dto(items: Vec<NewOrderItem>, payment_method_id: &str) -> AdminCreateOrder {
	AdminCreateOrder {
		customer_id: None,
		customer_first_name: "Anna".into(),
		customer_last_name: "Koval".into(),
		customer_email: "anna@example.com".into(),
		customer_phone: "+380501112233".into(),
		should_save_address: true,
		recipient: recipient(),
		items,
		payment_method_id: payment_method_id.into(),
		admin_note: String::new(),
		is_callback_needed: false,
		migrate: None,
		tracking_number: None,
	}
}

/// Drives a freshly created COD order to SHIPPED through the carrier.
async fn ship(h: &Harness, order_id: u64) -> Order {
	h.engine
		.change_status(order_id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();
	let order = h
		.engine
		.change_status(order_id, OrderStatus::Packed, None)
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::ReadyToShip);
	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::InTransit,
		"On the way",
	);
	h.engine.reconcile_shipments().await.unwrap();
	let order = h.engine.get_order(order_id).await.unwrap();
	assert_eq!(order.status, OrderStatus::Shipped);
	order
}

#[tokio::test]
async fn admin_creation_reserves_stock_and_prices_order() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(
			vec![line("SKU-A", 2, 20), line("SKU-B", 1, 0)],
			"card",
		))
		.await
		.unwrap();

	assert_eq!(order.id, 1);
	assert_eq!(order.id_for_customer, "00001");
	assert_eq!(order.status, OrderStatus::Processing);
	assert_eq!(order.prices.items_cost, Decimal::from(250));
	assert_eq!(order.prices.discount_value, Decimal::from(20));
	assert_eq!(order.prices.total_cost, Decimal::from(230));
	assert_eq!(order.payment_type, PaymentType::OnlinePayment);
	assert_eq!(order.shipping_method_name, AddressType::Warehouse.shipping_method_name());

	// Line items snapshot the catalog at creation time.
	assert_eq!(order.items[0].name, "Variant SKU-A");
	assert_eq!(order.items[0].price, Decimal::from(100));

	let sku_a = h.inventory.find_variant("SKU-A").await.unwrap();
	assert_eq!(sku_a.qty_reserved, 2);
	assert_eq!(sku_a.qty_in_stock, 10);

	let customer = h
		.customers
		.resolve_by_contact("anna@example.com", "")
		.await
		.unwrap()
		.unwrap();
	assert_eq!(customer.order_ids, vec![1]);
	assert_eq!(customer.addresses.len(), 1);
	assert_eq!(order.customer_id, customer.id);

	let stored = h.engine.get_order(1).await.unwrap();
	assert_eq!(stored.status, OrderStatus::Processing);
}

#[tokio::test]
async fn failed_creation_leaves_no_observable_state() {
	let h = harness();
	let err = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0), line("SKU-B", 99, 0)], "cod"))
		.await
		.unwrap_err();
	assert!(matches!(
		err,
		OrderError::Inventory(orderflow_inventory::InventoryError::InsufficientStock { .. })
	));

	assert_eq!(h.store.estimated_count().await.unwrap(), 0);
	assert_eq!(h.inventory.find_variant("SKU-A").await.unwrap().qty_reserved, 0);
	assert_eq!(h.inventory.find_variant("SKU-B").await.unwrap().qty_reserved, 0);
	assert!(h
		.customers
		.resolve_by_contact("anna@example.com", "")
		.await
		.unwrap()
		.is_none());

	// The burned counter value is not reissued.
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	assert_eq!(order.id, 2);
}

#[tokio::test]
async fn unknown_payment_method_is_rejected_before_any_write() {
	let h = harness();
	let err = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "crypto"))
		.await
		.unwrap_err();
	assert!(matches!(err, OrderError::PaymentMethodNotFound(id) if id == "crypto"));
	assert_eq!(h.store.estimated_count().await.unwrap(), 0);
}

#[tokio::test]
async fn concurrent_creations_get_distinct_ids() {
	let h = harness();
	let mut handles = Vec::new();
	for i in 0..4 {
		let engine = h.engine.clone();
		handles.push(tokio::spawn(async move {
			engine
				.create_order_client(ClientCreateOrder {
					email: format!("user{i}@example.com"),
					address: recipient(),
					items: vec![line("SKU-A", 1, 0)],
					payment_method_id: "cod".into(),
					customer_note: String::new(),
					is_callback_needed: false,
				})
				.await
				.unwrap()
				.id
		}));
	}

	let mut ids = Vec::new();
	for handle in handles {
		ids.push(handle.await.unwrap());
	}
	ids.sort_unstable();
	ids.dedup();
	assert_eq!(ids.len(), 4);
	assert_eq!(h.store.estimated_count().await.unwrap(), 4);
}

#[tokio::test]
async fn client_checkout_reuses_customer_and_empties_cart() {
	let h = harness();
	let first = h
		.engine
		.create_order_client(ClientCreateOrder {
			email: "anna@example.com".into(),
			address: recipient(),
			items: vec![line("SKU-A", 1, 0)],
			payment_method_id: "card".into(),
			customer_note: "call before delivery".into(),
			is_callback_needed: true,
		})
		.await
		.unwrap();
	assert_eq!(first.status, OrderStatus::New);
	assert_eq!(first.customer_note, "call before delivery");

	// Second checkout with the same email attaches to the same customer and
	// merges the new address.
	let mut other_address = recipient();
	other_address.address = "Warehouse 40".into();
	let second = h
		.engine
		.create_order_client(ClientCreateOrder {
			email: "ANNA@example.com".into(),
			address: other_address,
			items: vec![line("SKU-B", 1, 0)],
			payment_method_id: "cod".into(),
			customer_note: String::new(),
			is_callback_needed: false,
		})
		.await
		.unwrap();
	assert_eq!(second.customer_id, first.customer_id);

	let customer = h.customers.get_by_id(first.customer_id).await.unwrap();
	assert_eq!(customer.order_ids, vec![first.id, second.id]);
	assert_eq!(customer.addresses.len(), 2);
	assert!(customer.cart.is_empty());
}

#[tokio::test]
async fn packing_creates_shipment_and_cod_advances_to_ready_to_ship() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();

	h.engine
		.change_status(order.id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();
	let order = h
		.engine
		.change_status(order.id, OrderStatus::Packed, None)
		.await
		.unwrap();

	assert_eq!(order.status, OrderStatus::ReadyToShip);
	assert_eq!(order.shipment.tracking_number, "20450000000001");
	assert_eq!(order.shipment.status, Some(ShipmentStatus::AwaitingPickup));
	assert!(order.shipment.sender.is_some());
	assert!(order.shipment.estimated_delivery_date.is_some());
}

#[tokio::test]
async fn unpaid_card_order_is_gated_at_packed() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "card"))
		.await
		.unwrap();

	h.engine
		.change_status(order.id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();
	let order = h
		.engine
		.change_status(order.id, OrderStatus::Packed, None)
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::Packed);

	let err = h
		.engine
		.change_status(order.id, OrderStatus::ReadyToShip, None)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderError::NotPaid));

	// Payment confirmation opens the gate, revocation closes it again.
	let order = h.engine.set_payment_status(order.id, true).await.unwrap();
	assert_eq!(order.status, OrderStatus::ReadyToShip);
	assert!(order.is_order_paid);

	let order = h.engine.set_payment_status(order.id, false).await.unwrap();
	assert_eq!(order.status, OrderStatus::Packed);
	assert!(!order.is_order_paid);
}

#[tokio::test]
async fn carrier_failure_aborts_the_packing_transaction() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	h.engine
		.change_status(order.id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();

	h.carrier.fail_next_call();
	let err = h
		.engine
		.change_status(order.id, OrderStatus::Packed, None)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderError::Carrier(_)));

	let order = h.engine.get_order(order.id).await.unwrap();
	assert_eq!(order.status, OrderStatus::ReadyToPack);
	assert!(order.shipment.tracking_number.is_empty());
}

#[tokio::test]
async fn cancel_releases_reservations() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 2, 0)], "cod"))
		.await
		.unwrap();

	let order = h
		.engine
		.change_status(order.id, OrderStatus::Canceled, None)
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::Canceled);

	let sku_a = h.inventory.find_variant("SKU-A").await.unwrap();
	assert_eq!(sku_a.qty_reserved, 0);
	assert_eq!(sku_a.qty_in_stock, 10);
}

#[tokio::test]
async fn shipped_order_cannot_be_canceled() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;

	let err = h
		.engine
		.change_status(order.id, OrderStatus::Canceled, None)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderError::CannotCancel(OrderStatus::Shipped)));
	assert_eq!(
		h.engine.get_order(order.id).await.unwrap().status,
		OrderStatus::Shipped
	);
}

#[tokio::test]
async fn shipping_commits_stock_and_sales_count() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 2, 0)], "cod"))
		.await
		.unwrap();
	ship(&h, created.id).await;

	let sku_a = h.inventory.find_variant("SKU-A").await.unwrap();
	assert_eq!(sku_a.qty_in_stock, 8);
	assert_eq!(sku_a.qty_reserved, 0);
	assert_eq!(sku_a.sales_count, 2);
}

#[tokio::test]
async fn reconciliation_is_idempotent() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;
	let logs_after_shipping = order.logs.len();

	// Nothing moved at the carrier, so a second sweep writes nothing.
	let summary = h.engine.reconcile_shipments().await.unwrap();
	assert_eq!(summary.scanned, 1);
	assert_eq!(summary.updated, 0);

	let order = h.engine.get_order(order.id).await.unwrap();
	assert_eq!(order.logs.len(), logs_after_shipping);
	assert_eq!(h.inventory.find_variant("SKU-A").await.unwrap().sales_count, 1);
}

#[tokio::test]
async fn recipient_denial_has_no_inventory_effect() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;
	let logs_before = order.logs.len();

	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::RecipientDenied,
		"Recipient refused the parcel",
	);
	let summary = h.engine.reconcile_shipments().await.unwrap();
	assert_eq!(summary.updated, 1);

	let order = h.engine.get_order(order.id).await.unwrap();
	assert_eq!(order.status, OrderStatus::RecipientDenied);
	// One entry for the shipment status, one for the derived order status.
	assert_eq!(order.logs.len(), logs_before + 2);
	assert_eq!(
		order
			.logs
			.iter()
			.filter(|entry| entry.text.contains(&OrderStatus::RecipientDenied.to_string()))
			.count(),
		2
	);

	let sku_a = h.inventory.find_variant("SKU-A").await.unwrap();
	assert_eq!(sku_a.qty_in_stock, 9);
	assert_eq!(sku_a.sales_count, 1);

	// The denied order continues through the manual return flow.
	let order = h
		.engine
		.change_status(order.id, OrderStatus::Returning, None)
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::Returning);
	let order = h
		.engine
		.change_status(order.id, OrderStatus::Returned, None)
		.await
		.unwrap();
	assert_eq!(order.status, OrderStatus::Returned);
	assert_eq!(h.inventory.find_variant("SKU-A").await.unwrap().qty_in_stock, 10);
}

#[tokio::test]
async fn cod_order_finishes_on_cash_pickup_not_receipt() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 2, 20)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;

	// Parcel received, but the money has not been collected yet.
	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::Received,
		"Parcel received",
	);
	h.engine.reconcile_shipments().await.unwrap();
	let order = h.engine.get_order(order.id).await.unwrap();
	assert_eq!(order.status, OrderStatus::Shipped);
	assert!(!order.is_order_paid);

	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::CashPickedUp,
		"Cash transferred to sender",
	);
	h.engine.reconcile_shipments().await.unwrap();
	let order = h.engine.get_order(order.id).await.unwrap();
	assert_eq!(order.status, OrderStatus::Finished);
	assert!(order.is_order_paid);

	let customer = h.customers.get_by_id(order.customer_id).await.unwrap();
	assert_eq!(customer.total_spent, Decimal::from(180));

	// Finished orders leave the reconciliation working set.
	let summary = h.engine.reconcile_shipments().await.unwrap();
	assert_eq!(summary.scanned, 0);
}

#[tokio::test]
async fn edit_merges_only_the_allow_list() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "card"))
		.await
		.unwrap();

	let edited = h
		.engine
		.edit_order(
			order.id,
			EditOrder {
				items: Some(vec![line("SKU-B", 2, 0)]),
				payment_method_id: Some("cod".into()),
				admin_note: Some("priority".into()),
				..EditOrder::default()
			},
		)
		.await
		.unwrap();

	assert_eq!(edited.items.len(), 1);
	assert_eq!(edited.items[0].sku, "SKU-B");
	assert_eq!(edited.prices.total_cost, Decimal::from(100));
	assert_eq!(edited.payment_type, PaymentType::CashOnDelivery);
	assert_eq!(edited.admin_note, "priority");
	// Untouched fields survive the merge.
	assert_eq!(edited.status, OrderStatus::Processing);
	assert_eq!(edited.customer_email, "anna@example.com");

	assert_eq!(h.inventory.find_variant("SKU-A").await.unwrap().qty_reserved, 0);
	assert_eq!(h.inventory.find_variant("SKU-B").await.unwrap().qty_reserved, 2);
}

#[tokio::test]
async fn shipped_order_cannot_be_edited() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;

	let err = h
		.engine
		.edit_order(
			order.id,
			EditOrder {
				admin_note: Some("too late".into()),
				..EditOrder::default()
			},
		)
		.await
		.unwrap_err();
	assert!(matches!(err, OrderError::CannotEdit(OrderStatus::Shipped)));
}

#[tokio::test]
async fn denied_order_is_still_editable() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	let order = ship(&h, created.id).await;

	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::RecipientDenied,
		"Recipient refused the parcel",
	);
	h.engine.reconcile_shipments().await.unwrap();

	let edited = h
		.engine
		.edit_order(
			order.id,
			EditOrder {
				admin_note: Some("arrange a second delivery".into()),
				..EditOrder::default()
			},
		)
		.await
		.unwrap();
	assert_eq!(edited.status, OrderStatus::RecipientDenied);
	assert_eq!(edited.admin_note, "arrange a second delivery");
}

#[tokio::test]
async fn packing_applies_the_shipment_patch_first() {
	let h = harness();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	h.engine
		.change_status(order.id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();

	let mut corrected = recipient();
	corrected.address_type = AddressType::Doors;
	let order = h
		.engine
		.change_status(
			order.id,
			OrderStatus::Packed,
			Some(ShipmentPatch {
				recipient: Some(corrected),
				weight_kg: Some(2.5),
				declared_value: Some(Decimal::from(500)),
				..ShipmentPatch::default()
			}),
		)
		.await
		.unwrap();

	assert_eq!(order.shipment.weight_kg, Some(2.5));
	assert_eq!(order.shipment.declared_value, Some(Decimal::from(500)));
	assert_eq!(order.shipment.recipient.address_type, AddressType::Doors);
	assert_eq!(
		order.shipping_method_name,
		AddressType::Doors.shipping_method_name()
	);
	assert!(!order.shipment.tracking_number.is_empty());
}

#[tokio::test]
async fn migrated_order_keeps_identity_and_skips_inventory() {
	let h = harness();
	let created_at = Utc::now() - chrono::Duration::days(400);
	let mut dto = admin_dto(vec![line("SKU-A", 1, 0)], "cod");
	dto.migrate = Some(MigratedOrderData {
		id: 777,
		status: OrderStatus::Finished,
		created_at,
	});

	let order = h.engine.create_order_admin(dto).await.unwrap();
	assert_eq!(order.id, 777);
	assert_eq!(order.id_for_customer, "00777");
	assert_eq!(order.status, OrderStatus::Finished);
	assert_eq!(order.created_at, created_at);
	// Prices are still computed from the catalog snapshot.
	assert_eq!(order.prices.total_cost, Decimal::from(100));

	let sku_a = h.inventory.find_variant("SKU-A").await.unwrap();
	assert_eq!(sku_a.qty_reserved, 0);
	assert_eq!(sku_a.qty_in_stock, 10);
}

#[tokio::test]
async fn admin_creation_with_tracking_number_fetches_live_status() {
	let h = harness();
	h.carrier
		.set_status("20459990000001", ShipmentStatus::InTransit, "On the way");

	let mut dto = admin_dto(vec![line("SKU-A", 1, 0)], "cod");
	dto.tracking_number = Some("20459990000001".into());

	let order = h.engine.create_order_admin(dto).await.unwrap();
	assert_eq!(order.shipment.tracking_number, "20459990000001");
	assert_eq!(order.shipment.status, Some(ShipmentStatus::InTransit));
}

#[tokio::test]
async fn refresh_pulls_status_for_one_order() {
	let h = harness();
	let created = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	h.engine
		.change_status(created.id, OrderStatus::ReadyToPack, None)
		.await
		.unwrap();
	let order = h
		.engine
		.change_status(created.id, OrderStatus::Packed, None)
		.await
		.unwrap();

	h.carrier.set_status(
		&order.shipment.tracking_number,
		ShipmentStatus::InTransit,
		"On the way",
	);
	let order = h.engine.refresh_shipment_status(order.id).await.unwrap();
	assert_eq!(order.status, OrderStatus::Shipped);
	assert_eq!(order.shipment.status, Some(ShipmentStatus::InTransit));
}

#[tokio::test]
async fn list_orders_uses_the_search_mirror_for_filters() {
	let h = harness();
	h.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	h.engine
		.create_order_client(ClientCreateOrder {
			email: "borys@example.com".into(),
			address: Address {
				first_name: "Borys".into(),
				last_name: "Hrin".into(),
				phone: "+380671234567".into(),
				settlement: "Odesa".into(),
				address: "Warehouse 3".into(),
				address_type: AddressType::Warehouse,
			},
			items: vec![line("SKU-B", 1, 0)],
			payment_method_id: "card".into(),
			customer_note: String::new(),
			is_callback_needed: false,
		})
		.await
		.unwrap();

	let processing = h
		.engine
		.list_orders(&OrderFilter {
			status: Some(OrderStatus::Processing),
			..OrderFilter::default()
		})
		.await
		.unwrap();
	assert_eq!(processing.len(), 1);
	assert_eq!(processing[0].customer_first_name, "Anna");

	let by_term = h
		.engine
		.list_orders(&OrderFilter {
			term: Some("borys".into()),
			..OrderFilter::default()
		})
		.await
		.unwrap();
	assert_eq!(by_term.len(), 1);
	assert_eq!(by_term[0].status, OrderStatus::New);

	// A plain listing goes to the store, newest first.
	let all = h.engine.list_orders(&OrderFilter::default()).await.unwrap();
	assert_eq!(all.len(), 2);
	assert_eq!(all[0].id, 2);

	assert_eq!(h.engine.count_orders().await.unwrap(), 2);
}

#[tokio::test]
async fn pinned_counter_moves_the_sequence() {
	let h = harness();
	h.engine.set_counter(100).await.unwrap();
	let order = h
		.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();
	assert_eq!(order.id, 101);
}

#[tokio::test]
async fn reindex_rebuilds_the_mirror() {
	let h = harness();
	h.engine
		.create_order_admin(admin_dto(vec![line("SKU-A", 1, 0)], "cod"))
		.await
		.unwrap();

	let reindexed = h.engine.reindex_search().await.unwrap();
	assert_eq!(reindexed, 1);

	let found = h
		.engine
		.list_orders(&OrderFilter {
			term: Some("anna".into()),
			..OrderFilter::default()
		})
		.await
		.unwrap();
	assert_eq!(found.len(), 1);
}
