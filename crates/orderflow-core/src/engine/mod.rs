//! The order workflow engine.
//!
//! Every mutating operation runs inside exactly one storage [`Session`]:
//! counter allocation, inventory moves, customer mutations and the order
//! write either all commit or all roll back. The search mirror and outbound
//! notifications run after commit and are best-effort: their failures are
//! logged and never unwind the committed transaction.

mod reconcile;

pub use reconcile::ReconcileSummary;

use crate::notify::{Notification, NotificationQueue};
use crate::{pricing, state, OrderError, TransitionEffect};
use chrono::Utc;
use orderflow_carrier::{CarrierService, ShipmentRequest};
use orderflow_customer::{CustomerRecord, CustomerService, NewCustomer};
use orderflow_inventory::{InventoryError, InventoryService};
use orderflow_search::{SearchError, SearchQuery, SearchService};
use orderflow_storage::{CounterService, OrderStoreService, Session, StoreError};
use orderflow_types::{
	AdminCreateOrder, ClientCreateOrder, EditOrder, MigratedOrderData, NewOrderItem, Order,
	OrderFilter, OrderItem, OrderStatus, PaymentMethod, PaymentType, Shipment, ShipmentPatch,
	ShipmentSender, TrackingEvent,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;

/// Search mirror collection holding the order documents.
pub const ORDERS_COLLECTION: &str = "orders";

/// Parcel weight stamped onto carrier documents when none was supplied.
const DEFAULT_WEIGHT_KG: f64 = 1.0;

/// An order stays editable until the parcel ships or the order reaches a
/// terminal status.
fn editable(status: OrderStatus) -> bool {
	!status.is_final() && status != OrderStatus::Shipped
}

/// The order workflow orchestrator.
///
/// All collaborators are injected through the constructor; the engine only
/// sees their service wrappers.
pub struct OrderEngine {
	store: Arc<OrderStoreService>,
	counter: Arc<CounterService>,
	inventory: Arc<InventoryService>,
	customers: Arc<CustomerService>,
	carrier: Arc<CarrierService>,
	search: Arc<SearchService>,
	notifications: NotificationQueue,
	payment_methods: HashMap<String, PaymentMethod>,
	sender: ShipmentSender,
	counter_collection: String,
	cached_count: AtomicU64,
	count_cache_warm: AtomicBool,
}

/// Normalized input of the shared creation path.
struct OrderDraft {
	customer: CustomerRecord,
	recipient: orderflow_types::Address,
	items: Vec<NewOrderItem>,
	payment_method_id: String,
	status: OrderStatus,
	admin_note: String,
	customer_note: String,
	is_callback_needed: bool,
	migrate: Option<MigratedOrderData>,
	tracking_number: Option<String>,
}

impl OrderEngine {
	/// Creates a new engine from its collaborators.
	#[allow(clippy::too_many_arguments)]
	pub fn new(
		store: Arc<OrderStoreService>,
		counter: Arc<CounterService>,
		inventory: Arc<InventoryService>,
		customers: Arc<CustomerService>,
		carrier: Arc<CarrierService>,
		search: Arc<SearchService>,
		notifications: NotificationQueue,
		payment_methods: Vec<PaymentMethod>,
		sender: ShipmentSender,
		counter_collection: String,
	) -> Self {
		Self {
			store,
			counter,
			inventory,
			customers,
			carrier,
			search,
			notifications,
			payment_methods: payment_methods
				.into_iter()
				.map(|method| (method.id.clone(), method))
				.collect(),
			sender,
			counter_collection,
			cached_count: AtomicU64::new(0),
			count_cache_warm: AtomicBool::new(false),
		}
	}

	fn payment_method(&self, id: &str) -> Result<PaymentMethod, OrderError> {
		self.payment_methods
			.get(id)
			.cloned()
			.ok_or_else(|| OrderError::PaymentMethodNotFound(id.to_string()))
	}

	async fn load_order(
		&self,
		id: u64,
		session: Option<&Session>,
	) -> Result<Order, OrderError> {
		match self.store.find_by_id(id, session).await {
			Ok(order) => Ok(order),
			Err(StoreError::NotFound) => Err(OrderError::OrderNotFound(id)),
			Err(e) => Err(e.into()),
		}
	}

	/// Resolves requested line items against the catalog and reserves stock.
	async fn build_items(
		&self,
		requested: &[NewOrderItem],
		order_id: u64,
		reserve: bool,
		session: &mut Session,
	) -> Result<Vec<OrderItem>, OrderError> {
		let mut items = Vec::with_capacity(requested.len());
		for line in requested {
			let variant = self.inventory.find_variant(&line.sku).await?;
			if reserve {
				self.inventory
					.reserve(&line.sku, line.qty, order_id, session)
					.await?;
			}
			items.push(OrderItem {
				product_id: variant.product_id,
				variant_id: variant.variant_id,
				sku: variant.sku,
				name: variant.name,
				qty: line.qty,
				price: variant.price,
				discount_value: line.discount_value,
				cost: Default::default(),
				total_cost: Default::default(),
				image_url: variant.image_url,
				slug: variant.slug,
				additional_services: line.additional_services.clone(),
			});
		}
		Ok(items)
	}

	/// The shared creation path, inside the caller's session.
	async fn create_order_in_session(
		&self,
		draft: OrderDraft,
		session: &mut Session,
	) -> Result<Order, OrderError> {
		let method = self.payment_method(&draft.payment_method_id)?;

		// Historical imports keep their id, status and creation time and do
		// not touch stock; everything else allocates and reserves.
		let (id, status, created_at, reserve) = match &draft.migrate {
			Some(migrated) => (migrated.id, migrated.status, migrated.created_at, false),
			None => {
				let id = self
					.counter
					.next_value(&self.counter_collection, session)
					.await?;
				(id, draft.status, Utc::now(), true)
			},
		};

		let items = self.build_items(&draft.items, id, reserve, session).await?;

		let mut order = Order {
			id,
			id_for_customer: orderflow_types::format_order_number(id),
			customer_id: draft.customer.id,
			customer_first_name: draft.customer.first_name.clone(),
			customer_last_name: draft.customer.last_name.clone(),
			customer_email: draft.customer.email.clone(),
			customer_phone: draft.customer.phone.clone(),
			discount_percent: draft.customer.discount_percent,
			items,
			prices: Default::default(),
			status,
			shipment: Shipment {
				recipient: draft.recipient.clone(),
				..Shipment::default()
			},
			is_order_paid: false,
			payment_type: method.payment_type,
			payment_method_id: method.id.clone(),
			payment_method_admin_name: method.admin_name.clone(),
			payment_method_client_name: method.client_name.clone(),
			shipping_method_name: draft
				.recipient
				.address_type
				.shipping_method_name()
				.to_string(),
			client_note: String::new(),
			admin_note: draft.admin_note,
			customer_note: draft.customer_note,
			is_callback_needed: draft.is_callback_needed,
			logs: vec![],
			created_at,
			updated_at: Utc::now(),
		};
		pricing::recalculate(&mut order);
		order.push_log(format!("Order created with status {}", order.status));

		// A tracking number carried over from an external system is trusted
		// but its live status is fetched right away.
		if let Some(tracking_number) = &draft.tracking_number {
			order.shipment.tracking_number = tracking_number.clone();
			if let Some(event) = self.carrier.fetch_status(tracking_number).await? {
				order.shipment.status = Some(event.status);
				order.shipment.status_description = event.status_description;
			}
		}

		self.customers
			.register_order(draft.customer.id, id, session)
			.await?;
		self.store.insert(&order, session).await?;
		Ok(order)
	}

	/// Administrative order creation.
	pub async fn create_order_admin(&self, dto: AdminCreateOrder) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;

		let customer = match dto.customer_id {
			Some(customer_id) => {
				let customer = self.customers.get_by_id(customer_id).await?;
				if dto.should_save_address {
					self.customers
						.add_address(customer_id, dto.recipient.clone(), &mut session)
						.await?
				} else {
					customer
				}
			},
			None => {
				let existing = self
					.customers
					.resolve_by_contact(&dto.customer_email, &dto.customer_phone)
					.await?;
				match existing {
					Some(customer) if dto.should_save_address => {
						self.customers
							.add_address(customer.id, dto.recipient.clone(), &mut session)
							.await?
					},
					Some(customer) => customer,
					None => {
						self.customers
							.create_customer(
								NewCustomer {
									first_name: dto.customer_first_name.clone(),
									last_name: dto.customer_last_name.clone(),
									email: dto.customer_email.clone(),
									phone: dto.customer_phone.clone(),
									address: Some(dto.recipient.clone()),
								},
								&mut session,
							)
							.await?
					},
				}
			},
		};

		let order = self
			.create_order_in_session(
				OrderDraft {
					customer,
					recipient: dto.recipient,
					items: dto.items,
					payment_method_id: dto.payment_method_id,
					status: OrderStatus::Processing,
					admin_note: dto.admin_note,
					customer_note: String::new(),
					is_callback_needed: dto.is_callback_needed,
					migrate: dto.migrate,
					tracking_number: dto.tracking_number,
				},
				&mut session,
			)
			.await?;
		session.commit();

		tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "Order created by admin");
		self.after_commit(&order).await;
		self.notifications.enqueue(Notification::ManagerAlert {
			order_id: order.id,
			message: format!("Order #{} created by admin", order.id_for_customer),
		});
		self.notifications.enqueue(Notification::LeaveReviewReminder {
			order_id: order.id,
			email: order.customer_email.clone(),
		});
		Ok(order)
	}

	/// Client checkout.
	pub async fn create_order_client(&self, dto: ClientCreateOrder) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;

		let existing = self
			.customers
			.resolve_by_contact(&dto.email, &dto.address.phone)
			.await?;
		let customer = match existing {
			Some(customer) => {
				self.customers
					.add_address(customer.id, dto.address.clone(), &mut session)
					.await?
			},
			None => {
				self.customers
					.create_customer(
						NewCustomer {
							first_name: dto.address.first_name.clone(),
							last_name: dto.address.last_name.clone(),
							email: dto.email.clone(),
							phone: dto.address.phone.clone(),
							address: Some(dto.address.clone()),
						},
						&mut session,
					)
					.await?
			},
		};
		self.customers.empty_cart(customer.id, &mut session).await?;

		let order = self
			.create_order_in_session(
				OrderDraft {
					customer,
					recipient: dto.address,
					items: dto.items,
					payment_method_id: dto.payment_method_id,
					status: OrderStatus::New,
					admin_note: String::new(),
					customer_note: dto.customer_note,
					is_callback_needed: dto.is_callback_needed,
					migrate: None,
					tracking_number: None,
				},
				&mut session,
			)
			.await?;
		session.commit();

		tracing::info!(order_id = %order.id, customer_id = %order.customer_id, "Order placed by client");
		self.after_commit(&order).await;
		self.notifications.enqueue(Notification::OrderConfirmation {
			order_id: order.id,
			email: order.customer_email.clone(),
		});
		self.notifications.enqueue(Notification::LeaveReviewReminder {
			order_id: order.id,
			email: order.customer_email.clone(),
		});
		Ok(order)
	}

	/// Manual status transition with its guarded side effects. An optional
	/// shipment patch is applied first, so packing picks up corrected
	/// recipient, weight or declared-value data.
	pub async fn change_status(
		&self,
		order_id: u64,
		target: OrderStatus,
		patch: Option<ShipmentPatch>,
	) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;
		let mut order = self.load_order(order_id, Some(&session)).await?;

		let effect = state::validate_manual_transition(&order, target)?;
		if let Some(patch) = &patch {
			self.apply_shipment_patch(&mut order, patch, &mut session)
				.await?;
		}
		match effect {
			TransitionEffect::CreateShipment => {
				self.create_shipment_document(&mut order).await?;
			},
			TransitionEffect::ReleaseReservations => {
				self.release_reservations(&order, &mut session).await?;
			},
			TransitionEffect::ReturnToStock => {
				for item in &order.items {
					self.inventory
						.return_to_stock(&item.sku, item.qty, &mut session)
						.await?;
				}
			},
			TransitionEffect::None => {},
		}

		assign_status(&mut order, target);
		// The payment gate is already open for these orders, skip it.
		if target == OrderStatus::Packed
			&& (order.payment_type == PaymentType::CashOnDelivery || order.is_order_paid)
		{
			assign_status(&mut order, OrderStatus::ReadyToShip);
		}

		order.updated_at = Utc::now();
		self.store.update(&order, &mut session).await?;
		session.commit();

		tracing::info!(order_id = %order.id, status = %order.status, "Order status changed");
		self.after_commit(&order).await;
		Ok(order)
	}

	/// Allow-list edit of a mutable order.
	pub async fn edit_order(&self, order_id: u64, edit: EditOrder) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;
		let mut order = self.load_order(order_id, Some(&session)).await?;

		if !editable(order.status) {
			return Err(OrderError::CannotEdit(order.status));
		}

		if let Some(items) = &edit.items {
			self.release_reservations(&order, &mut session).await?;
			order.items = self.build_items(items, order.id, true, &mut session).await?;
			pricing::recalculate(&mut order);
		}

		if let Some(method_id) = &edit.payment_method_id {
			let method = self.payment_method(method_id)?;
			order.payment_type = method.payment_type;
			order.payment_method_id = method.id;
			order.payment_method_admin_name = method.admin_name;
			order.payment_method_client_name = method.client_name;
		}

		if let Some(patch) = &edit.shipment {
			self.apply_shipment_patch(&mut order, patch, &mut session)
				.await?;
		}

		if let Some(client_note) = edit.client_note {
			order.client_note = client_note;
		}
		if let Some(admin_note) = edit.admin_note {
			order.admin_note = admin_note;
		}
		if let Some(customer_note) = edit.customer_note {
			order.customer_note = customer_note;
		}
		if let Some(is_callback_needed) = edit.is_callback_needed {
			order.is_callback_needed = is_callback_needed;
		}

		order.updated_at = Utc::now();
		self.store.update(&order, &mut session).await?;
		session.commit();

		tracing::info!(order_id = %order.id, "Order edited");
		self.after_commit(&order).await;
		Ok(order)
	}

	/// Patches shipment data of a mutable order.
	pub async fn update_shipment(
		&self,
		order_id: u64,
		patch: ShipmentPatch,
	) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;
		let mut order = self.load_order(order_id, Some(&session)).await?;

		self.apply_shipment_patch(&mut order, &patch, &mut session)
			.await?;

		order.updated_at = Utc::now();
		self.store.update(&order, &mut session).await?;
		session.commit();
		self.after_commit(&order).await;
		Ok(order)
	}

	/// Re-fetches the carrier status of one order.
	pub async fn refresh_shipment_status(&self, order_id: u64) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;
		let mut order = self.load_order(order_id, Some(&session)).await?;
		if order.shipment.tracking_number.is_empty() {
			return Ok(order);
		}

		if let Some(event) = self
			.carrier
			.fetch_status(&order.shipment.tracking_number)
			.await?
		{
			if self
				.apply_tracking_event(&mut order, &event, &mut session)
				.await?
			{
				order.updated_at = Utc::now();
				self.store.update(&order, &mut session).await?;
			}
		}
		session.commit();
		self.after_commit(&order).await;
		Ok(order)
	}

	/// Confirms or revokes payment, moving the order through the payment gate.
	pub async fn set_payment_status(
		&self,
		order_id: u64,
		paid: bool,
	) -> Result<Order, OrderError> {
		let mut session = self.store.begin().await;
		let mut order = self.load_order(order_id, Some(&session)).await?;

		if order.is_order_paid != paid {
			order.is_order_paid = paid;
			order.push_log(if paid {
				"Payment confirmed"
			} else {
				"Payment confirmation revoked"
			});
		}
		if paid && order.status == OrderStatus::Packed {
			assign_status(&mut order, OrderStatus::ReadyToShip);
		}
		if !paid
			&& order.status == OrderStatus::ReadyToShip
			&& order.payment_type != PaymentType::CashOnDelivery
		{
			assign_status(&mut order, OrderStatus::Packed);
		}

		order.updated_at = Utc::now();
		self.store.update(&order, &mut session).await?;
		session.commit();
		self.after_commit(&order).await;
		Ok(order)
	}

	/// Loads one order.
	pub async fn get_order(&self, order_id: u64) -> Result<Order, OrderError> {
		self.load_order(order_id, None).await
	}

	/// Lists orders, through the search mirror when the filter needs it.
	pub async fn list_orders(&self, filter: &OrderFilter) -> Result<Vec<Order>, OrderError> {
		if !filter.needs_search() {
			return Ok(self.store.find(filter).await?);
		}

		let mut query = SearchQuery {
			term: filter.term.clone(),
			filters: Vec::new(),
			skip: filter.skip,
			limit: filter.limit,
		};
		if let Some(status) = filter.status {
			query
				.filters
				.push(("status".to_string(), serde_json::json!(status.as_token())));
		}
		if let Some(customer_id) = filter.customer_id {
			query
				.filters
				.push(("customer_id".to_string(), serde_json::json!(customer_id)));
		}

		// No collection yet means no order was ever mirrored.
		let results = match self.search.query(ORDERS_COLLECTION, &query).await {
			Ok(results) => results,
			Err(SearchError::CollectionNotFound(_)) => return Ok(Vec::new()),
			Err(e) => return Err(e.into()),
		};
		Ok(results
			.hits
			.into_iter()
			.filter_map(|hit| serde_json::from_value(hit).ok())
			.collect())
	}

	/// Returns the cached order count, falling back to a live estimate when
	/// the cache is cold.
	pub async fn count_orders(&self) -> Result<u64, OrderError> {
		if self.count_cache_warm.load(Ordering::Acquire) {
			return Ok(self.cached_count.load(Ordering::Acquire));
		}
		self.refresh_count_cache().await
	}

	/// Refreshes the cached order count. Run by the scheduler.
	pub async fn refresh_count_cache(&self) -> Result<u64, OrderError> {
		let count = self.store.estimated_count().await?;
		self.cached_count.store(count, Ordering::Release);
		self.count_cache_warm.store(true, Ordering::Release);
		Ok(count)
	}

	/// Administrative repair of the order id sequence.
	pub async fn set_counter(&self, value: u64) -> Result<(), OrderError> {
		self.counter
			.set_value(&self.counter_collection, value)
			.await?;
		tracing::warn!(value = %value, "Order counter pinned");
		Ok(())
	}

	/// Rebuilds the search mirror from the order store.
	pub async fn reindex_search(&self) -> Result<usize, OrderError> {
		let orders = self.store.find_all().await?;
		self.search.drop_collection(ORDERS_COLLECTION).await?;
		self.search.ensure_collection(ORDERS_COLLECTION).await?;
		for order in &orders {
			let document = serde_json::to_value(order)
				.map_err(|e| OrderError::Search(orderflow_search::SearchError::Backend(e.to_string())))?;
			self.search
				.upsert_document(ORDERS_COLLECTION, order.id, document)
				.await?;
		}
		tracing::info!(orders = orders.len(), "Search mirror rebuilt");
		Ok(orders.len())
	}

	/// Applies a shipment patch; a tracking number change forces a status
	/// re-fetch through the same derived-transition path as reconciliation.
	async fn apply_shipment_patch(
		&self,
		order: &mut Order,
		patch: &ShipmentPatch,
		session: &mut Session,
	) -> Result<(), OrderError> {
		let previous_tracking = order.shipment.tracking_number.clone();
		order.shipment.apply_patch(patch);
		if let Some(recipient) = &patch.recipient {
			order.shipping_method_name = recipient
				.address_type
				.shipping_method_name()
				.to_string();
		}

		if order.shipment.tracking_number != previous_tracking
			&& !order.shipment.tracking_number.is_empty()
		{
			order.push_log(format!(
				"Tracking number changed to {}",
				order.shipment.tracking_number
			));
			if let Some(event) = self
				.carrier
				.fetch_status(&order.shipment.tracking_number)
				.await?
			{
				self.apply_tracking_event(order, &event, session).await?;
			}
		}
		Ok(())
	}

	/// Registers the carrier shipment document for a packed order.
	async fn create_shipment_document(&self, order: &mut Order) -> Result<(), OrderError> {
		let request = ShipmentRequest {
			recipient: order.shipment.recipient.clone(),
			sender: self.sender.clone(),
			payment_type: order.payment_type,
			declared_value: order
				.shipment
				.declared_value
				.unwrap_or(order.prices.total_cost),
			weight_kg: order.shipment.weight_kg.unwrap_or(DEFAULT_WEIGHT_KG),
			description: format!("Order #{}", order.id_for_customer),
		};
		let document = self.carrier.create_shipment(&request).await?;

		order.shipment.sender = Some(self.sender.clone());
		order.shipment.tracking_number = document.tracking_number;
		order.shipment.status = Some(document.status);
		order.shipment.status_description = document.status_description;
		order.shipment.estimated_delivery_date = document.estimated_delivery_date;
		order.push_log(format!(
			"Shipment {} registered with carrier",
			order.shipment.tracking_number
		));
		Ok(())
	}

	/// Releases the reservations an order holds. Orders imported without
	/// reservations are tolerated.
	async fn release_reservations(
		&self,
		order: &Order,
		session: &mut Session,
	) -> Result<(), OrderError> {
		for item in &order.items {
			match self.inventory.release(&item.sku, order.id, session).await {
				Ok(()) | Err(InventoryError::ReservationNotFound { .. }) => {},
				Err(e) => return Err(e.into()),
			}
		}
		Ok(())
	}

	/// Applies one carrier tracking event: shipment-status update plus the
	/// derived order-status transition and its side effects. Returns whether
	/// the order changed.
	pub(crate) async fn apply_tracking_event(
		&self,
		order: &mut Order,
		event: &TrackingEvent,
		session: &mut Session,
	) -> Result<bool, OrderError> {
		let mut changed = false;

		if order.shipment.status != Some(event.status) {
			order.shipment.status = Some(event.status);
			order.shipment.status_description = event.status_description.clone();
			order.push_log(format!("Shipment status changed to {}", event.status));
			changed = true;
		}

		if let Some(next) = state::derive_status_from_shipment(order) {
			self.apply_derived_effects(order, next, session).await?;
			assign_status(order, next);
			changed = true;
		}

		Ok(changed)
	}

	/// Side effects of a derived transition.
	async fn apply_derived_effects(
		&self,
		order: &mut Order,
		next: OrderStatus,
		session: &mut Session,
	) -> Result<(), OrderError> {
		match next {
			OrderStatus::Shipped => {
				// The reservation becomes a permanent sale.
				for item in &order.items {
					match self
						.inventory
						.commit_to_stock(&item.sku, item.qty, order.id, session)
						.await
					{
						Ok(()) | Err(InventoryError::ReservationNotFound { .. }) => {},
						Err(e) => return Err(e.into()),
					}
					self.inventory
						.increment_sales_count(&item.sku, item.qty, session)
						.await?;
				}
			},
			OrderStatus::Finished => {
				order.is_order_paid = true;
				self.customers
					.increment_lifetime_spend(
						order.customer_id,
						order.prices.total_cost,
						session,
					)
					.await?;
			},
			_ => {},
		}
		Ok(())
	}

	/// Best-effort post-commit effects shared by every mutating operation.
	async fn after_commit(&self, order: &Order) {
		self.mirror_order(order).await;
		if let Err(e) = self.refresh_count_cache().await {
			tracing::warn!(error = %e, "Order count cache refresh failed");
		}
	}

	/// Mirrors one order into the search index, logging failures only.
	pub(crate) async fn mirror_order(&self, order: &Order) {
		let document = match serde_json::to_value(order) {
			Ok(document) => document,
			Err(e) => {
				tracing::warn!(order_id = %order.id, error = %e, "Order not serializable for search");
				return;
			},
		};
		let result = async {
			self.search.ensure_collection(ORDERS_COLLECTION).await?;
			self.search
				.upsert_document(ORDERS_COLLECTION, order.id, document)
				.await
		}
		.await;
		if let Err(e) = result {
			tracing::warn!(order_id = %order.id, error = %e, "Search mirror update failed");
		}
	}
}

fn assign_status(order: &mut Order, status: OrderStatus) {
	order.status = status;
	order.push_log(format!("Status changed to {}", status));
}

#[cfg(test)]
mod tests;
