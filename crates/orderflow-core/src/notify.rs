//! Outbound notification queue.
//!
//! Workflow operations enqueue notifications after their transaction commits;
//! a background worker delivers them with exponential-backoff retries. A
//! delivery failure is logged and the notification dropped, never propagated
//! back into the order workflow.

use async_trait::async_trait;
use backoff::ExponentialBackoff;
use std::sync::Arc;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;

/// Errors that can occur during notification delivery.
#[derive(Debug, Error)]
pub enum NotifyError {
	/// The downstream channel rejected the notification.
	#[error("Delivery failed: {0}")]
	Delivery(String),
}

/// An outbound message produced by the workflow.
#[derive(Debug, Clone)]
pub enum Notification {
	/// Checkout confirmation sent to the customer.
	OrderConfirmation { order_id: u64, email: String },
	/// Deferred reminder asking the customer for a review.
	LeaveReviewReminder { order_id: u64, email: String },
	/// Alert for the shop managers.
	ManagerAlert { order_id: u64, message: String },
}

/// Trait defining the interface for notification channels.
#[async_trait]
pub trait NotifierInterface: Send + Sync {
	/// Delivers one notification.
	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError>;
}

/// Notifier that only logs deliveries. Default channel when no external
/// messaging integration is configured.
pub struct TracingNotifier;

#[async_trait]
impl NotifierInterface for TracingNotifier {
	async fn deliver(&self, notification: &Notification) -> Result<(), NotifyError> {
		match notification {
			Notification::OrderConfirmation { order_id, email } => {
				tracing::info!(order_id = %order_id, email = %email, "Order confirmation sent");
			},
			Notification::LeaveReviewReminder { order_id, email } => {
				tracing::info!(order_id = %order_id, email = %email, "Review reminder sent");
			},
			Notification::ManagerAlert { order_id, message } => {
				tracing::info!(order_id = %order_id, message = %message, "Manager alert sent");
			},
		}
		Ok(())
	}
}

/// Sending half of the notification queue held by the engine.
///
/// Enqueueing never blocks and never fails the caller: when the worker is
/// gone the notification is logged and dropped.
#[derive(Clone)]
pub struct NotificationQueue {
	sender: mpsc::UnboundedSender<Notification>,
}

impl NotificationQueue {
	/// Creates the queue and its receiving end.
	pub fn new() -> (Self, mpsc::UnboundedReceiver<Notification>) {
		let (sender, receiver) = mpsc::unbounded_channel();
		(Self { sender }, receiver)
	}

	/// Enqueues a notification for background delivery.
	pub fn enqueue(&self, notification: Notification) {
		if let Err(e) = self.sender.send(notification) {
			tracing::warn!(error = %e, "Notification worker gone, dropping notification");
		}
	}
}

/// Spawns the delivery worker.
///
/// Each notification is retried with exponential backoff starting at
/// `initial_backoff` for at most `max_attempts` tries, then dropped with a
/// warning.
pub fn spawn_worker(
	mut receiver: mpsc::UnboundedReceiver<Notification>,
	notifier: Arc<dyn NotifierInterface>,
	max_attempts: u32,
	initial_backoff: Duration,
) -> JoinHandle<()> {
	// Cap total retry time instead of counting attempts: with doubling
	// intervals, initial * 2^attempts bounds the attempt count.
	let max_elapsed = initial_backoff.saturating_mul(2u32.saturating_pow(max_attempts));
	tokio::spawn(async move {
		while let Some(notification) = receiver.recv().await {
			let policy = ExponentialBackoff {
				initial_interval: initial_backoff,
				max_elapsed_time: Some(max_elapsed),
				..ExponentialBackoff::default()
			};
			let attempt = || async {
				notifier
					.deliver(&notification)
					.await
					.map_err(backoff::Error::transient)
			};
			if let Err(e) = backoff::future::retry(policy, attempt).await {
				tracing::warn!(error = %e, ?notification, "Notification dropped after retries");
			}
		}
	})
}

#[cfg(test)]
mod tests {
	use super::*;
	use std::sync::atomic::{AtomicU32, Ordering};

	/// Notifier that fails a configured number of times before succeeding.
	struct FlakyNotifier {
		failures_left: AtomicU32,
		delivered: AtomicU32,
	}

	#[async_trait]
	impl NotifierInterface for FlakyNotifier {
		async fn deliver(&self, _notification: &Notification) -> Result<(), NotifyError> {
			if self
				.failures_left
				.fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| {
					left.checked_sub(1)
				})
				.is_ok()
			{
				return Err(NotifyError::Delivery("temporarily down".into()));
			}
			self.delivered.fetch_add(1, Ordering::SeqCst);
			Ok(())
		}
	}

	#[tokio::test]
	async fn retries_until_delivered() {
		let notifier = Arc::new(FlakyNotifier {
			failures_left: AtomicU32::new(2),
			delivered: AtomicU32::new(0),
		});
		let (queue, receiver) = NotificationQueue::new();
		let worker = spawn_worker(
			receiver,
			notifier.clone(),
			5,
			Duration::from_millis(10),
		);

		queue.enqueue(Notification::OrderConfirmation {
			order_id: 1,
			email: "anna@example.com".into(),
		});
		drop(queue);
		worker.await.unwrap();

		assert_eq!(notifier.delivered.load(Ordering::SeqCst), 1);
	}

	#[tokio::test]
	async fn enqueue_after_worker_shutdown_is_silent() {
		let (queue, receiver) = NotificationQueue::new();
		drop(receiver);
		// Must not panic or error.
		queue.enqueue(Notification::ManagerAlert {
			order_id: 1,
			message: "new order".into(),
		});
	}
}
