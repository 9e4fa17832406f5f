use crate::{Order, OrderStatus};

/// Outbound notifications (email, push) about ledger events.
///
/// Called after the unit of work has committed. Implementations must not
/// block and must swallow their own failures.
pub trait Notifier: Send + Sync {
    fn order_status_changed(&self, order: &Order, status: OrderStatus);

    fn deposit_succeeded(&self, user_id: &str, amount: i64, reference: &str);

    fn withdrawal_settled(&self, user_id: &str, amount: i64, reference: &str, success: bool);
}

/// Writes every notification as a tracing event.
#[derive(Clone, Copy, Debug, Default)]
pub struct LogNotifier;

impl Notifier for LogNotifier {
    fn order_status_changed(&self, order: &Order, status: OrderStatus) {
        tracing::info!(
            order_id = %order.id,
            buyer_id = %order.buyer_id,
            seller_id = %order.seller_id,
            status = status.as_str(),
            "order status changed"
        );
    }

    fn deposit_succeeded(&self, user_id: &str, amount: i64, reference: &str) {
        tracing::info!(user_id, amount, reference, "deposit succeeded");
    }

    fn withdrawal_settled(&self, user_id: &str, amount: i64, reference: &str, success: bool) {
        tracing::info!(user_id, amount, reference, success, "withdrawal settled");
    }
}
