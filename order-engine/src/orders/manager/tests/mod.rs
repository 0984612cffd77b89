use super::*;
use crate::audit::AuditLogRequest;
use crate::notify::NotificationRequest;
use shared::models::Product;
use shared::order::{GuestInfo, OrderLineInput, PaymentStatus};
use tokio::sync::mpsc;

mod test_boundary;

/// Manager plus the receiving ends of its side channels
///
/// Receivers are kept alive so dispatch succeeds; tests drain them by hand.
struct Harness {
    manager: OrdersManager,
    audit_rx: mpsc::Receiver<AuditLogRequest>,
    notify_rx: mpsc::Receiver<NotificationRequest>,
}

impl Harness {
    fn new() -> Self {
        Self::with_capacity(256)
    }

    fn with_capacity(notify_capacity: usize) -> Self {
        let storage = OrderStorage::open_in_memory().unwrap();
        let (audit, audit_rx) = AuditService::new(256);
        let (notifier, notify_rx) = NotificationDispatcher::new(storage.clone(), notify_capacity);
        Self {
            manager: OrdersManager::new(storage, audit, notifier),
            audit_rx,
            notify_rx,
        }
    }

    fn storage(&self) -> &OrderStorage {
        self.manager.storage()
    }

    fn seed_product(&self, id: &str, price: i64, stock: i64) {
        self.storage()
            .upsert_product(&Product::new(id, format!("Product {}", id), Decimal::from(price), stock))
            .unwrap();
    }

    fn stock(&self, id: &str) -> i64 {
        self.storage().get_product(id).unwrap().unwrap().stock
    }

    /// Write queued audit requests the way the worker would
    fn flush_audit(&mut self) -> usize {
        let mut n = 0;
        while let Ok(req) = self.audit_rx.try_recv() {
            self.manager
                .storage()
                .append_audit_event(
                    &req.order_id,
                    req.action,
                    req.actor_id.as_deref(),
                    req.timestamp,
                    req.details,
                )
                .unwrap();
            n += 1;
        }
        n
    }

    fn drain_notifications(&mut self) -> Vec<NotificationRequest> {
        let mut out = Vec::new();
        while let Ok(req) = self.notify_rx.try_recv() {
            out.push(req);
        }
        out
    }
}

fn line(product_id: &str, quantity: i32) -> OrderLineInput {
    OrderLineInput {
        product_id: product_id.to_string(),
        quantity,
    }
}

fn order_input(items: Vec<OrderLineInput>) -> CreateOrderInput {
    CreateOrderInput {
        items,
        guest_info: None,
        idempotency_token: None,
    }
}

fn guest_input(items: Vec<OrderLineInput>, email: &str) -> CreateOrderInput {
    CreateOrderInput {
        items,
        guest_info: Some(GuestInfo {
            name: "Guest".to_string(),
            email: email.to_string(),
            phone: None,
            address: None,
        }),
        idempotency_token: None,
    }
}

fn customer() -> CurrentUser {
    CurrentUser::customer("user-1")
}

fn admin() -> CurrentUser {
    CurrentUser::admin("admin-1")
}

fn upload(url: &str) -> UploadProofInput {
    UploadProofInput {
        url: url.to_string(),
        proof_type: "image/png".to_string(),
    }
}

fn dec(v: i64) -> Decimal {
    Decimal::from(v)
}

fn code_of(err: &ManagerError) -> ErrorCode {
    err.error_code()
}
