use super::*;

// ========================================================================
//  边界 / 权限 / 异常路径
// ========================================================================

#[test]
fn test_insufficient_stock_is_all_or_nothing() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    h.seed_product("B", 50, 1);

    let err = h
        .manager
        .create_order(
            Some(&customer()),
            order_input(vec![line("A", 2), line("B", 2)]),
        )
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::ProductOutOfStock);
    assert_eq!(h.stock("A"), 5);
    assert_eq!(h.stock("B"), 1);
    assert_eq!(h.storage().order_count().unwrap(), 0);
}

#[test]
fn test_create_validation_errors() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);

    let err = h
        .manager
        .create_order(Some(&customer()), order_input(vec![]))
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderEmpty);
    assert_eq!(err.kind(), ErrorKind::Validation);

    let err = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 0)]))
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Validation);

    // guest without contact info
    let err = h
        .manager
        .create_order(None, order_input(vec![line("A", 1)]))
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::GuestInfoRequired);

    let err = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("missing", 1)]))
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::ProductNotFound);
    assert_eq!(h.stock("A"), 5);
}

#[test]
fn test_idempotency_token_from_other_caller_rejected() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let mut input = order_input(vec![line("A", 1)]);
    input.idempotency_token = Some("shared".to_string());

    h.manager
        .create_order(Some(&customer()), input.clone())
        .unwrap();
    let err = h
        .manager
        .create_order(Some(&CurrentUser::customer("user-2")), input)
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::IdempotencyTokenInvalid);
    assert_eq!(h.stock("A"), 4);
}

#[test]
fn test_double_cancel_restores_once() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 2)]))
        .unwrap();

    h.manager
        .set_order_status(&order.id, "cancelled", None, &admin())
        .unwrap();
    // writing the same terminal status again is a no-op transition
    h.manager
        .set_order_status(&order.id, "cancelled", None, &admin())
        .unwrap();
    assert_eq!(h.stock("A"), 5);
}

#[test]
fn test_cancel_shipped_rejected() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 2)]))
        .unwrap();
    h.manager
        .set_order_status(&order.id, "shipped", None, &admin())
        .unwrap();

    let err = h
        .manager
        .set_order_status(&order.id, "cancelled", None, &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderIllegalTransition);
    assert_eq!(h.stock("A"), 3);

    // shipped → approved is allowed
    let back = h
        .manager
        .set_order_status(&order.id, "approved", None, &admin())
        .unwrap();
    assert_eq!(back.status, OrderStatus::Approved);
}

#[test]
fn test_unknown_status_rejected() {
    let h = Harness::new();
    let err = h
        .manager
        .set_order_status("whatever", "refunded", None, &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderInvalidStatus);
}

#[test]
fn test_payment_on_cancelled_order_rejected() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();
    h.manager
        .set_order_status(&order.id, "cancelled", None, &admin())
        .unwrap();

    let err = h
        .manager
        .add_payment(&order.id, dec(10), None, &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderAlreadyCancelled);
}

#[test]
fn test_invalid_payment_amounts() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();

    for amount in [Decimal::ZERO, dec(-5)] {
        let err = h
            .manager
            .add_payment(&order.id, amount, None, &admin())
            .unwrap_err();
        assert_eq!(code_of(&err), ErrorCode::PaymentInvalidAmount);
    }
}

#[test]
fn test_admin_only_operations() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();
    let user = customer();

    let err = h
        .manager
        .set_order_status(&order.id, "approved", None, &user)
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::AdminRequired);
    assert_eq!(err.kind(), ErrorKind::Authorization);

    assert!(h.manager.add_payment(&order.id, dec(1), None, &user).is_err());
    assert!(h.manager.list_orders(&user, None).is_err());
    assert!(h.manager.list_audit_events(&order.id, &user).is_err());
    assert!(h.manager.list_notification_failures(&user).is_err());

    let stored = h.storage().get_order(&order.id).unwrap().unwrap();
    assert_eq!(stored.status, OrderStatus::Pending);
    assert!(stored.payments.is_empty());
}

#[test]
fn test_ownership_isolation() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();
    let other = CurrentUser::customer("user-2");

    // 非所有者看不到订单
    let err = h.manager.fetch_order(&order.id, &other).unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderNotFound);
    assert!(h.manager.fetch_order(&order.id, &customer()).is_ok());
    assert!(h.manager.fetch_order(&order.id, &admin()).is_ok());

    let err = h
        .manager
        .upload_proof(&order.id, upload("u"), &other)
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::OrderNotFound);

    let err = h
        .manager
        .list_orders_for_owner("user-1", &other)
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::PermissionDenied);
    assert!(h.manager.list_orders_for_owner("user-2", &other).unwrap().is_empty());
    assert_eq!(
        h.manager.list_orders_for_owner("user-1", &admin()).unwrap().len(),
        1
    );
}

#[test]
fn test_proof_credit_failure_reverts_review() {
    let mut h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();
    let proof = h
        .manager
        .upload_proof(&order.id, upload("u"), &customer())
        .unwrap();
    h.flush_audit();
    h.drain_notifications();

    // credit exceeds the 100 balance
    let err = h
        .manager
        .review_proof(&order.id, &proof.id, ProofDecision::Approved, Some(dec(150)), &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::PaymentExceedsBalance);

    let stored = h.storage().get_order(&order.id).unwrap().unwrap();
    let p = stored.find_proof(&proof.id).unwrap();
    assert_eq!(p.status, ProofStatus::PendingReview);
    assert!(p.reviewed_by.is_none());
    assert!(stored.payments.is_empty());

    // audit keeps both the review and its revert; no notification goes out
    h.flush_audit();
    let trail = h.manager.list_audit_events(&order.id, &admin()).unwrap();
    let actions: Vec<_> = trail.events.iter().map(|e| e.action).collect();
    assert_eq!(
        &actions[actions.len() - 2..],
        &[AuditAction::ProofReviewed, AuditAction::ProofReviewReverted]
    );
    assert!(h.drain_notifications().is_empty());

    // proof can be reviewed again with a valid amount
    let order = h
        .manager
        .review_proof(&order.id, &proof.id, ProofDecision::Approved, Some(dec(100)), &admin())
        .unwrap();
    assert_eq!(order.payment_status, PaymentStatus::Paid);
}

#[test]
fn test_negative_credit_rejected_before_review() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
        .unwrap();
    let proof = h
        .manager
        .upload_proof(&order.id, upload("u"), &customer())
        .unwrap();

    let err = h
        .manager
        .review_proof(&order.id, &proof.id, ProofDecision::Rejected, Some(dec(-1)), &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::PaymentInvalidAmount);
    let stored = h.storage().get_order(&order.id).unwrap().unwrap();
    assert_eq!(
        stored.find_proof(&proof.id).unwrap().status,
        ProofStatus::PendingReview
    );
}

#[test]
fn test_claim_requires_verified_matching_email() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    h.manager
        .create_order(None, guest_input(vec![line("A", 1)], "ann@example.com"))
        .unwrap();

    let unverified = CurrentUser::customer("ann-uid");
    let err = h
        .manager
        .claim_guest_orders(&unverified, "ann@example.com")
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::EmailNotVerified);

    let mallory = CurrentUser::customer("m").with_verified_email("mallory@example.com");
    let err = h
        .manager
        .claim_guest_orders(&mallory, "ann@example.com")
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::EmailMismatch);

    // nothing moved
    assert_eq!(
        h.storage()
            .get_guest_order_ids_by_email("ann@example.com")
            .unwrap()
            .len(),
        1
    );
}

#[test]
fn test_full_notification_queue_does_not_fail_command() {
    let h = Harness::with_capacity(1);
    h.seed_product("A", 10, 10);

    for _ in 0..3 {
        h.manager
            .create_order(Some(&customer()), order_input(vec![line("A", 1)]))
            .unwrap();
    }
    assert_eq!(h.storage().order_count().unwrap(), 3);
    assert_eq!(h.stock("A"), 7);

    let failures = h.manager.list_notification_failures(&admin()).unwrap();
    assert_eq!(failures.len(), 2);
    assert!(failures.iter().all(|f| f.stage == crate::notify::FailureStage::Enqueue));
    assert_eq!(failures[0].error, "queue full");
}

#[test]
fn test_stock_conservation_after_mixed_operations() {
    let h = Harness::new();
    h.seed_product("A", 10, 20);
    let mut ids = Vec::new();
    for qty in [3, 4, 5] {
        ids.push(
            h.manager
                .create_order(Some(&customer()), order_input(vec![line("A", qty)]))
                .unwrap()
                .id,
        );
    }
    h.manager
        .set_order_status(&ids[1], "cancelled", None, &admin())
        .unwrap();

    // stock + active reservations == initial stock
    let reserved: i64 = h
        .storage()
        .get_all_orders()
        .unwrap()
        .iter()
        .filter(|o| o.status != OrderStatus::Cancelled)
        .flat_map(|o| o.items.iter())
        .map(|i| i.quantity as i64)
        .sum();
    assert_eq!(h.stock("A") + reserved, 20);
}

#[test]
fn test_upsert_product_rules() {
    let h = Harness::new();
    let product = Product::new("P", "Lamp", dec(25), 4);

    let err = h
        .manager
        .upsert_product(product.clone(), &customer())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::AdminRequired);

    let err = h
        .manager
        .upsert_product(Product::new("P", "Lamp", dec(-1), 4), &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::ProductInvalidPrice);

    let err = h
        .manager
        .upsert_product(Product::new("P", "Lamp", dec(1), -4), &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::ValueOutOfRange);

    let err = h
        .manager
        .upsert_product(Product::new("P", "Lamp", Decimal::new(10005, 3), 4), &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::ProductInvalidPrice);

    h.manager.upsert_product(product, &admin()).unwrap();
    assert_eq!(h.stock("P"), 4);
    // free items are allowed
    h.manager
        .upsert_product(Product::new("F", "Sticker", Decimal::ZERO, 4), &admin())
        .unwrap();
}

// 零价订单: total=0 即已付清
#[test]
fn test_zero_total_order_is_consistent() {
    let h = Harness::new();
    h.manager
        .upsert_product(Product::new("Z", "Freebie", Decimal::ZERO, 5), &admin())
        .unwrap();

    let order = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("Z", 1)]))
        .unwrap();
    assert_eq!(order.total, Decimal::ZERO);
    assert_eq!(order.balance, Decimal::ZERO);
    assert_eq!(order.payment_status, PaymentStatus::Paid);
    assert!(order.money_is_consistent());
    assert_eq!(h.stock("Z"), 4);

    // nothing left to pay
    let err = h
        .manager
        .add_payment(&order.id, dec(1), None, &admin())
        .unwrap_err();
    assert_eq!(code_of(&err), ErrorCode::PaymentExceedsBalance);
}

// 外部目录写入的分以下价格: 快照取整后余额可以被精确付清
#[test]
fn test_sub_cent_catalog_price_can_be_paid_off() {
    let h = Harness::new();
    h.storage()
        .upsert_product(&Product::new("S", "Screw", Decimal::new(10005, 3), 5))
        .unwrap();

    let whole = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("S", 1)]))
        .unwrap();
    assert_eq!(whole.total, Decimal::new(1001, 2));
    assert!(whole.money_is_consistent());
    let paid = h
        .manager
        .add_payment(&whole.id, whole.total, None, &admin())
        .unwrap();
    assert_eq!(paid.balance, Decimal::ZERO);
    assert_eq!(paid.payment_status, PaymentStatus::Paid);
    assert_eq!(paid.status, OrderStatus::Approved);

    let split = h
        .manager
        .create_order(Some(&customer()), order_input(vec![line("S", 1)]))
        .unwrap();
    let partial = h
        .manager
        .add_payment(&split.id, dec(10), None, &admin())
        .unwrap();
    assert_eq!(partial.balance, Decimal::new(1, 2));
    assert_eq!(partial.payment_status, PaymentStatus::Partial);
    let done = h
        .manager
        .add_payment(&split.id, partial.balance, None, &admin())
        .unwrap();
    assert_eq!(done.payment_status, PaymentStatus::Paid);
    assert!(done.money_is_consistent());
}

#[test]
fn test_claim_email_compared_after_normalization() {
    let h = Harness::new();
    h.seed_product("A", 100, 5);
    h.manager
        .create_order(None, guest_input(vec![line("A", 1)], "ann@example.com"))
        .unwrap();

    let ann = CurrentUser::customer("ann-uid").with_verified_email("ann@example.com");
    assert_eq!(
        h.manager
            .claim_guest_orders(&ann, " Ann@Example.COM")
            .unwrap(),
        1
    );
}
