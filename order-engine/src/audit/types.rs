//! 审计日志类型定义
//!
//! 每个订单一条独立的 SHA256 哈希链，条目只追加、不修改。

use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

/// `prev_hash` of the first event of every order chain
pub const GENESIS_HASH: &str = "genesis";

/// 审计操作类型（枚举，非自由文本）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// 订单创建
    OrderCreated,
    /// 订单状态变更（含取消）
    OrderStatusChanged,
    /// 添加支付
    OrderPaymentAdded,
    /// 上传支付凭证
    ProofUploaded,
    /// 审核支付凭证
    ProofReviewed,
    /// 审核回滚（入账失败后的补偿）
    ProofReviewReverted,
    /// 游客订单被认领
    OrderClaimed,
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{:?}", self)
    }
}

/// 审计日志条目（不可变）
///
/// - `prev_hash`: 同一订单前一条记录的哈希（首条为 [`GENESIS_HASH`]）
/// - `curr_hash`: 当前记录的哈希（包含 prev_hash + 所有字段）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderAuditEvent {
    pub order_id: String,
    /// 订单内递增序列号（从 1 开始）
    pub seq: u64,
    pub action: AuditAction,
    /// 操作人 ID（系统事件为 None）
    pub actor_id: Option<String>,
    /// Unix 毫秒
    pub timestamp: i64,
    /// 结构化详情
    pub details: serde_json::Value,
    pub prev_hash: String,
    pub curr_hash: String,
}

/// 审计链验证结果
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AuditChainVerification {
    pub order_id: String,
    pub total_entries: u64,
    pub chain_intact: bool,
    /// 第一个断裂点的序列号
    #[serde(skip_serializing_if = "Option::is_none")]
    pub first_break: Option<u64>,
}

/// Audit trail of one order plus its verification
#[derive(Debug, Clone, Serialize)]
pub struct AuditTrail {
    pub events: Vec<OrderAuditEvent>,
    pub verification: AuditChainVerification,
}

/// 计算审计条目哈希
///
/// 变长字段以 `\x00` 分隔，定长字段按小端字节写入。
pub fn compute_audit_hash(
    prev_hash: &str,
    order_id: &str,
    seq: u64,
    timestamp: i64,
    action: AuditAction,
    actor_id: Option<&str>,
    details: &serde_json::Value,
) -> String {
    let mut hasher = Sha256::new();

    // 链接前一条哈希
    hasher.update(prev_hash.as_bytes());
    hasher.update(b"\x00");

    hasher.update(order_id.as_bytes());
    hasher.update(b"\x00");

    // 定长字段
    hasher.update(seq.to_le_bytes());
    hasher.update(timestamp.to_le_bytes());

    // action: serde snake_case
    let action_str = serde_json::to_string(&action).unwrap_or_default();
    hasher.update(action_str.as_bytes());
    hasher.update(b"\x00");

    hash_optional(&mut hasher, actor_id);

    // serde_json::Map 按键排序，序列化结果稳定
    let details_json = serde_json::to_string(details).unwrap_or_default();
    hasher.update(details_json.as_bytes());
    hasher.update(b"\x00");

    hex::encode(hasher.finalize())
}

/// Optional 字段哈希：`\x00` = None, `\x01` + bytes + `\x00` = Some
fn hash_optional(hasher: &mut Sha256, value: Option<&str>) {
    match value {
        Some(v) => {
            hasher.update(b"\x01");
            hasher.update(v.as_bytes());
        }
        None => {
            hasher.update(b"\x00");
        }
    }
    hasher.update(b"\x00");
}

/// Re-hash an order's events and check every link
pub fn verify_chain(order_id: &str, events: &[OrderAuditEvent]) -> AuditChainVerification {
    let mut expected_prev = GENESIS_HASH.to_string();
    let mut first_break = None;

    for event in events {
        let recomputed = compute_audit_hash(
            &event.prev_hash,
            &event.order_id,
            event.seq,
            event.timestamp,
            event.action,
            event.actor_id.as_deref(),
            &event.details,
        );
        if event.prev_hash != expected_prev || recomputed != event.curr_hash {
            first_break = Some(event.seq);
            break;
        }
        expected_prev = event.curr_hash.clone();
    }

    AuditChainVerification {
        order_id: order_id.to_string(),
        total_entries: events.len() as u64,
        chain_intact: first_break.is_none(),
        first_break,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn chain(n: u64) -> Vec<OrderAuditEvent> {
        let mut prev = GENESIS_HASH.to_string();
        (1..=n)
            .map(|seq| {
                let details = serde_json::json!({ "seq": seq });
                let curr = compute_audit_hash(
                    &prev,
                    "order-1",
                    seq,
                    seq as i64,
                    AuditAction::OrderStatusChanged,
                    Some("admin-1"),
                    &details,
                );
                let event = OrderAuditEvent {
                    order_id: "order-1".to_string(),
                    seq,
                    action: AuditAction::OrderStatusChanged,
                    actor_id: Some("admin-1".to_string()),
                    timestamp: seq as i64,
                    details,
                    prev_hash: prev.clone(),
                    curr_hash: curr.clone(),
                };
                prev = curr;
                event
            })
            .collect()
    }

    #[test]
    fn test_hash_distinguishes_none_from_empty_actor() {
        let details = serde_json::json!({});
        let a = compute_audit_hash("p", "o", 1, 1, AuditAction::OrderCreated, None, &details);
        let b = compute_audit_hash("p", "o", 1, 1, AuditAction::OrderCreated, Some(""), &details);
        assert_ne!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn test_intact_chain_verifies() {
        let events = chain(4);
        let result = verify_chain("order-1", &events);
        assert!(result.chain_intact);
        assert_eq!(result.total_entries, 4);
        assert_eq!(result.first_break, None);
    }

    #[test]
    fn test_tampered_details_break_the_chain() {
        let mut events = chain(3);
        events[1].details = serde_json::json!({ "seq": 99 });
        let result = verify_chain("order-1", &events);
        assert!(!result.chain_intact);
        assert_eq!(result.first_break, Some(2));
    }

    #[test]
    fn test_empty_chain_is_intact() {
        let result = verify_chain("order-1", &[]);
        assert!(result.chain_intact);
        assert_eq!(result.total_entries, 0);
    }
}
