use sea_orm::{ActiveModelTrait, ConnectionTrait, Set};
use sea_orm::ActiveValue::NotSet;
use serde_json::Value;
use uuid::Uuid;

use crate::{entity::audit_logs::ActiveModel, error::AppResult};

pub async fn log_audit<C: ConnectionTrait>(
    db: &C,
    user_id: Option<Uuid>,
    action: &str,
    resource: Option<&str>,
    metadata: Option<Value>,
) -> AppResult<()> {
    ActiveModel {
        id: Set(Uuid::new_v4()),
        user_id: Set(user_id),
        action: Set(action.to_string()),
        resource: Set(resource.map(str::to_string)),
        metadata: Set(metadata),
        created_at: NotSet,
    }
    .insert(db)
    .await?;

    Ok(())
}

/// Audit is best-effort: failures are logged and never reach the caller.
pub async fn record_user_event<C: ConnectionTrait>(db: &C, user_id: Uuid, action: &str) {
    if let Err(err) = log_audit(
        db,
        Some(user_id),
        action,
        Some("users"),
        Some(serde_json::json!({ "user_id": user_id })),
    )
    .await
    {
        tracing::warn!(error = %err, action, "audit log failed");
    }
}
