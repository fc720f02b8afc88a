use serde::Serialize;
use utoipa::ToSchema;

use crate::models::Transaction;

#[derive(Debug, Serialize, ToSchema)]
#[serde(transparent)]
pub struct TransactionList {
    #[schema(value_type = Vec<Transaction>)]
    pub items: Vec<Transaction>,
}
