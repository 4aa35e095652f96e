pub mod entitlement_service;
pub mod intent_service;
pub mod ledger_service;
pub mod reconciliation_service;
pub mod refund_service;
pub mod settlement_service;
pub mod wallet_service;
