pub mod entitlement_repository;
pub mod intent_repository;
pub mod ledger_repository;
pub mod reconciliation_repository;
pub mod wallet_repository;
