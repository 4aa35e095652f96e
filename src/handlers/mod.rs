pub mod admin;
pub mod health;
pub mod payments;
pub mod paystack_webhook;
pub mod wallet;
