pub mod bank_store;
pub mod durable;
pub mod paper_store;
pub mod token_store;

pub use bank_store::BankStore;
pub use durable::{DurableStore, InMemoryDurableStore};
pub use paper_store::PaperStore;
pub use token_store::{TokenRecord, TokenStore};
