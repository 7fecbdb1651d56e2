//! Ledger repositories
//!
//! One repository per domain. The payment repository owns the escrow state
//! machine; the others are straightforward record stores.

mod addresses;
mod currencies;
mod payments;
mod users;

pub use addresses::AddressRepo;
pub use currencies::CurrencyRepo;
pub use payments::PaymentRepo;
pub use users::UserRepo;
