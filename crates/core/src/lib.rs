pub mod money;
pub mod normalize;
pub mod transaction;

pub use money::Money;
pub use normalize::{normalize_text, normalize_vendor, STOP_TOKENS};
pub use transaction::{BankTransaction, InternalTransaction, LedgerSource, MatchRecord, MatchType};
