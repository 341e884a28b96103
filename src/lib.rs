//! Capital gains, dividend and interest tax figures for Polish PIT-38 filings,
//! computed from brokerage account exports with FIFO lot matching and NBP
//! exchange rates.

pub mod account;
pub mod cashflow;
pub mod cmd;
pub mod ledger;
pub mod rates;
pub mod report;
pub mod warnings;

pub use account::Account;
