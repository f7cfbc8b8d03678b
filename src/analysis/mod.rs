//! Unit algebra shared by the parser and quantity arithmetic.
pub mod units;
