pub mod commission;
pub mod general;
pub mod performance;
pub mod period;
pub mod tax_bracket;
