pub mod payroll;
pub mod performance;
pub mod settlement;
