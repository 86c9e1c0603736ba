pub mod amortization;
pub mod calculator;
pub mod exit;
pub mod inputs;
pub mod projection;
pub mod structure;
