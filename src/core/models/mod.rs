pub mod history;
pub mod projection;
