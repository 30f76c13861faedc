pub mod incident;
pub mod ticket;
