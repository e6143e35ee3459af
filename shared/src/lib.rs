// Shared library untuk semua MERCATO services
pub mod models;
pub mod utils;
