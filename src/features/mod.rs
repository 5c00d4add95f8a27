pub mod cyclical;
pub mod error;
pub mod filtering;
pub mod pipeline;
pub mod spatial;
pub mod temporal;
