pub mod feature_table;
pub mod long_table;
pub mod observation;
