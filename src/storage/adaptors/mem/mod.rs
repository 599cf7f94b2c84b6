mod mem_database;

pub use mem_database::*;
