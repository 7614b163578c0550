pub mod prelude;

pub mod queries;
