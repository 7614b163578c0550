pub use super::queries::Entity as Queries;
