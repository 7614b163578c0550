pub mod case_page;

pub use case_page::extract_case_details;
