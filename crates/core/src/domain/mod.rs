pub mod invoice;
pub mod lenient;
pub mod submission;
