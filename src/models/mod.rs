pub mod assignment;
pub mod invoice;
pub mod message;
pub mod question;
pub mod school;
pub mod submission;
pub mod subject;
pub mod test;
pub mod user;
