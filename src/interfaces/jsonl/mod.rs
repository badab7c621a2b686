pub mod batch;
pub mod request_reader;
