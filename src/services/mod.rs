pub mod analytics;
pub mod file_processor;
pub mod file_repository;
pub mod sheet_parser;
pub mod storage;
