pub mod ai_provider;
pub mod cli;
pub mod config;
pub mod error;
pub mod export;
pub mod oracle;
pub mod pipeline;
pub mod report;
pub mod scanner;
pub mod workbook;
