//! Product Sorter Common Library
//!
//! 商品行のカテゴリ判定・振り分けの中核ロジック

pub mod types;
pub mod category;
pub mod classifier;
pub mod error;
pub mod oracle;
pub mod parser;
pub mod partition;
pub mod processor;
pub mod export;

pub use types::{
    CategoryCount, CellValue, Classification, ColumnRoster, ConfidenceTier, ForcedAssignment,
    MatchOrigin, Row, RunStats, Table,
};
pub use category::{Category, CategoryTable};
pub use classifier::{find_candidate_columns, normalize_text, roster_for_selection, Classifier};
pub use error::{Error, Result};
pub use oracle::{build_oracle_prompt, NoopOracle, Oracle};
pub use parser::{extract_json, parse_oracle_answer};
pub use partition::{partition, CategoryTableOutput, Partition};
pub use processor::{
    apply_fallback, build_stats, classify_table, consult_oracle, process_table, row_text,
    ProcessOutcome,
};
