//! The article selection pipeline, leaf stages first.
//!
//! quality → recency → sources run inline per candidate inside `aggregate`;
//! `capper` trims before scoring; `ranker` orders and diversity-trims;
//! `assembler` regroups the final set. `selector` wires them together.

pub mod aggregate;
pub mod article;
pub mod assembler;
pub mod capper;
pub mod quality;
pub mod ranker;
pub mod recency;
pub mod selector;
pub mod sources;
pub mod stats;
