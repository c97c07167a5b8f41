//! Harvesting and deduplicating merge
//!
//! Queries run one after another; each query's stream is drained until it
//! ends or fails, and a failure only ends that query. Records are keyed by
//! identifier with first occurrence winning, then sorted newest first.
//!
//! The harvested set is reconciled with the persisted collection under a
//! [`MergePolicy`].

use crate::services::arxiv_client::PaperSearch;
use futures::StreamExt;
use hwlit_common::record::{identifier_set, sort_newest_first};
use hwlit_common::PaperRecord;
use std::collections::HashSet;

/// Progress log interval within one query
const PROGRESS_EVERY: usize = 100;

/// Built-in topical query set
pub const DEFAULT_QUERIES: [&str; 18] = [
    r#"(GPT OR ChatGPT OR Codex OR "foundation model") AND ("hardware design")"#,
    r#"(learning OR ai) AND ("hardware design")"#,
    r#"(LLM OR "large language model") AND (ASIC OR chip OR EDA OR "electronic design automation")"#,
    r#"(learning OR ai) AND (ASIC OR chip OR EDA OR "electronic design automation")"#,
    r#"(LLM OR GPT) AND ("hardware description language" OR HDL OR Verilog OR VHDL OR Chisel OR SystemVerilog)"#,
    r#"(learning OR ai) AND ("hardware description language" OR HDL OR Verilog OR VHDL OR Chisel OR SystemVerilog)"#,
    r#"(LLM OR GPT) AND ("design space exploration" OR "design verification" OR testbench)"#,
    r#"(learning OR ai) AND ("design space exploration" OR "design verification" OR testbench)"#,
    r#"(LLM OR GPT) AND ("physical design" OR "place and route" OR "timing closure")"#,
    r#"(learning OR ai) AND ("physical design" OR "place and route" OR "timing closure")"#,
    r#"(LLM OR "generative AI") AND ("bug fixing" AND (Verilog OR VHDL))"#,
    r#"(learning OR ai) AND ("bug fixing" AND (Verilog OR VHDL))"#,
    r#"(LLM OR GPT) AND ("design automation" OR "hardware code generation" OR "HDL generation")"#,
    r#"(learning OR ai) AND ("design automation" OR "hardware code generation" OR "HDL generation")"#,
    r#"(LLM OR GPT) AND (analog)"#,
    r#"(LLM OR GPT) AND (system OR architecture)"#,
    r#"(LLM OR GPT) AND (CUDA OR GPU)"#,
    r#"(LLM OR GPT) AND (code OR software OR program)"#,
];

/// How harvested records reconcile with the persisted collection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MergePolicy {
    /// Harvested set replaces the persisted collection
    FullRebuild,
    /// Unseen records are prepended to the persisted collection
    Incremental,
}

/// Per-query harvest statistics
#[derive(Debug, Clone)]
pub struct QueryReport {
    pub query: String,
    /// Records the query yielded, duplicates included
    pub fetched: usize,
    /// Records the query contributed that no earlier result had
    pub unique: usize,
    /// Failure that ended the query early, if any
    pub error: Option<String>,
}

/// Deduplicated, newest-first harvest
#[derive(Debug, Clone)]
pub struct Harvest {
    pub records: Vec<PaperRecord>,
    pub queries: Vec<QueryReport>,
}

/// Run every query in order and merge the results
pub async fn harvest(search: &dyn PaperSearch, queries: &[String], max_results: usize) -> Harvest {
    let mut records: Vec<PaperRecord> = Vec::new();
    let mut seen: HashSet<String> = HashSet::new();
    let mut reports = Vec::with_capacity(queries.len());
    let total_queries = queries.len();

    for (i, query) in queries.iter().enumerate() {
        tracing::info!(query = %query, "Running query {}/{}", i + 1, total_queries);

        let mut report = QueryReport {
            query: query.clone(),
            fetched: 0,
            unique: 0,
            error: None,
        };

        let mut stream = search.search(query, max_results);
        while let Some(item) = stream.next().await {
            match item {
                Ok(record) => {
                    report.fetched += 1;
                    if report.fetched % PROGRESS_EVERY == 0 {
                        tracing::info!(query = %query, fetched = report.fetched, "Fetched results so far");
                    }
                    if seen.insert(record.identifier.clone()) {
                        report.unique += 1;
                        records.push(record);
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        query = %query,
                        fetched = report.fetched,
                        error = %e,
                        "Query failed, keeping results fetched so far"
                    );
                    report.error = Some(e.to_string());
                    break;
                }
            }
        }

        if report.error.is_none() {
            tracing::info!(query = %query, fetched = report.fetched, unique = report.unique, "Query finished");
        }
        reports.push(report);
    }

    sort_newest_first(&mut records);
    tracing::info!(unique = records.len(), "Total unique papers fetched");

    Harvest {
        records,
        queries: reports,
    }
}

/// Result of reconciling a harvest with persisted state
#[derive(Debug, Clone, PartialEq)]
pub enum MergeOutcome {
    /// Collection to persist, with the number of records not previously known
    Changed { records: Vec<PaperRecord>, added: usize },
    /// Nothing new; the persisted file must not be rewritten
    Unchanged,
}

/// Reconcile `harvested` (already deduplicated, newest first) with `persisted`
pub fn merge(harvested: Vec<PaperRecord>, persisted: Vec<PaperRecord>, policy: MergePolicy) -> MergeOutcome {
    match policy {
        MergePolicy::FullRebuild => {
            let added = {
                let known = identifier_set(&persisted);
                harvested
                    .iter()
                    .filter(|r| !known.contains(r.identifier.as_str()))
                    .count()
            };
            MergeOutcome::Changed {
                records: harvested,
                added,
            }
        }
        MergePolicy::Incremental => {
            let mut merged: Vec<PaperRecord> = {
                let known = identifier_set(&persisted);
                harvested
                    .into_iter()
                    .filter(|r| !known.contains(r.identifier.as_str()))
                    .collect()
            };

            let added = merged.len();
            if added == 0 {
                return MergeOutcome::Unchanged;
            }

            merged.extend(persisted);
            MergeOutcome::Changed {
                records: merged,
                added,
            }
        }
    }
}
