//! The bookstore query script: a fixed, ordered list of steps run against one
//! collection handle. The first failing step aborts the rest.

use crate::client::{Client, CollectionRef};
use crate::config::AppConfig;
use crate::errors::DbError;
use crate::import::ImportOptions;
use crate::index::IndexModel;
use crate::query::{FindOptions, SortSpec};
use crate::utils::num::elapsed_ms;
use bson::{Bson, Document as BsonDocument, doc};
use serde::{Deserialize, Serialize};
use std::io::Write;

const QUERIES_TARGET: &str = "plp_bookstore::queries";

/// Literal parameters of the script. Overridable from the `[queries]` config table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct QuerySettings {
    pub genre: String,
    pub published_after: i32,
    pub author: String,
    pub update_title: String,
    pub new_price: i64,
    pub delete_title: String,
    pub recent_after: i32,
    pub page_size: usize,
    /// 1-based.
    pub page: usize,
    pub explain_title: String,
}

impl Default for QuerySettings {
    fn default() -> Self {
        Self {
            genre: "Adventure".into(),
            published_after: 1920,
            author: "George Orwell".into(),
            update_title: "The Great Gatsby".into(),
            new_price: 500,
            delete_title: "1984".into(),
            recent_after: 2010,
            page_size: 5,
            page: 1,
            explain_title: "The Great Gatsby".into(),
        }
    }
}

impl QuerySettings {
    #[must_use]
    pub fn skip(&self) -> usize {
        self.page.saturating_sub(1).saturating_mul(self.page_size)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    BooksInGenre,
    BooksPublishedAfter,
    BooksByAuthor,
    UpdatePrice,
    DeleteByTitle,
    InStockRecentAscending,
    InStockRecentDescending,
    AveragePriceByGenre,
    BooksPerAuthor,
    BooksByDecade,
    CreateTitleIndex,
    CreateAuthorYearIndex,
    ExplainTitleQuery,
}

impl Step {
    pub const ALL: [Step; 13] = [
        Step::BooksInGenre,
        Step::BooksPublishedAfter,
        Step::BooksByAuthor,
        Step::UpdatePrice,
        Step::DeleteByTitle,
        Step::InStockRecentAscending,
        Step::InStockRecentDescending,
        Step::AveragePriceByGenre,
        Step::BooksPerAuthor,
        Step::BooksByDecade,
        Step::CreateTitleIndex,
        Step::CreateAuthorYearIndex,
        Step::ExplainTitleQuery,
    ];

    #[must_use]
    pub fn label(self, s: &QuerySettings) -> String {
        match self {
            Step::BooksInGenre => format!("{} Books:", s.genre),
            Step::BooksPublishedAfter => format!("Books After {}:", s.published_after),
            Step::BooksByAuthor => format!("Books by {}:", s.author),
            Step::UpdatePrice => format!("Updated price of {}.", s.update_title),
            Step::DeleteByTitle => format!("Deleted book titled {}.", s.delete_title),
            Step::InStockRecentAscending => "Filtered Books Ascending:".into(),
            Step::InStockRecentDescending => "Filtered Books Descending:".into(),
            Step::AveragePriceByGenre => "Average Price by Genre:".into(),
            Step::BooksPerAuthor => "Books per Author:".into(),
            Step::BooksByDecade => "Books by Decade:".into(),
            Step::CreateTitleIndex => "Index created on title".into(),
            Step::CreateAuthorYearIndex => {
                "Compound index created on author and published_year".into()
            }
            Step::ExplainTitleQuery => "Explain Result:".into(),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum StepOutput {
    Documents(Vec<BsonDocument>),
    Status(String),
    Stats(BsonDocument),
}

#[derive(Debug, Clone, PartialEq)]
pub struct StepResult {
    pub step: Step,
    pub label: String,
    pub output: StepOutput,
}

/// Steps that completed, in order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RunReport {
    pub steps: Vec<StepResult>,
}

impl RunReport {
    #[must_use]
    pub fn get(&self, step: Step) -> Option<&StepOutput> {
        self.steps.iter().find(|r| r.step == step).map(|r| &r.output)
    }
}

pub struct QueryRunner<'a> {
    books: &'a CollectionRef,
    settings: QuerySettings,
}

impl<'a> QueryRunner<'a> {
    #[must_use]
    pub fn new(books: &'a CollectionRef, settings: QuerySettings) -> Self {
        Self { books, settings }
    }

    #[must_use]
    pub fn settings(&self) -> &QuerySettings {
        &self.settings
    }

    /// Runs every step in order, printing each result to `out`.
    ///
    /// # Errors
    /// Returns the first step error; later steps do not run.
    pub fn run<W: Write>(&self, out: &mut W) -> Result<RunReport, DbError> {
        self.run_steps(&Step::ALL, out)
    }

    /// # Errors
    /// Returns the first step error; later steps do not run.
    pub fn run_steps<W: Write>(&self, steps: &[Step], out: &mut W) -> Result<RunReport, DbError> {
        let mut report = RunReport::default();
        for &step in steps {
            let result = self.run_step(step).inspect_err(|e| {
                log::error!(target: QUERIES_TARGET, "step {step:?} failed: {e}");
            })?;
            print_step(out, &result)?;
            report.steps.push(result);
        }
        Ok(report)
    }

    /// # Errors
    /// Returns the store error for this step.
    pub fn run_step(&self, step: Step) -> Result<StepResult, DbError> {
        let start = std::time::Instant::now();
        let s = &self.settings;
        let output = match step {
            Step::BooksInGenre => self.find_all(doc! {"genre": s.genre.clone()})?,
            Step::BooksPublishedAfter => {
                self.find_all(doc! {"published_year": {"$gt": s.published_after}})?
            }
            Step::BooksByAuthor => self.find_all(doc! {"author": s.author.clone()})?,
            Step::UpdatePrice => {
                let price = i32::try_from(s.new_price).map_or(Bson::Int64(s.new_price), Bson::Int32);
                let r = self.books.update_one(
                    &doc! {"title": s.update_title.clone()},
                    &doc! {"$set": {"price": price}},
                )?;
                StepOutput::Status(format!("matched {}, modified {}", r.matched, r.modified))
            }
            Step::DeleteByTitle => {
                let r = self.books.delete_one(&doc! {"title": s.delete_title.clone()})?;
                StepOutput::Status(format!("deleted {}", r.deleted))
            }
            Step::InStockRecentAscending => self.in_stock_recent_page(SortSpec::asc("price"))?,
            Step::InStockRecentDescending => self.in_stock_recent_page(SortSpec::desc("price"))?,
            Step::AveragePriceByGenre => StepOutput::Documents(self.books.aggregate(&[
                doc! {"$group": {"_id": "$genre", "averagePrice": {"$avg": "$price"}}},
            ])?),
            Step::BooksPerAuthor => StepOutput::Documents(self.books.aggregate(&[
                doc! {"$group": {"_id": "$author", "bookCount": {"$sum": 1}}},
                doc! {"$sort": {"bookCount": -1, "_id": 1}},
            ])?),
            Step::BooksByDecade => StepOutput::Documents(self.books.aggregate(&[
                doc! {"$group": {
                    "_id": {"$floor": {"$divide": ["$published_year", 10]}},
                    "count": {"$sum": 1},
                }},
                doc! {"$project": {"decade": {"$multiply": ["$_id", 10]}, "count": 1, "_id": 0}},
            ])?),
            Step::CreateTitleIndex => self.create_index(doc! {"title": 1})?,
            Step::CreateAuthorYearIndex => {
                self.create_index(doc! {"author": 1, "published_year": -1})?
            }
            Step::ExplainTitleQuery => {
                let report = self.books.explain(
                    &doc! {"title": s.explain_title.clone()},
                    &FindOptions::default(),
                )?;
                log::info!(
                    target: QUERIES_TARGET,
                    "explain plan: {}",
                    report.winning_plan.stage()
                );
                StepOutput::Stats(report.execution_stats_document())
            }
        };
        let duration_ms = elapsed_ms(start);
        log::info!(target: QUERIES_TARGET, "{step:?} completed in {duration_ms} ms");
        crate::devlog!(
            "{{\"event\":\"step\",\"step\":\"{step:?}\",\"duration_ms\":{duration_ms},\"result_count\":{}}}",
            match &output {
                StepOutput::Documents(d) => d.len(),
                StepOutput::Status(_) | StepOutput::Stats(_) => 0,
            }
        );
        Ok(StepResult { step, label: step.label(s), output })
    }

    fn find_all(&self, filter: BsonDocument) -> Result<StepOutput, DbError> {
        Ok(StepOutput::Documents(self.books.find(&filter, &FindOptions::default())?))
    }

    fn in_stock_recent_page(&self, sort: SortSpec) -> Result<StepOutput, DbError> {
        let s = &self.settings;
        let opts = FindOptions {
            projection: Some(vec!["title".into(), "author".into(), "price".into()]),
            sort: Some(vec![sort]),
            limit: Some(s.page_size),
            skip: Some(s.skip()),
        };
        let filter = doc! {"inStock": true, "published_year": {"$gt": s.recent_after}};
        Ok(StepOutput::Documents(self.books.find(&filter, &opts)?))
    }

    fn create_index(&self, keys: BsonDocument) -> Result<StepOutput, DbError> {
        let name = self.books.create_index(IndexModel::from_keys(&keys)?)?;
        Ok(StepOutput::Status(name))
    }
}

fn print_step<W: Write>(out: &mut W, result: &StepResult) -> Result<(), DbError> {
    match &result.output {
        StepOutput::Documents(docs) => {
            writeln!(out, "{}", result.label)?;
            writeln!(out, "{}", serde_json::to_string_pretty(docs)?)?;
        }
        StepOutput::Status(detail) => writeln!(out, "{} ({detail})", result.label)?,
        StepOutput::Stats(stats) => {
            writeln!(out, "{}", result.label)?;
            writeln!(out, "{}", serde_json::to_string_pretty(stats)?)?;
        }
    }
    Ok(())
}

/// Connects, seeds an empty collection when a seed file is configured, runs every
/// step and closes the connection, whether or not a step failed.
///
/// # Errors
/// Returns the connection, seeding or first step error, or the close error.
pub fn run_queries<W: Write>(cfg: &AppConfig, out: &mut W) -> Result<RunReport, DbError> {
    let client = Client::connect(&cfg.uri)?;
    writeln!(out, "Connected to {}", client.uri())?;
    let books = client.database(&cfg.database).collection(&cfg.collection);
    let result = seed_if_empty(&books, cfg)
        .and_then(|()| QueryRunner::new(&books, cfg.queries.clone()).run(out));
    let closed = client.close();
    match result {
        Ok(report) => {
            closed?;
            log::info!(target: QUERIES_TARGET, "all {} steps completed", report.steps.len());
            Ok(report)
        }
        Err(e) => {
            if let Err(close_err) = closed {
                log::error!("close after failure also failed: {close_err}");
            }
            Err(e)
        }
    }
}

fn seed_if_empty(books: &CollectionRef, cfg: &AppConfig) -> Result<(), DbError> {
    let Some(seed) = &cfg.seed_file else {
        return Ok(());
    };
    if books.count(&doc! {})? > 0 {
        log::debug!("{} already has data; not seeding", books.namespace());
        return Ok(());
    }
    let report = books.import_file(seed, &ImportOptions::default())?;
    log::info!("seeded {} with {} records from {}", books.namespace(), report.inserted, seed.display());
    Ok(())
}
