use std::fmt;

use crate::parser::blocks::DataBlock;

/// One organisation to scrape. Immutable once loaded from the scrape config.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Target {
    pub name: String,
    pub entry_url: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EmploymentStatus {
    Current,
    Former,
    Unknown,
}

impl fmt::Display for EmploymentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            EmploymentStatus::Current => "Current",
            EmploymentStatus::Former => "Former",
            EmploymentStatus::Unknown => "Unknown",
        };
        f.write_str(s)
    }
}

/// Free-text location plus whatever could be decomposed out of it.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Location {
    pub raw: String,
    pub city: String,
    pub state: String,
    pub postcode: String,
}

/// Per-category star ratings. `None` is written out as `Unknown`.
#[derive(Debug, Clone, PartialEq, Default)]
pub struct CategoryRatings {
    pub work_life_balance: Option<f32>,
    pub career_development: Option<f32>,
    pub benefits_perks: Option<f32>,
    pub management: Option<f32>,
    pub working_environment: Option<f32>,
    pub diversity: Option<f32>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ReviewRecord {
    pub organisation: String,
    pub source: String,
    pub country: String,
    pub overall_rating: Option<f32>,
    pub ratings: CategoryRatings,
    pub year: i32,
    pub month: u32,
    pub employment_status: EmploymentStatus,
    pub tenure: String,
    pub location: Location,
    pub job_title: String,
    pub title: String,
    pub pros: String,
    pub cons: String,
}

pub const RECORD_COLUMNS: &[&str] = &[
    "organisation",
    "entry_url",
    "source",
    "country",
    "overall_rating",
    "work_life_balance",
    "career_development",
    "benefits_perks",
    "management",
    "working_environment",
    "diversity_equal_opportunity",
    "year",
    "month",
    "employment_status",
    "tenure",
    "location",
    "city",
    "state",
    "postcode",
    "job_title",
    "title",
    "pros",
    "cons",
];

fn rating_cell(r: Option<f32>) -> String {
    r.map(|v| v.to_string()).unwrap_or_else(|| "Unknown".into())
}

impl ReviewRecord {
    /// Output row in `RECORD_COLUMNS` order, with the target URL as provenance.
    pub fn to_row(&self, entry_url: &str) -> Vec<String> {
        vec![
            self.organisation.clone(),
            entry_url.to_string(),
            self.source.clone(),
            self.country.clone(),
            rating_cell(self.overall_rating),
            rating_cell(self.ratings.work_life_balance),
            rating_cell(self.ratings.career_development),
            rating_cell(self.ratings.benefits_perks),
            rating_cell(self.ratings.management),
            rating_cell(self.ratings.working_environment),
            rating_cell(self.ratings.diversity),
            self.year.to_string(),
            self.month.to_string(),
            self.employment_status.to_string(),
            self.tenure.clone(),
            self.location.raw.clone(),
            self.location.city.clone(),
            self.location.state.clone(),
            self.location.postcode.clone(),
            self.job_title.clone(),
            self.title.clone(),
            self.pros.clone(),
            self.cons.clone(),
        ]
    }
}

/// A parsed record together with the raw block it came from.
#[derive(Debug, Clone)]
pub struct ScrapedReview {
    pub record: ReviewRecord,
    pub block: DataBlock,
}

/// Everything collected for one target. Owned by the page-cycle driver until
/// it is handed to the sink.
#[derive(Debug)]
pub struct ScrapeResult {
    pub target: Target,
    pub reviews: Vec<ScrapedReview>,
    pub expected_total: Option<usize>,
    pub pages: usize,
}

impl ScrapeResult {
    pub fn new(target: Target) -> Self {
        ScrapeResult {
            target,
            reviews: Vec::new(),
            expected_total: None,
            pages: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.reviews.len()
    }
}
