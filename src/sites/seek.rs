//! seek.com.au company reviews.
//!
//! A review card flattens to 29 fragments, anchored on "The good things" at
//! index 25:
//!
//! ```text
//!  0  overall score ("4.0")          20  job role
//!  1  overall stars ("4 out of 5")   21  "March 2023"
//!  2-13  six (category, stars) pairs 22  location
//! 14-19  card chrome                 23  "3 to 5 years in the role, former employee"
//!                                    24  review title (h3)
//!                                    25  "The good things"   26  pros
//!                                    27  "The challenges"    28  cons
//! ```

use std::sync::LazyLock;
use std::time::Duration;

use regex::Regex;
use scraper::{Html, Selector};

use super::{Fingerprint, Navigators, Parsers, Scraper, Validators};
use crate::browser::{poll_until, Page, POLL_INTERVAL};
use crate::error::ScrapeError;
use crate::parser::blocks::{BlockLayout, DataBlock, RawTextSequence};
use crate::parser::fields::{
    clean_text, parse_employment_status, parse_location, parse_month_year, parse_stars,
    parse_tenure, rating_after_label,
};
use crate::parser::text::{extract_texts, TextRule, TextSource};
use crate::record::{CategoryRatings, ReviewRecord, Target};

const SOURCE: &str = "Seek";
const COUNTRY: &str = "AU";

const BLOCK_LENGTH: usize = 29;
const ANCHOR_OFFSET: usize = 25;

const IDX_OVERALL: usize = 0;
const IDX_OVERALL_STARS: usize = 1;
const IDX_JOB_ROLE: usize = 20;
const IDX_DATE: usize = 21;
const IDX_LOCATION: usize = 22;
const IDX_TENURE: usize = 23;
const IDX_TITLE: usize = 24;
const IDX_PROS: usize = 26;
const IDX_CHALLENGES: usize = 27;
const IDX_CONS: usize = 28;

const CHALLENGES: &str = "The challenges";

const NEXT_BUTTON: &str = r#"a[aria-label="Next"]"#;
const FINGERPRINT: &str = "h3";

static URL_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^https?://www\.seek\.com\.au/companies/.+/reviews").unwrap());
static ANCHOR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^The good things$").unwrap());
static YEAR_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4}$").unwrap());
static COUNT_RE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\s*([\d,]+)\s*$").unwrap());

static TEXT_RULES: LazyLock<Vec<TextRule>> = LazyLock::new(|| {
    vec![
        TextRule {
            selector: Selector::parse("span, h3").unwrap(),
            source: TextSource::InnerText,
        },
        TextRule {
            selector: Selector::parse(r#"div[aria-label*="out of 5"]"#).unwrap(),
            source: TextSource::Attribute("aria-label"),
        },
    ]
});
static STRONG_SEL: LazyLock<Selector> = LazyLock::new(|| Selector::parse("strong").unwrap());

const WORK_LIFE: &str = "Work/Life balance";
const CAREER: &str = "Career development";
const BENEFITS: &str = "Benefits & perks";
const MANAGEMENT: &str = "Management";
const ENVIRONMENT: &str = "Working environment";
const DIVERSITY: &str = "Diversity & equal opportunity";

pub fn site() -> Scraper {
    Scraper {
        name: SOURCE,
        validators: Box::new(SeekValidators),
        parsers: Box::new(SeekParsers::new()),
        navigators: Box::new(SeekNavigators),
    }
}

pub struct SeekValidators;

impl Validators for SeekValidators {
    fn url_pattern(&self) -> &Regex {
        &URL_RE
    }

    fn validate_data_block(&self, block: &DataBlock) -> Result<(), ScrapeError> {
        let bad = |reason: String| Err(ScrapeError::unexpected(reason, &block.fields));
        if block.fields.len() != BLOCK_LENGTH {
            return bad(format!("block has {} fields, expected {}", block.fields.len(), BLOCK_LENGTH));
        }
        let date = block.get(IDX_DATE).unwrap_or_default();
        if !date
            .split_whitespace()
            .nth(1)
            .is_some_and(|year| YEAR_RE.is_match(year))
        {
            return bad(format!("field {} should be 'Month Year', got {:?}", IDX_DATE, date));
        }
        let challenges = block.get(IDX_CHALLENGES).unwrap_or_default();
        if challenges.trim() != CHALLENGES {
            return bad(format!("field {} should be {:?}, got {:?}", IDX_CHALLENGES, CHALLENGES, challenges));
        }
        let stars = block.get(IDX_OVERALL_STARS).unwrap_or_default();
        if parse_stars(stars).is_none() {
            return bad(format!("field {} should be a star rating, got {:?}", IDX_OVERALL_STARS, stars));
        }
        Ok(())
    }
}

pub struct SeekParsers {
    layout: BlockLayout,
}

impl SeekParsers {
    fn new() -> Self {
        SeekParsers {
            layout: BlockLayout {
                anchor: ANCHOR_RE.clone(),
                anchor_offset: ANCHOR_OFFSET,
                length: BLOCK_LENGTH,
            },
        }
    }
}

impl Parsers for SeekParsers {
    fn layout(&self) -> &BlockLayout {
        &self.layout
    }

    /// `<strong>45</strong> reviews sorted by ...`
    fn extract_total_count(&self, page: &dyn Page) -> Result<usize, ScrapeError> {
        let doc = Html::parse_document(&page.content()?);
        let total = doc
            .select(&STRONG_SEL)
            .filter(|strong| {
                strong
                    .next_sibling()
                    .and_then(|n| n.value().as_text().map(|t| t.contains("reviews sorted by")))
                    .unwrap_or(false)
            })
            .find_map(|strong| {
                let text: String = strong.text().collect();
                let caps = COUNT_RE.captures(&text)?;
                caps[1].replace(',', "").parse::<usize>().ok()
            });
        total.ok_or_else(|| ScrapeError::NonCriticalRead {
            what: "total review count".into(),
            reason: format!("no '<strong>N</strong> reviews sorted by' on {}", page.url()),
        })
    }

    fn extract_page_text(&self, markup: &str) -> RawTextSequence {
        extract_texts(markup, &TEXT_RULES)
    }

    fn parse_data_block(&self, block: &DataBlock, target: &Target) -> Result<ReviewRecord, ScrapeError> {
        let field = |idx: usize| {
            block.get(idx).ok_or_else(|| {
                ScrapeError::unexpected(format!("missing field {}", idx), &block.fields)
            })
        };

        let date = field(IDX_DATE)?;
        let (year, month) = parse_month_year(date).ok_or_else(|| {
            ScrapeError::unexpected(format!("unparseable date {:?}", date), &block.fields)
        })?;
        let tenure_status = field(IDX_TENURE)?;

        let overall_rating = parse_stars(field(IDX_OVERALL_STARS)?)
            .or_else(|| field(IDX_OVERALL).ok()?.trim().parse().ok());

        Ok(ReviewRecord {
            organisation: target.name.clone(),
            source: SOURCE.to_string(),
            country: COUNTRY.to_string(),
            overall_rating,
            ratings: CategoryRatings {
                work_life_balance: rating_after_label(block, WORK_LIFE),
                career_development: rating_after_label(block, CAREER),
                benefits_perks: rating_after_label(block, BENEFITS),
                management: rating_after_label(block, MANAGEMENT),
                working_environment: rating_after_label(block, ENVIRONMENT),
                diversity: rating_after_label(block, DIVERSITY),
            },
            year,
            month,
            employment_status: parse_employment_status(tenure_status),
            tenure: parse_tenure(tenure_status),
            location: parse_location(field(IDX_LOCATION)?),
            job_title: clean_text(field(IDX_JOB_ROLE)?),
            title: clean_text(field(IDX_TITLE)?),
            pros: clean_text(field(IDX_PROS)?),
            cons: clean_text(field(IDX_CONS)?),
        })
    }
}

pub struct SeekNavigators;

impl Navigators for SeekNavigators {
    fn wait_for_entry(&self, page: &dyn Page, timeout: Duration) -> Result<(), ScrapeError> {
        page.wait_for_element(NEXT_BUTTON, timeout)
    }

    fn check_next_page(&self, page: &dyn Page) -> Result<bool, ScrapeError> {
        if !page.has_element(NEXT_BUTTON)? {
            return Ok(false);
        }
        let tabindex = page.element_attribute(NEXT_BUTTON, "tabindex")?;
        Ok(tabindex.as_deref() != Some("-1"))
    }

    fn grab_next_page(&self, page: &dyn Page) -> Result<(), ScrapeError> {
        page.click(NEXT_BUTTON)
    }

    fn capture_page(&self, page: &dyn Page) -> Result<Fingerprint, ScrapeError> {
        Ok(Fingerprint(page.element_texts(FINGERPRINT)?))
    }

    fn wait_for_page(&self, page: &dyn Page, before: &Fingerprint, timeout: Duration) -> Result<(), ScrapeError> {
        let changed = poll_until(timeout, POLL_INTERVAL, || {
            Ok(self.capture_page(page)? != *before)
        });
        if changed {
            Ok(())
        } else {
            Err(ScrapeError::UnexpectedData {
                reason: format!(
                    "page content unchanged {:.0}s after requesting next page on {}",
                    timeout.as_secs_f64(),
                    page.url()
                ),
                context: before.0.join(" | "),
            })
        }
    }
}


#[cfg(test)]
mod tests {
    use super::fixtures::*;
    use super::*;
    use crate::browser::testing::FakePage;
    use crate::record::EmploymentStatus;

    fn target() -> Target {
        Target {
            name: "Kmart".into(),
            entry_url: URL.into(),
        }
    }

    fn first_block(html: &str) -> DataBlock {
        let parsers = SeekParsers::new();
        let seq = parsers.extract_page_text(html);
        let idx = parsers.extract_data_indices(&seq)[0];
        crate::parser::blocks::extract_data_block(&seq, parsers.extract_data_bounds(idx)).unwrap()
    }

    #[test]
    fn locates_one_block_per_card() {
        let parsers = SeekParsers::new();
        let cards = vec![review_card("a", "March 2023"), review_card("b", "May 2022")];
        let seq = parsers.extract_page_text(&page(&cards, Some(2), None));
        let idx = parsers.extract_data_indices(&seq);
        assert_eq!(idx.len(), 2);
        assert_eq!(idx[1] - idx[0], BLOCK_LENGTH);
        let w = parsers.extract_data_bounds(idx[0]);
        assert_eq!(seq.0[w.start as usize], "4.0");
        assert_eq!(seq.0[w.end as usize - 1], "Rosters change weekly");
    }

    #[test]
    fn parses_card() {
        let block = first_block(&page(&[review_card("Great place", "March 2023")], None, None));
        SeekValidators.validate_data_block(&block).unwrap();
        let r = SeekParsers::new().parse_data_block(&block, &target()).unwrap();
        assert_eq!(r.organisation, "Kmart");
        assert_eq!(r.source, "Seek");
        assert_eq!(r.country, "AU");
        assert_eq!(r.overall_rating, Some(4.0));
        assert_eq!(r.ratings.work_life_balance, Some(3.0));
        assert_eq!(r.ratings.benefits_perks, Some(2.0));
        assert_eq!(r.ratings.diversity, Some(4.0));
        assert_eq!((r.year, r.month), (2023, 3));
        assert_eq!(r.employment_status, EmploymentStatus::Former);
        assert_eq!(r.tenure, "3-5");
        assert_eq!(r.location.city, "Hobart");
        assert_eq!(r.location.state, "TAS");
        assert_eq!(r.location.postcode, "7000");
        assert_eq!(r.job_title, "Store Manager");
        assert_eq!(r.title, "Great place");
        assert_eq!(r.pros, "Friendly 'team' , good hours");
        assert_eq!(r.cons, "Rosters change weekly");
    }

    #[test]
    fn parsing_is_idempotent() {
        let block = first_block(&page(&[review_card("Same", "June 2021")], None, None));
        let parsers = SeekParsers::new();
        let a = parsers.parse_data_block(&block, &target()).unwrap();
        let b = parsers.parse_data_block(&block, &target()).unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn missing_category_is_unknown() {
        let card = review_card("x", "March 2023").replace("Management", "Leadership");
        let block = first_block(&page(&[card], None, None));
        let r = SeekParsers::new().parse_data_block(&block, &target()).unwrap();
        assert_eq!(r.ratings.management, None);
        assert_eq!(r.ratings.career_development, Some(4.0));
    }

    #[test]
    fn rejects_shifted_blocks() {
        let block = first_block(&page(&[review_card("x", "March twenty")], None, None));
        let err = SeekValidators.validate_data_block(&block).unwrap_err();
        assert!(matches!(err, ScrapeError::UnexpectedData { .. }));

        let mut block = first_block(&page(&[review_card("x", "March 2023")], None, None));
        block.fields[IDX_CHALLENGES] = "Something else".into();
        assert!(SeekValidators.validate_data_block(&block).is_err());

        block.fields.truncate(20);
        assert!(SeekValidators.validate_data_block(&block).is_err());
    }

    #[test]
    fn short_block_is_unexpected_data_not_panic() {
        let mut block = first_block(&page(&[review_card("x", "March 2023")], None, None));
        block.fields.truncate(IDX_CONS);
        let err = SeekParsers::new().parse_data_block(&block, &target()).unwrap_err();
        assert!(err.is_data_quality());
    }

    #[test]
    fn url_pattern() {
        assert!(SeekValidators.validate_url(URL).is_ok());
        assert!(SeekValidators.validate_url("http://www.seek.com.au/companies/x/reviews?page=2").is_ok());
        assert!(SeekValidators.validate_url("https://seek.com.au/companies/x/reviews").is_err());
        assert!(SeekValidators.validate_url("https://www.seek.com.au/jobs").is_err());
    }

    #[test]
    fn total_count() {
        let parsers = SeekParsers::new();
        let page_ok = FakePage::new(vec![page(&[], Some(1234), None).replace("1234", "1,234")]);
        assert_eq!(parsers.extract_total_count(&page_ok).unwrap(), 1234);

        let page_missing = FakePage::new(vec![page(&[], None, None)]);
        assert!(matches!(
            parsers.extract_total_count(&page_missing),
            Err(ScrapeError::NonCriticalRead { .. })
        ));
    }

    #[test]
    fn next_control_states() {
        let nav = SeekNavigators;
        let enabled = FakePage::new(vec![page(&[], None, Some(true))]);
        let disabled = FakePage::new(vec![page(&[], None, Some(false))]);
        let absent = FakePage::new(vec![page(&[], None, None)]);
        assert!(nav.check_next_page(&enabled).unwrap());
        assert!(!nav.check_next_page(&disabled).unwrap());
        assert!(!nav.check_next_page(&absent).unwrap());
        assert!(nav.wait_for_entry(&enabled, Duration::ZERO).is_ok());
        assert!(nav.wait_for_entry(&absent, Duration::ZERO).is_err());
    }

    #[test]
    fn waits_for_content_change() {
        let nav = SeekNavigators;
        let fake = FakePage::new(pages(&[1, 1], 2));
        let before = nav.capture_page(&fake).unwrap();
        nav.grab_next_page(&fake).unwrap();
        nav.wait_for_page(&fake, &before, Duration::from_secs(1)).unwrap();

        let stuck = FakePage::new(pages(&[1], 1));
        let before = nav.capture_page(&stuck).unwrap();
        let err = nav
            .wait_for_page(&stuck, &before, Duration::from_millis(10))
            .unwrap_err();
        assert!(err.is_data_quality());
    }
}
