//! Display helpers: date formats, read-time estimates, truncation and the
//! year/month grouping used by the timeline.

use chrono::{Datelike, NaiveDate};

use crate::core::post::Post;

const MONTH_NAMES: [&str; 12] = [
    "一月", "二月", "三月", "四月", "五月", "六月", "七月", "八月", "九月", "十月", "十一月", "十二月",
];

/// Characters read per minute.
const READ_SPEED: usize = 300;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DateFormat {
    /// `2024-06-01`
    #[default]
    Iso,
    /// `2024年06月01日`
    Long,
    /// `06月01日`
    MonthDay,
    /// `2024`
    Year,
    /// `06`
    Month,
    /// `六月`
    MonthName,
}

impl DateFormat {
    /// Looks a format up by its pattern name. Unknown names fall back to ISO.
    pub fn from_pattern(pattern: &str) -> Self {
        match pattern {
            "YYYY年MM月DD日" => DateFormat::Long,
            "MM月DD日" => DateFormat::MonthDay,
            "YYYY" => DateFormat::Year,
            "MM" => DateFormat::Month,
            "month-name" => DateFormat::MonthName,
            _ => DateFormat::Iso,
        }
    }
}

pub fn format_date(date: NaiveDate, format: DateFormat) -> String {
    match format {
        DateFormat::Iso => date.format("%Y-%m-%d").to_string(),
        DateFormat::Long => date.format("%Y年%m月%d日").to_string(),
        DateFormat::MonthDay => date.format("%m月%d日").to_string(),
        DateFormat::Year => date.year().to_string(),
        DateFormat::Month => date.format("%m").to_string(),
        DateFormat::MonthName => MONTH_NAMES[date.month0() as usize].to_string(),
    }
}

/// Minutes to read `content`, counting non-whitespace characters. Never 0.
pub fn estimate_read_time(content: &str) -> u32 {
    let chars = content.chars().filter(|c| !c.is_whitespace()).count();
    chars.div_ceil(READ_SPEED).max(1) as u32
}

/// Cuts `text` to `max_chars` characters and appends `...` when anything was cut.
pub fn truncate(text: &str, max_chars: usize) -> String {
    match text.char_indices().nth(max_chars) {
        None => text.to_string(),
        Some((cut, _)) => format!("{}...", text[..cut].trim_end()),
    }
}

/// Posts of one month, in collection order.
#[derive(Debug, Clone, PartialEq)]
pub struct MonthGroup {
    pub month: u32,
    pub posts: Vec<Post>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearGroup {
    pub year: i32,
    pub months: Vec<MonthGroup>,
}

/// Groups posts by year, then month, both newest first.
pub fn group_by_month(posts: &[Post]) -> Vec<YearGroup> {
    let mut years: Vec<YearGroup> = Vec::new();
    for post in posts {
        let (year, month) = (post.date.year(), post.date.month());
        let index = match years.iter().position(|y| y.year == year) {
            Some(index) => index,
            None => {
                years.push(YearGroup {
                    year,
                    months: Vec::new(),
                });
                years.len() - 1
            }
        };
        let months = &mut years[index].months;
        match months.iter_mut().find(|m| m.month == month) {
            Some(group) => group.posts.push(post.clone()),
            None => months.push(MonthGroup {
                month,
                posts: vec![post.clone()],
            }),
        }
    }

    years.sort_by(|a, b| b.year.cmp(&a.year));
    for year in &mut years {
        year.months.sort_by(|a, b| b.month.cmp(&a.month));
    }
    years
}
