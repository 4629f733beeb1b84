use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, Color as TableColor, ContentArrangement, Table};

use super::styling::Tone;
use crate::analysis::format_duration;
use crate::insights::IssueCategory;

pub fn create_table(header: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(
            header
                .iter()
                .map(|label| Cell::new(*label).fg(TableColor::Cyan))
                .collect::<Vec<_>>(),
        );
    table
}

fn tone_cell(text: String, tone: Tone) -> Cell {
    let color = match tone {
        Tone::Good => TableColor::Green,
        Tone::Warn => TableColor::Yellow,
        Tone::Bad => TableColor::Red,
    };
    Cell::new(text).fg(color)
}

/// `rate` is a fraction in `[0, 1]`.
pub fn success_rate_cell(rate: f64) -> Cell {
    let percent = rate * 100.0;
    tone_cell(
        format!("{percent:.1}%"),
        Tone::higher_is_better(percent, 80.0, 50.0),
    )
}

pub fn wasted_percent_cell(percent: f64) -> Cell {
    tone_cell(
        format!("{percent:.1}%"),
        Tone::higher_is_worse(percent, 10.0, 25.0),
    )
}

pub fn duration_cell(seconds: f64) -> Cell {
    tone_cell(
        format_duration(seconds),
        Tone::higher_is_worse(seconds, 120.0, 300.0),
    )
}

pub fn priority_cell(score: f64) -> Cell {
    tone_cell(format!("{score:.2}"), Tone::higher_is_worse(score, 0.4, 0.7))
}

pub fn category_cell(category: IssueCategory) -> Cell {
    let color = match category {
        IssueCategory::FlakyTest => TableColor::Magenta,
        IssueCategory::SlowPipeline => TableColor::Yellow,
        IssueCategory::Workflow => TableColor::Blue,
        IssueCategory::HardFailure => TableColor::DarkGrey,
    };
    Cell::new(category.to_string()).fg(color)
}
