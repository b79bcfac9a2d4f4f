//! Rendering for `--check`.

use mrclean_domain::RetentionRule;
use tabled::{
    builder::Builder,
    settings::{object::Rows, Alignment, Modify, Style},
};

/// Rules as a table, in sweep order.
pub fn render_rules(rules: &[RetentionRule]) -> String {
    if rules.is_empty() {
        return "No rules configured.".to_string();
    }

    let mut builder = Builder::default();
    builder.push_record(["#", "Name", "Path", "Method", "Days", "Masks"]);

    for (index, rule) in rules.iter().enumerate() {
        let masks = match rule.effective_masks() {
            Some(masks) => masks.to_string(),
            None => "(ignored)".to_string(),
        };
        builder.push_record([
            (index + 1).to_string(),
            rule.name.clone(),
            rule.root.display().to_string(),
            format!("{} - {}", rule.strategy.id(), rule.strategy.as_str()),
            rule.max_age_days.to_string(),
            masks,
        ]);
    }

    let mut table = builder.build();
    table
        .with(Style::rounded())
        .with(Modify::new(Rows::first()).with(Alignment::center()));

    table.to_string()
}
