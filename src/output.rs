use comfy_table::{
    modifiers::UTF8_ROUND_CORNERS, presets::UTF8_FULL, Attribute, Cell, Color,
    ContentArrangement, Table,
};
use yansi::Paint;

use judgeline::judge::{Evaluation, PromptMessages};
use judgeline::template::{RuleKind, Template};
use judgeline::types::Judgment;

/// Map a rule kind to its display color.
fn rule_color(kind: RuleKind) -> Color {
    match kind {
        RuleKind::Binary => Color::Green,
        RuleKind::Numeric => Color::Cyan,
        RuleKind::Preference => Color::Magenta,
        RuleKind::Json => Color::Yellow,
        RuleKind::Text => Color::White,
    }
}

fn rule_cell(kind: RuleKind) -> Cell {
    Cell::new(kind).fg(rule_color(kind))
}

fn header_cell(title: &str) -> Cell {
    Cell::new(title).add_attribute(Attribute::Bold)
}

fn new_table(headers: &[&str]) -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic)
        .set_header(headers.iter().map(|h| header_cell(h)).collect::<Vec<_>>());
    table
}

fn one_line(text: &str, max: usize) -> String {
    let flat = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if flat.chars().count() <= max {
        return flat;
    }
    let cut: String = flat.chars().take(max).collect();
    format!("{cut}...")
}

pub fn templates_table(templates: &[&Template]) -> Table {
    let mut table = new_table(&["ID", "Name", "Rules"]);
    for template in templates {
        table.add_row(vec![
            Cell::new(&template.template_id),
            Cell::new(&template.template_name),
            rule_cell(template.output_parser_rules.kind()),
        ]);
    }
    table
}

pub fn templates_table_verbose(templates: &[&Template]) -> Table {
    let mut table = new_table(&["ID", "Name", "Rules", "Target", "Description", "System"]);
    for template in templates {
        table.add_row(vec![
            Cell::new(&template.template_id),
            Cell::new(&template.template_name),
            rule_cell(template.output_parser_rules.kind()),
            Cell::new(template.target_judge_model_family.as_deref().unwrap_or("-")),
            Cell::new(template.description.as_deref().unwrap_or("")),
            Cell::new(one_line(&template.prompt_structure.system_message, 60)),
        ]);
    }
    table
}

fn judgment_text(judgment: &Judgment) -> String {
    match judgment.judgment.as_text() {
        Some(text) => text.to_string(),
        None => judgment.judgment.to_json().to_string(),
    }
}

/// Human-readable result of one evaluation.
pub fn print_evaluation(evaluation: &Evaluation) {
    let judgment = &evaluation.judgment;
    let template = evaluation.template_id.as_deref().unwrap_or("(custom)");
    println!(
        "{} {} ({})",
        "template:".dim(),
        template,
        evaluation.rule_kind
    );
    if judgment.parse_succeeded {
        println!("{} {}", "judgment:".dim(), judgment_text(judgment).green().bold());
    } else {
        println!(
            "{} {}",
            "judgment:".dim(),
            "unparsed, raw response follows".yellow()
        );
        println!("{}", judgment.raw_response);
    }
    if let Some(reasoning) = &judgment.reasoning {
        println!("{} {reasoning}", "reasoning:".dim());
    }
}

pub fn print_prompt(prompt: &PromptMessages) {
    println!("{}", "--- system ---".dim());
    println!("{}", prompt.system);
    println!("{}", "--- user ---".dim());
    println!("{}", prompt.user);
}

#[cfg(test)]
mod tests {
    use super::*;
    use judgeline::Catalogue;
    use judgeline::TemplateStore;

    #[test]
    fn test_templates_table_lists_every_template() {
        let catalogue = Catalogue::embedded().unwrap();
        let mut table = templates_table(&catalogue.templates());
        let rendered = table.force_no_tty().to_string();
        assert!(rendered.contains("binary_classification"));
        assert!(rendered.contains("code_quality_review"));
        assert!(rendered.contains("preference"));
    }

    #[test]
    fn test_verbose_table_has_extra_columns() {
        let catalogue = Catalogue::embedded().unwrap();
        let mut table = templates_table_verbose(&catalogue.templates());
        let rendered = table.force_no_tty().to_string();
        assert!(rendered.contains("Description"));
        assert!(rendered.contains("System"));
    }

    #[test]
    fn test_one_line_collapses_and_truncates() {
        assert_eq!(one_line("a\n  b", 10), "a b");
        assert_eq!(one_line("abcdefghij", 4), "abcd...");
    }
}
