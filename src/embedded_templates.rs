//! Built-in template catalogue, compiled into the binary via include_str!().

pub const DEFAULT_TEMPLATES: &str = include_str!("../templates/default_templates.yaml");

/// File name used when writing the catalogue out for customization.
pub const FILE_NAME: &str = "templates.yaml";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_templates_embedded() {
        assert!(DEFAULT_TEMPLATES.contains("templates:"));
        assert!(DEFAULT_TEMPLATES.contains("binary_classification:"));
    }

    #[test]
    fn test_every_template_uses_output_format_placeholder() {
        let catalogue: serde_norway::Value = serde_norway::from_str(DEFAULT_TEMPLATES).unwrap();
        let templates = catalogue["templates"].as_mapping().unwrap();
        for (id, template) in templates {
            let suffix = template["prompt_structure"]["user_instruction_suffix"]
                .as_str()
                .unwrap_or("");
            assert!(
                suffix.contains("{output_format_instruction}"),
                "Template {:?} should place the output format instruction",
                id
            );
        }
    }
}
