//! Template rendering to plain WhatsApp text.

use std::collections::BTreeMap;

use database::{TemplateButton, TemplateComponent};
use regex::{Captures, Regex};
use serde_json::Value;

use crate::error::TemplateError;

/// Substitutes `{{key}}` placeholders and flattens buttons into numbered options.
#[derive(Debug, Clone)]
pub struct Renderer {
    placeholder: Regex,
}

impl Renderer {
    pub fn new() -> Result<Self, TemplateError> {
        Ok(Self {
            placeholder: Regex::new(r"\{\{\s*([A-Za-z0-9_.]+)\s*\}\}")?,
        })
    }

    /// Replace known placeholders. Unknown ones are left as written.
    pub fn substitute(&self, text: &str, variables: &BTreeMap<String, Value>) -> String {
        self.placeholder
            .replace_all(text, |caps: &Captures<'_>| match variables.get(&caps[1]) {
                Some(Value::String(value)) => value.clone(),
                Some(Value::Null) | None => caps[0].to_string(),
                Some(other) => other.to_string(),
            })
            .into_owned()
    }

    /// Render components in position order, then buttons as a numbered list.
    ///
    /// Buttons go out as text options, not native interactive buttons.
    pub fn render(
        &self,
        components: &[TemplateComponent],
        buttons: &[TemplateButton],
        variables: &BTreeMap<String, Value>,
    ) -> String {
        let mut ordered: Vec<&TemplateComponent> = components.iter().collect();
        ordered.sort_by_key(|component| (component.position, component.id));

        let mut sections: Vec<String> = ordered
            .iter()
            .filter_map(|component| component.text.as_deref())
            .filter(|text| !text.trim().is_empty())
            .map(|text| self.substitute(text, variables))
            .collect();

        if !buttons.is_empty() {
            let mut ordered: Vec<&TemplateButton> = buttons.iter().collect();
            ordered.sort_by_key(|button| (button.position, button.id));
            let options = ordered
                .iter()
                .enumerate()
                .map(|(index, button)| format!("{}. {}", index + 1, button.text))
                .collect::<Vec<_>>()
                .join("\n");
            sections.push(options);
        }

        sections.join("\n\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn component(id: i64, kind: &str, text: &str, position: i64) -> TemplateComponent {
        TemplateComponent {
            id,
            version_id: "v1".to_string(),
            component_type: kind.to_string(),
            text: Some(text.to_string()),
            format: "TEXT".to_string(),
            position,
        }
    }

    fn button(id: i64, text: &str, position: i64) -> TemplateButton {
        TemplateButton {
            id,
            version_id: "v1".to_string(),
            btn_type: "QUICK_REPLY".to_string(),
            text: text.to_string(),
            url: None,
            phone_number: None,
            payload_key: None,
            position,
        }
    }

    fn vars(value: Value) -> BTreeMap<String, Value> {
        serde_json::from_value(value).unwrap()
    }

    #[test]
    fn test_substitute_known_and_unknown() {
        let renderer = Renderer::new().unwrap();
        let text = renderer.substitute(
            "Hi {{name}}, you owe {{ amount }} RWF by {{date}}",
            &vars(json!({ "name": "Aline", "amount": 5000 })),
        );
        assert_eq!(text, "Hi Aline, you owe 5000 RWF by {{date}}");
    }

    #[test]
    fn test_render_orders_components_and_numbers_buttons() {
        let renderer = Renderer::new().unwrap();
        let components = vec![
            component(2, "FOOTER", "easyMO", 3),
            component(1, "BODY", "Pay {{amount}} now?", 2),
            component(3, "HEADER", "Payment", 1),
        ];
        let buttons = vec![button(2, "Cancel", 2), button(1, "Pay now", 1)];

        let text = renderer.render(&components, &buttons, &vars(json!({ "amount": "1,000 RWF" })));

        assert_eq!(text, "Payment\n\nPay 1,000 RWF now?\n\neasyMO\n\n1. Pay now\n2. Cancel");
    }

    #[test]
    fn test_render_without_buttons() {
        let renderer = Renderer::new().unwrap();
        let text = renderer.render(&[component(1, "BODY", "Hello", 1)], &[], &BTreeMap::new());
        assert_eq!(text, "Hello");
    }
}
