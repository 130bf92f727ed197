//! Declarative field schema for model output
//!
//! Each persisted field is declared once as a [`FieldSpec`]. The result
//! normalizer repairs values by kind and the prompt builder renders the same
//! table as the output contract given to the model.

/// Value kind and bounds of one declared field
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum FieldKind {
    /// Whole number clamped into `[min, max]`
    Integer { min: i64, max: i64, default: i64 },
    /// Closed set of exact string options
    Choice {
        options: &'static [&'static str],
        default: &'static str,
    },
    /// Free text, whitespace-collapsed, at most `max_chars` characters
    Text { max_chars: usize },
    /// Up to `max_items` texts of at most `max_chars` characters each
    TextList { max_items: usize, max_chars: usize },
    /// Number in `[0, 1]`
    Probability { default: f64 },
}

impl FieldKind {
    /// Type line used in the schema description
    pub fn describe(&self) -> String {
        match self {
            FieldKind::Integer { min, max, .. } => format!("integer from {} to {}", min, max),
            FieldKind::Choice { options, .. } => format!("one of {}", quoted_list(options)),
            FieldKind::Text { max_chars } => format!("string, at most {} characters", max_chars),
            FieldKind::TextList { max_items, max_chars } => format!(
                "array of at most {} strings, each at most {} characters",
                max_items, max_chars
            ),
            FieldKind::Probability { .. } => "number from 0.0 to 1.0".to_string(),
        }
    }
}

/// One declared output field
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// What the model should put there
    pub hint: &'static str,
}

fn quoted_list(options: &[&str]) -> String {
    options
        .iter()
        .map(|o| format!("\"{}\"", o))
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_describe_kinds() {
        assert_eq!(
            FieldKind::Integer { min: 1, max: 10, default: 5 }.describe(),
            "integer from 1 to 10"
        );
        assert_eq!(
            FieldKind::Choice { options: &["Low", "High"], default: "Low" }.describe(),
            "one of \"Low\", \"High\""
        );
        assert!(FieldKind::TextList { max_items: 3, max_chars: 20 }
            .describe()
            .starts_with("array of at most 3 strings"));
    }
}
