//! Submission validation: required fields plus the image-count rule.
//!
//! Pure function over the current field values and image count. It never
//! mutates anything and never touches the network, so callers can run it
//! as often as they like (on every edit, before a dry run, at submit).

use crate::fields::FormFields;

/// The fields a submission cannot go out without, in reporting order.
const REQUIRED_FIELDS: [&str; 4] = ["date", "article", "client", "quantity"];

/// Check a record against the submission rules.
///
/// Returns one human-readable message per problem: first one per missing
/// required field (in [`REQUIRED_FIELDS`] order, message derived by
/// capitalizing the field identifier), then one for an empty image list.
/// An empty vec means the submission may proceed.
pub fn validate(fields: &FormFields, image_count: usize) -> Vec<String> {
    let mut errors = Vec::new();

    for name in REQUIRED_FIELDS {
        let value = match name {
            "date" => &fields.date,
            "article" => &fields.article,
            "client" => &fields.client,
            "quantity" => &fields.quantity,
            _ => unreachable!(),
        };
        if value.is_empty() {
            errors.push(format!("{} is required", capitalize(name)));
        }
    }

    if image_count == 0 {
        errors.push("At least one image is required".to_string());
    }

    errors
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().collect::<String>() + chars.as_str(),
        None => String::new(),
    }
}
