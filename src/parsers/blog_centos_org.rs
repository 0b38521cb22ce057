//! blog.centos.org posts carry no usable byline, so the rule file stores the
//! author literally as `"Full Name https://profile"`.

use crate::models::{Author, Rule};

/// Split the literal author at its last space: name before, profile URL after.
pub(crate) fn author(rule: &Rule) -> Author {
    let literal = rule.author.trim();
    match literal.rsplit_once(' ') {
        Some((name, url)) => Author {
            name: name.trim().to_string(),
            url: url.to_string(),
        },
        None => Author {
            name: literal.to_string(),
            url: String::new(),
        },
    }
}
