//! debugpointnews.com has a single author whose byline is not machine readable.

use crate::models::Author;

pub(crate) fn author() -> Author {
    Author {
        name: "arindam".to_string(),
        url: "https://debugpointnews.com/author/dpicubegmail-com/".to_string(),
    }
}
