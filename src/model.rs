use std::collections::HashMap;

/// Tags attached to a journal: tag name -> tag value.
pub type TagMap = HashMap<String, String>;
