use crate::store::StoreError;

const SEPARATOR: char = ':';

/// Rejects values that cannot be embedded in a key.
pub fn segment<'a>(field: &'static str, value: &'a str) -> Result<&'a str, StoreError> {
    if value.is_empty() {
        return Err(StoreError::InvalidKey {
            field,
            reason: "must not be empty".to_string(),
        });
    }
    if value.contains(SEPARATOR) {
        return Err(StoreError::InvalidKey {
            field,
            reason: format!("must not contain '{SEPARATOR}'"),
        });
    }
    Ok(value)
}

/// Newest-first ordering: larger timestamps produce lexicographically smaller keys.
fn reverse_ts(timestamp_ms: i64) -> u64 {
    u64::MAX - timestamp_ms.max(0) as u64
}

pub fn item_key(item_id: &str) -> Result<String, StoreError> {
    Ok(segment("item_id", item_id)?.to_string())
}

pub fn item_scope_key(exam_id: &str, domain: &str, item_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{}",
        segment("exam_id", exam_id)?,
        segment("domain", domain)?,
        segment("item_id", item_id)?
    ))
}

pub fn item_scope_prefix(exam_id: &str, domain: Option<&str>) -> Result<String, StoreError> {
    match domain {
        Some(domain) => Ok(format!(
            "{}:{}:",
            segment("exam_id", exam_id)?,
            segment("domain", domain)?
        )),
        None => Ok(format!("{}:", segment("exam_id", exam_id)?)),
    }
}

/// Extracts the trailing item id from an `items_by_scope` key.
pub fn parse_item_scope_key(key: &[u8]) -> Option<String> {
    let text = std::str::from_utf8(key).ok()?;
    let item_id = text.rsplit(SEPARATOR).next()?;
    if item_id.is_empty() {
        None
    } else {
        Some(item_id.to_string())
    }
}

pub fn attempt_key(item_id: &str, timestamp_ms: i64, attempt_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{:020}:{}",
        segment("item_id", item_id)?,
        reverse_ts(timestamp_ms),
        segment("attempt_id", attempt_id)?
    ))
}

pub fn attempt_prefix(item_id: &str) -> Result<String, StoreError> {
    Ok(format!("{}:", segment("item_id", item_id)?))
}

pub fn progress_key(user_id: &str, item_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}",
        segment("user_id", user_id)?,
        segment("item_id", item_id)?
    ))
}

pub fn progress_prefix(user_id: &str) -> Result<String, StoreError> {
    Ok(format!("{}:", segment("user_id", user_id)?))
}

pub fn quiz_run_key(
    user_id: &str,
    exam_id: &str,
    timestamp_ms: i64,
    run_id: &str,
) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:{:020}:{}",
        segment("user_id", user_id)?,
        segment("exam_id", exam_id)?,
        reverse_ts(timestamp_ms),
        segment("run_id", run_id)?
    ))
}

pub fn quiz_run_prefix(user_id: &str, exam_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}:",
        segment("user_id", user_id)?,
        segment("exam_id", exam_id)?
    ))
}

pub fn domain_mastery_key(user_id: &str, exam_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{}",
        segment("user_id", user_id)?,
        segment("exam_id", exam_id)?
    ))
}

pub fn system_metric_key(kind: &str, timestamp_ms: i64, metric_id: &str) -> Result<String, StoreError> {
    Ok(format!(
        "{}:{:020}:{}",
        segment("kind", kind)?,
        reverse_ts(timestamp_ms),
        segment("metric_id", metric_id)?
    ))
}

pub fn system_metric_prefix(kind: &str) -> Result<String, StoreError> {
    Ok(format!("{}:", segment("kind", kind)?))
}
