use crate::domain::model::BulkBatch;

/// The `_bulk` action line written before every record.
pub fn index_directive(index: &str) -> String {
    serde_json::json!({ "index": { "_index": index } }).to_string()
}

/// Turns a Logpull NDJSON body into a bulk request body.
///
/// Empty lines are dropped; every other line is kept verbatim, in order,
/// preceded by the index directive. Each emitted line ends with `\n`.
pub fn reshape(raw: &str, index: &str) -> BulkBatch {
    let directive = index_directive(index);
    let mut payload = String::with_capacity(raw.len() + raw.len() / 4);
    let mut records = 0;

    for line in raw.split('\n') {
        if line.is_empty() {
            continue;
        }
        payload.push_str(&directive);
        payload.push('\n');
        payload.push_str(line);
        payload.push('\n');
        records += 1;
    }

    BulkBatch { payload, records }
}
