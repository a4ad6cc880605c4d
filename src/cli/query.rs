//! Run a filter / select / order pipeline over JSON input

use super::{CliError, read_record};
use crate::{ObjectQuery, Value};

/// Options for the `query` command. Steps run in the order filter, select,
/// order.
#[derive(Debug, Clone, Default)]
pub struct QueryOptions {
    pub filter: Option<String>,
    pub select: Option<String>,
    pub order_by: Option<String>,
    /// JSON record or array of records
    pub input: Option<String>,
}

pub fn execute_query(options: &QueryOptions) -> Result<Value, CliError> {
    let mut query = ObjectQuery::from(read_record(options.input.as_deref())?);

    if let Some(expression) = &options.filter {
        query = query.filter(expression)?;
    }
    if let Some(names) = &options.select {
        query = query.select(names)?;
    }
    if let Some(order) = &options.order_by {
        query = query.order_by(order)?;
    }

    Ok(query.collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn runs_every_step() {
        let options = QueryOptions {
            filter: Some("price > 10".to_string()),
            select: Some("name".to_string()),
            order_by: Some("name DESC".to_string()),
            input: Some(
                r#"[{"name": "a", "price": 20}, {"name": "b", "price": 5}, {"name": "c", "price": 11}]"#
                    .to_string(),
            ),
        };
        let result = execute_query(&options).unwrap();
        assert_eq!(result.to_json(), json!([{"name": "c"}, {"name": "a"}]));
    }

    #[test]
    fn order_by_needs_an_array() {
        let options = QueryOptions {
            order_by: Some("id".to_string()),
            input: Some(r#"{"id": 1}"#.to_string()),
            ..Default::default()
        };
        assert!(matches!(execute_query(&options), Err(CliError::Query(_))));
    }
}
