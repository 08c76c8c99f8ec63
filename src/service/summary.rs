use crate::db::Row;
use serde_json::Value;

/// Rows listed in full up to this many; beyond it only a sample is shown.
const FULL_LISTING_LIMIT: usize = 5;
const SAMPLE_ROWS: usize = 3;

fn format_value(value: &Value) -> String {
    match value {
        Value::Null => "N/A".to_string(),
        Value::String(s) => s.clone(),
        Value::Number(n) => match n.as_f64() {
            Some(f) if n.is_f64() => format!("{:.2}", f),
            _ => n.to_string(),
        },
        other => other.to_string(),
    }
}

fn humanize(column: &str) -> String {
    column.replace('_', " ")
}

fn describe_row(row: &Row, columns: &[String]) -> String {
    columns
        .iter()
        .map(|column| {
            let value = row.get(column).unwrap_or(&Value::Null);
            format!("{}: {}", humanize(column), format_value(value))
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Plain-English rendering of a structured analytics answer, used when a chat
/// question was already answered in analytics mode.
pub fn summarize(explanation: &str, data: &[Row], columns: &[String]) -> String {
    let mut text = String::new();
    if !explanation.trim().is_empty() {
        text.push_str(explanation.trim());
        text.push_str("\n\n");
    }

    match (data, columns) {
        ([row], [column]) => {
            let value = row.get(column).unwrap_or(&Value::Null);
            text.push_str(&format!("The {} is {}.", humanize(column), format_value(value)));
        }
        ([row], _) => {
            text.push_str(&format!("Here is the result: {}.", describe_row(row, columns)));
        }
        _ => {
            text.push_str(&format!("I found {} results.", data.len()));
            let shown = if data.len() > FULL_LISTING_LIMIT {
                SAMPLE_ROWS
            } else {
                data.len()
            };
            for row in &data[..shown] {
                text.push_str("\n- ");
                text.push_str(&describe_row(row, columns));
            }
            if shown < data.len() {
                text.push_str(&format!("\n...and {} more.", data.len() - shown));
            }
        }
    }

    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rows(values: Value) -> Vec<Row> {
        serde_json::from_value(values).unwrap()
    }

    fn cols(names: &[&str]) -> Vec<String> {
        names.iter().map(|n| n.to_string()).collect()
    }

    #[test]
    fn single_metric_becomes_a_sentence() {
        let text = summarize("", &rows(json!([{"total_orders": 99441}])), &cols(&["total_orders"]));
        assert_eq!(text, "The total orders is 99441.");
    }

    #[test]
    fn single_row_lists_key_values() {
        let text = summarize(
            "Average values.",
            &rows(json!([{"avg_price": 120.6537, "avg_freight": 19.99}])),
            &cols(&["avg_price", "avg_freight"]),
        );
        assert_eq!(
            text,
            "Average values.\n\nHere is the result: avg price: 120.65, avg freight: 19.99."
        );
    }

    #[test]
    fn few_rows_are_listed_in_full() {
        let data = rows(json!([
            {"state": "SP", "orders": 3},
            {"state": "RJ", "orders": 2},
            {"state": "MG", "orders": null}
        ]));
        let text = summarize("", &data, &cols(&["state", "orders"]));
        assert_eq!(
            text,
            "I found 3 results.\n- state: SP, orders: 3\n- state: RJ, orders: 2\n- state: MG, orders: N/A"
        );
    }

    #[test]
    fn many_rows_are_sampled() {
        let data: Vec<Row> = (0..8)
            .map(|i| rows(json!([{ "n": i }])).remove(0))
            .collect();
        let text = summarize("", &data, &cols(&["n"]));
        assert!(text.starts_with("I found 8 results."));
        assert_eq!(text.matches("\n- ").count(), 3);
        assert!(text.ends_with("...and 5 more."));
    }
}
