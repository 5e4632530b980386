use serde_json::{json, Value};

use crate::cli::OutputFormat;

/// Print a success line, or a JSON object when `--format json` is set.
pub fn output_success(format: OutputFormat, message: &str, data: Option<Value>) {
    match format {
        OutputFormat::Json => {
            let mut response = json!({
                "success": true,
                "message": message,
            });
            if let Some(data) = data {
                response["data"] = data;
            }
            println!("{}", serde_json::to_string_pretty(&response).unwrap_or_default());
        }
        OutputFormat::Text => {
            println!("{}", message);
        }
    }
}

/// Print a collection, as a JSON array or one formatted line per item.
pub fn output_list<T, F>(format: OutputFormat, items: &[T], line: F)
where
    T: serde::Serialize,
    F: Fn(&T) -> String,
{
    match format {
        OutputFormat::Json => {
            println!(
                "{}",
                serde_json::to_string_pretty(items).unwrap_or_default()
            );
        }
        OutputFormat::Text => {
            if items.is_empty() {
                println!("(none)");
            }
            for item in items {
                println!("{}", line(item));
            }
        }
    }
}
