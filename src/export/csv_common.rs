//! Shared CSV writing helper.

use csv::Writer;

use super::ExportError;

/// Writes `headers` followed by one record per item.
///
/// ```rust,ignore
/// let csv = export_to_csv(rows, &SURVEY_LIST_DISPLAY, |row| row.values())?;
/// ```
pub fn export_to_csv<T, F>(
    items: impl IntoIterator<Item = T>,
    headers: &[&str],
    row_fn: F,
) -> Result<String, ExportError>
where
    F: Fn(T) -> Vec<String>,
{
    let mut wtr = Writer::from_writer(vec![]);
    wtr.write_record(headers)?;

    for item in items {
        wtr.write_record(&row_fn(item))?;
    }

    let data = wtr.into_inner().map_err(|e| ExportError::Io(e.into_error()))?;
    Ok(String::from_utf8(data)?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quotes_fields_with_separators() {
        let csv = export_to_csv(
            vec![("a", "b,c")],
            &["first", "second"],
            |(a, b)| vec![a.to_string(), b.to_string()],
        )
        .unwrap();
        assert_eq!(csv, "first,second\na,\"b,c\"\n");
    }

    #[test]
    fn empty_input_yields_header_only() {
        let csv = export_to_csv(Vec::<i32>::new(), &["id"], |i| vec![i.to_string()]).unwrap();
        assert_eq!(csv, "id\n");
    }
}
